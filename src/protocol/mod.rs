//! Protocol module - frame layout and the Pageant wire contract.
//!
//! - 4-byte big-endian length prefix + payload, shared by both directions
//! - `WM_COPYDATA` notification carrying the shared region name
//! - Region naming per calling thread

mod copydata;
mod frame;

pub use copydata::{
    region_name, CopyDataRequest, AGENT_COPYDATA_ID, DEFAULT_WINDOW_NAME, REGION_NAME_PREFIX,
    WM_COPYDATA,
};
pub use frame::{
    check_declared_len, check_payload_len, decode_frame, decode_length, encode_frame,
    encode_length, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
