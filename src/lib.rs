//! # pageant-client
//!
//! Client for PuTTY's Pageant SSH agent on Windows.
//!
//! Pageant does not listen on a socket. A query is a framed request written
//! into a named shared-memory region, followed by a synchronous
//! `WM_COPYDATA` message to Pageant's window naming that region; Pageant
//! writes its framed reply into the same region before the message returns.
//! This crate runs that exchange and exposes it as a `Read + Write` stream, so
//! an SSH agent protocol library can use Pageant like any other agent
//! connection. Payloads are opaque: agent message encoding is left to the
//! caller.
//!
//! ## Architecture
//!
//! - [`HostLocator`]: finds Pageant's window, fresh on every call
//! - [`QueryChannel`]: one blocking request/response round-trip
//! - [`AgentStream`]: `std::io::Read`/`Write` over the channel
//! - [`AvailabilityProbe`]: "is Pageant running" diagnostic
//! - [`TimedChannel`]: async deadline on top of the blocking call
//! - [`transport`]: the platform seam ([`transport::Win32Backend`] on Windows,
//!   [`transport::LoopbackHost`] everywhere)
//!
//! ## Example
//!
//! ```ignore
//! use std::io::{Read, Write};
//!
//! let mut agent = pageant_client::connect();
//! agent.write_all(&[11])?; // SSH2_AGENTC_REQUEST_IDENTITIES
//! let mut reply = Vec::new();
//! agent.read_to_end(&mut reply)?;
//! ```

pub mod error;
pub mod protocol;
pub mod transport;

mod channel;
mod client;
mod locator;
mod stream;
mod sync;
mod timeout;

pub use channel::QueryChannel;
pub use client::PageantBuilder;
pub use error::{PageantError, Result};
pub use locator::{AvailabilityProbe, HostLocator};
pub use protocol::MAX_PAYLOAD_SIZE;
pub use stream::AgentStream;
pub use timeout::{TimedChannel, DEFAULT_QUERY_TIMEOUT};

/// Stream to the running Pageant with default settings.
#[cfg(windows)]
pub fn connect() -> AgentStream<transport::Win32Backend> {
    PageantBuilder::new().build_stream()
}

/// True if a Pageant window can currently be found.
#[cfg(windows)]
pub fn is_available() -> bool {
    PageantBuilder::new().build_probe().is_available()
}

/// Send one request to the running Pageant and return its response.
#[cfg(windows)]
pub fn query(request: &[u8]) -> Result<bytes::Bytes> {
    PageantBuilder::new().build_channel().query(request)
}
