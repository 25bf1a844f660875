//! Length-prefixed frame encoding.
//!
//! Requests and responses share one layout inside the shared region:
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ Length       │ Payload                  │
//! │ 4 bytes      │ `Length` bytes           │
//! │ uint32 BE    │ (at most 8188)           │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pageant_client::protocol::{decode_frame, encode_frame};
//!
//! let bytes = encode_frame(b"\x0b").unwrap();
//! assert_eq!(bytes, [0u8, 0, 0, 1, 0x0b]);
//! assert_eq!(&decode_frame(&bytes).unwrap()[..], b"\x0b");
//! ```

use bytes::Bytes;

use crate::error::{PageantError, Result};

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Total size of the shared region, prefix included.
pub const MAX_FRAME_SIZE: usize = 8192;

/// Largest payload that fits in one frame (8188 bytes).
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - LENGTH_PREFIX_SIZE;

/// Reject payloads that cannot fit in a single frame.
#[inline]
pub fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(PageantError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

/// Encode the 4-byte length prefix for a payload of `len` bytes.
///
/// Callers are expected to have validated `len` with [`check_payload_len`].
#[inline]
pub fn encode_length(len: usize) -> [u8; LENGTH_PREFIX_SIZE] {
    (len as u32).to_be_bytes()
}

/// Decode the length prefix at the start of `buf`.
///
/// Returns `None` if the buffer is shorter than the prefix.
#[inline]
pub fn decode_length(buf: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

/// Check a declared response length against what the region can hold.
pub fn check_declared_len(declared: u32) -> Result<usize> {
    let len = declared as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(PageantError::MalformedResponse {
            declared,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(len)
}

/// Build a complete frame (prefix + payload) as a single byte vector.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    check_payload_len(payload.len())?;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&encode_length(payload.len()));
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Parse a frame from the start of `buf`, returning a copy of its payload.
///
/// Bytes after the declared payload are ignored, so a whole shared region can
/// be passed in directly.
pub fn decode_frame(buf: &[u8]) -> Result<Bytes> {
    let declared = decode_length(buf).ok_or(PageantError::MalformedResponse {
        declared: 0,
        max: MAX_PAYLOAD_SIZE,
    })?;
    let len = check_declared_len(declared)?;

    let payload = buf
        .get(LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len)
        .ok_or(PageantError::MalformedResponse {
            declared,
            max: buf.len().saturating_sub(LENGTH_PREFIX_SIZE),
        })?;
    Ok(Bytes::copy_from_slice(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sizes() {
        assert_eq!(LENGTH_PREFIX_SIZE, 4);
        assert_eq!(MAX_FRAME_SIZE, 8192);
        assert_eq!(MAX_PAYLOAD_SIZE, 8188);
    }

    #[test]
    fn test_length_is_big_endian() {
        assert_eq!(encode_length(0x0102), [0x00, 0x00, 0x01, 0x02]);
        assert_eq!(decode_length(&[0x00, 0x00, 0x20, 0x00, 0xff]), Some(8192));
    }

    #[test]
    fn test_decode_length_too_short() {
        assert_eq!(decode_length(&[0, 0, 1]), None);
    }

    #[test]
    fn test_encode_empty_payload() {
        assert_eq!(encode_frame(b"").unwrap(), [0u8; 4]);
    }

    #[test]
    fn test_encode_boundary() {
        let max = vec![0xAB; MAX_PAYLOAD_SIZE];
        assert_eq!(encode_frame(&max).unwrap().len(), MAX_FRAME_SIZE);

        let over = vec![0xAB; MAX_PAYLOAD_SIZE + 1];
        let err = encode_frame(&over).unwrap_err();
        assert!(matches!(
            err,
            PageantError::PayloadTooLarge { len: 8189, max: 8188 }
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut region = vec![0u8; MAX_FRAME_SIZE];
        region[..7].copy_from_slice(&[0, 0, 0, 3, 1, 2, 3]);
        region[7] = 0xEE;

        assert_eq!(&decode_frame(&region).unwrap()[..], &[1, 2, 3]);
    }

    #[test]
    fn test_decode_declared_too_large() {
        let mut region = vec![0u8; MAX_FRAME_SIZE];
        region[..4].copy_from_slice(&9000u32.to_be_bytes());

        let err = decode_frame(&region).unwrap_err();
        assert!(matches!(
            err,
            PageantError::MalformedResponse { declared: 9000, .. }
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let err = decode_frame(&[0, 0, 0, 5, 1, 2]).unwrap_err();
        assert!(matches!(err, PageantError::MalformedResponse { declared: 5, max: 2 }));
    }

    proptest! {
        #[test]
        fn prop_frame_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE)) {
            let bytes = encode_frame(&payload).unwrap();
            prop_assert_eq!(bytes.len(), LENGTH_PREFIX_SIZE + payload.len());
            prop_assert_eq!(&decode_frame(&bytes).unwrap()[..], &payload[..]);
        }
    }
}
