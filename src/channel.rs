//! One request/response exchange with the agent host.
//!
//! [`QueryChannel::query`] runs the whole Pageant round-trip:
//! 1. Check the request fits in one frame
//! 2. Look up the host window
//! 3. Create a shared region named after the calling thread
//! 4. Write the request frame into it
//! 5. Send `WM_COPYDATA` naming the region and wait for the host
//! 6. Read the response frame from the same region
//! 7. Release the region (on every path, via `Drop`)
//!
//! There are no retries and no timeout; see
//! [`TimedChannel`](crate::TimedChannel) for a deadline layered on top.

use bytes::Bytes;

use crate::error::{PageantError, Result};
use crate::locator::HostLocator;
use crate::protocol::{
    check_declared_len, check_payload_len, encode_length, region_name,
    CopyDataRequest, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE,
};
use crate::transport::{Backend, HostIdentity, SharedRegion};

/// Performs single query round-trips against the agent host.
///
/// Holds no per-query state, so one channel may be shared between threads.
#[derive(Debug, Clone)]
pub struct QueryChannel<B> {
    locator: HostLocator<B>,
}

impl<B: Backend> QueryChannel<B> {
    /// Channel talking to the default `"Pageant"` window.
    pub fn new(backend: B) -> Self {
        Self::from_locator(HostLocator::new(backend))
    }

    /// Channel talking to a custom window identity.
    pub fn with_identity(backend: B, identity: HostIdentity) -> Self {
        Self::from_locator(HostLocator::with_identity(backend, identity))
    }

    /// Channel using an existing locator.
    pub fn from_locator(locator: HostLocator<B>) -> Self {
        Self { locator }
    }

    /// The locator used before every query.
    pub fn locator(&self) -> &HostLocator<B> {
        &self.locator
    }

    /// Send `request` to the agent host and return its response payload.
    ///
    /// # Errors
    ///
    /// - [`PageantError::PayloadTooLarge`] if `request` exceeds 8188 bytes
    /// - [`PageantError::HostNotFound`] if the host window is absent
    /// - [`PageantError::ResourceAllocation`] if the shared region fails
    /// - [`PageantError::NotificationFailed`] if the host reports failure
    /// - [`PageantError::MalformedResponse`] if the response length does not fit
    pub fn query(&self, request: &[u8]) -> Result<Bytes> {
        check_payload_len(request.len())?;

        let host = self.locator.find().ok_or(PageantError::HostNotFound)?;
        let backend = self.locator.backend();

        let name = region_name(backend.context_id());
        let mut region = backend.create_region(&name, MAX_FRAME_SIZE)?;
        tracing::trace!("Mapped {} ({} bytes)", name, region.len());

        region.write_at(0, &encode_length(request.len()))?;
        region.write_at(LENGTH_PREFIX_SIZE, request)?;

        let notification = CopyDataRequest::new(region.name());
        tracing::debug!("Querying agent with {} byte request", request.len());
        if !backend.send_copydata(host, &notification) {
            tracing::warn!("Agent rejected query in {}", name);
            return Err(PageantError::NotificationFailed);
        }

        let response = read_response(&region)?;
        tracing::debug!("Agent answered with {} byte response", response.len());
        Ok(response)
    }
}

/// Read the response frame the host left in `region`.
fn read_response<R: SharedRegion>(region: &R) -> Result<Bytes> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    region.read_at(0, &mut prefix)?;

    let declared = u32::from_be_bytes(prefix);
    let len = check_declared_len(declared).inspect_err(|_| {
        tracing::warn!("Agent declared a {} byte response", declared);
    })?;

    let mut payload = vec![0u8; len];
    region.read_at(LENGTH_PREFIX_SIZE, &mut payload)?;
    Ok(Bytes::from(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_PAYLOAD_SIZE;
    use crate::transport::LoopbackHost;

    #[test]
    fn test_query_echo() {
        let host = LoopbackHost::echo();
        let channel = QueryChannel::new(host.clone());

        let response = channel.query(&[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(&response[..], &[0x01, 0x02, 0x03]);
        assert_eq!(host.regions_created(), 1);
        assert_eq!(host.live_regions(), 0);
    }

    #[test]
    fn test_query_empty_request() {
        let channel = QueryChannel::new(LoopbackHost::echo());
        assert!(channel.query(b"").unwrap().is_empty());
    }

    #[test]
    fn test_query_response_differs_from_request() {
        let host = LoopbackHost::new(|req| Some(vec![req.len() as u8; 10]));
        let channel = QueryChannel::new(host);

        let response = channel.query(b"abc").unwrap();
        assert_eq!(&response[..], &[3u8; 10]);
    }

    #[test]
    fn test_query_max_payload() {
        let host = LoopbackHost::echo();
        let channel = QueryChannel::new(host.clone());

        let request = vec![0x5A; MAX_PAYLOAD_SIZE];
        let response = channel.query(&request).unwrap();
        assert_eq!(response.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(&response[..], &request[..]);
    }

    #[test]
    fn test_query_too_large_never_touches_host() {
        let host = LoopbackHost::echo();
        let channel = QueryChannel::new(host.clone());

        let err = channel.query(&vec![0; MAX_PAYLOAD_SIZE + 1]).unwrap_err();
        assert!(matches!(
            err,
            PageantError::PayloadTooLarge { len: 8189, max: 8188 }
        ));
        assert_eq!(host.regions_created(), 0);
        assert!(host.notified_regions().is_empty());
    }

    #[test]
    fn test_query_host_not_found_allocates_nothing() {
        let host = LoopbackHost::echo();
        host.set_running(false);
        let channel = QueryChannel::new(host.clone());

        let err = channel.query(b"x").unwrap_err();
        assert!(matches!(err, PageantError::HostNotFound));
        assert_eq!(host.regions_created(), 0);
    }

    #[test]
    fn test_query_notification_failure_releases_region() {
        let host = LoopbackHost::new(|_| None);
        let channel = QueryChannel::new(host.clone());

        let err = channel.query(b"x").unwrap_err();
        assert!(matches!(err, PageantError::NotificationFailed));
        assert_eq!(host.regions_created(), 1);
        assert_eq!(host.live_regions(), 0);
    }

    #[test]
    fn test_query_malformed_response_length() {
        let host = LoopbackHost::with_raw_handler(|region| {
            region[..4].copy_from_slice(&u32::MAX.to_be_bytes());
            true
        });
        let channel = QueryChannel::new(host.clone());

        let err = channel.query(b"x").unwrap_err();
        assert!(matches!(
            err,
            PageantError::MalformedResponse {
                declared: u32::MAX,
                max: 8188
            }
        ));
        assert_eq!(host.live_regions(), 0);
    }

    #[test]
    fn test_query_uses_thread_region_name() {
        let host = LoopbackHost::echo();
        let channel = QueryChannel::new(host.clone());
        channel.query(b"x").unwrap();

        let expected = region_name(host.context_id());
        assert_eq!(host.notified_regions(), vec![expected]);
    }

    #[test]
    fn test_query_custom_identity() {
        let host = LoopbackHost::echo();
        host.set_identity(HostIdentity::new("AgentClass", "Agent"));

        let default = QueryChannel::new(host.clone());
        assert!(matches!(
            default.query(b"x").unwrap_err(),
            PageantError::HostNotFound
        ));

        let custom =
            QueryChannel::with_identity(host, HostIdentity::new("AgentClass", "Agent"));
        assert_eq!(&custom.query(b"x").unwrap()[..], b"x");
    }

    #[test]
    fn test_query_sequential_regions_not_reused() {
        let host = LoopbackHost::echo();
        let channel = QueryChannel::new(host.clone());

        for i in 0..5u8 {
            assert_eq!(&channel.query(&[i]).unwrap()[..], &[i]);
        }
        assert_eq!(host.regions_created(), 5);
        assert_eq!(host.live_regions(), 0);
    }
}
