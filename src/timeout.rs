//! Deadline layer over the blocking query.
//!
//! `SendMessage` offers no cancellation, so a deadline can only stop the
//! caller from waiting. [`TimedChannel`] runs each query on the tokio
//! blocking pool and gives up after the configured duration. An abandoned
//! query keeps running until the host answers, then releases its region as
//! usual.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pageant_client::transport::LoopbackHost;
//! use pageant_client::{QueryChannel, TimedChannel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let timed = TimedChannel::new(QueryChannel::new(LoopbackHost::echo()), Duration::from_secs(5));
//! let response = timed.query(&b"\x0b"[..]).await.unwrap();
//! assert_eq!(&response[..], b"\x0b");
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::channel::QueryChannel;
use crate::error::{PageantError, Result};
use crate::transport::Backend;

/// Default deadline for [`TimedChannel`].
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Async query channel with a per-query deadline.
#[derive(Debug)]
pub struct TimedChannel<B> {
    channel: Arc<QueryChannel<B>>,
    timeout: Duration,
}

impl<B> Clone for TimedChannel<B> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            timeout: self.timeout,
        }
    }
}

impl<B: Backend + 'static> TimedChannel<B> {
    /// Wrap a channel with the given deadline.
    pub fn new(channel: QueryChannel<B>, timeout: Duration) -> Self {
        Self {
            channel: Arc::new(channel),
            timeout,
        }
    }

    /// The configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a query, failing with [`PageantError::Timeout`] after the deadline.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn query(&self, request: impl Into<Bytes>) -> Result<Bytes> {
        let request = request.into();
        let channel = self.channel.clone();
        let task = tokio::task::spawn_blocking(move || channel.query(&request));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::warn!("Agent query abandoned after {:?}", self.timeout);
                Err(PageantError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackHost;
    use std::sync::mpsc;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_timed_query_succeeds() {
        let timed = TimedChannel::new(
            QueryChannel::new(LoopbackHost::echo()),
            Duration::from_secs(5),
        );
        let response = timed.query(vec![1u8, 2, 3]).await.unwrap();
        assert_eq!(&response[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_timed_query_propagates_errors() {
        let host = LoopbackHost::echo();
        host.set_running(false);
        let timed = TimedChannel::new(QueryChannel::new(host), Duration::from_secs(5));

        let err = timed.query(vec![1u8]).await.unwrap_err();
        assert!(matches!(err, PageantError::HostNotFound));
    }

    #[tokio::test]
    async fn test_stalled_host_times_out() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let host = LoopbackHost::new(move |req| {
            let _ = release_rx.lock().map(|rx| rx.recv());
            Some(req.to_vec())
        });
        let timed = TimedChannel::new(
            QueryChannel::new(host.clone()),
            Duration::from_millis(50),
        );

        let err = timed.query(vec![1u8]).await.unwrap_err();
        assert!(matches!(err, PageantError::Timeout(d) if d == Duration::from_millis(50)));

        // The abandoned query still finishes and releases its region.
        release_tx.send(()).unwrap();
        for _ in 0..100 {
            if host.live_regions() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(host.live_regions(), 0);
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(DEFAULT_QUERY_TIMEOUT, Duration::from_secs(30));
    }
}
