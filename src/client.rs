//! Builder for configured channels, streams and probes.
//!
//! The [`PageantBuilder`] collects the host identity and query deadline once
//! and hands out any of the crate's entry points over a chosen backend.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use pageant_client::transport::LoopbackHost;
//! use pageant_client::PageantBuilder;
//!
//! let builder = PageantBuilder::new();
//! let host = LoopbackHost::echo();
//!
//! assert!(builder.probe(host.clone()).is_available());
//!
//! let mut stream = builder.stream(host);
//! stream.write_all(b"ping").unwrap();
//! let mut reply = Vec::new();
//! stream.read_to_end(&mut reply).unwrap();
//! assert_eq!(reply, b"ping");
//! ```

use std::time::Duration;

use crate::channel::QueryChannel;
use crate::locator::{AvailabilityProbe, HostLocator};
use crate::stream::AgentStream;
use crate::timeout::{TimedChannel, DEFAULT_QUERY_TIMEOUT};
use crate::transport::{Backend, HostIdentity};

/// Builder for configuring Pageant clients.
#[derive(Debug, Clone)]
pub struct PageantBuilder {
    identity: HostIdentity,
    timeout: Duration,
}

impl PageantBuilder {
    /// Create a builder targeting the default `"Pageant"` window.
    pub fn new() -> Self {
        Self {
            identity: HostIdentity::default(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set both window class and title.
    pub fn window_name(mut self, name: &str) -> Self {
        self.identity = HostIdentity::new(name, name);
        self
    }

    /// Set the window class.
    ///
    /// Default: "Pageant"
    pub fn window_class(mut self, class: &str) -> Self {
        self.identity.class = class.to_string();
        self
    }

    /// Set the window title.
    ///
    /// Default: "Pageant"
    pub fn window_title(mut self, title: &str) -> Self {
        self.identity.title = title.to_string();
        self
    }

    /// Set the deadline used by [`PageantBuilder::timed`].
    ///
    /// Default: 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured host identity.
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// Host locator over `backend`.
    pub fn locator<B: Backend>(&self, backend: B) -> HostLocator<B> {
        HostLocator::with_identity(backend, self.identity.clone())
    }

    /// Availability probe over `backend`.
    pub fn probe<B: Backend>(&self, backend: B) -> AvailabilityProbe<B> {
        AvailabilityProbe::new(self.locator(backend))
    }

    /// Blocking query channel over `backend`.
    pub fn channel<B: Backend>(&self, backend: B) -> QueryChannel<B> {
        QueryChannel::from_locator(self.locator(backend))
    }

    /// Byte-stream adapter over `backend`.
    pub fn stream<B: Backend>(&self, backend: B) -> AgentStream<B> {
        AgentStream::from_channel(self.channel(backend))
    }

    /// Async channel with the configured deadline over `backend`.
    pub fn timed<B: Backend + 'static>(&self, backend: B) -> TimedChannel<B> {
        TimedChannel::new(self.channel(backend), self.timeout)
    }
}

#[cfg(windows)]
impl PageantBuilder {
    /// Blocking query channel to the real Pageant.
    pub fn build_channel(&self) -> QueryChannel<crate::transport::Win32Backend> {
        self.channel(crate::transport::Win32Backend::new())
    }

    /// Byte-stream adapter to the real Pageant.
    pub fn build_stream(&self) -> AgentStream<crate::transport::Win32Backend> {
        self.stream(crate::transport::Win32Backend::new())
    }

    /// Availability probe for the real Pageant.
    pub fn build_probe(&self) -> AvailabilityProbe<crate::transport::Win32Backend> {
        self.probe(crate::transport::Win32Backend::new())
    }
}

impl Default for PageantBuilder {
    fn default() -> Self {
        Self::new()
    }
}
