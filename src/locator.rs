//! Host lookup and availability probing.
//!
//! Pageant may start or exit at any time, so nothing here caches a window
//! handle: every call performs a fresh lookup.

use crate::transport::{Backend, HostHandle, HostIdentity};

/// Finds the agent host's message window.
#[derive(Debug, Clone)]
pub struct HostLocator<B> {
    backend: B,
    identity: HostIdentity,
}

impl<B: Backend> HostLocator<B> {
    /// Locator for the default `"Pageant"` window.
    pub fn new(backend: B) -> Self {
        Self::with_identity(backend, HostIdentity::default())
    }

    /// Locator for a custom window class and title.
    pub fn with_identity(backend: B, identity: HostIdentity) -> Self {
        Self { backend, identity }
    }

    /// Look up the host window. Returns `None` when it is not running.
    pub fn find(&self) -> Option<HostHandle> {
        let handle = self.backend.find_window(&self.identity);
        match handle {
            Some(h) => tracing::trace!("Found {} window {:#x}", self.identity.title, h.as_raw()),
            None => tracing::debug!("{} window not found", self.identity.title),
        }
        handle
    }

    /// The identity being looked up.
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// The backend performing lookups.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Diagnostic check for whether the agent host can be queried right now.
///
/// Advisory only: the host may exit between the probe and the next query.
#[derive(Debug, Clone)]
pub struct AvailabilityProbe<B> {
    locator: HostLocator<B>,
}

impl<B: Backend> AvailabilityProbe<B> {
    /// Probe built on the given locator.
    pub fn new(locator: HostLocator<B>) -> Self {
        Self { locator }
    }

    /// True if the host window can currently be found.
    pub fn is_available(&self) -> bool {
        self.locator.find().is_some()
    }
}
