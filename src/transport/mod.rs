//! Transport module - the OS primitives a query is built from.
//!
//! A [`Backend`] bundles the four operations [`QueryChannel`](crate::QueryChannel)
//! needs from the platform:
//! - Window lookup (`FindWindowW`)
//! - Calling-context identity (`GetCurrentThreadId`)
//! - Named shared memory (`CreateFileMappingW` + `MapViewOfFile`)
//! - Synchronous notification (`SendMessageW(WM_COPYDATA)`)
//!
//! Implementations:
//! - [`Win32Backend`] (Windows): the real Pageant transport
//! - [`LoopbackHost`] (all platforms): in-process agent host emulation

mod loopback;
#[cfg(windows)]
mod win32;

use std::io;

use crate::error::{PageantError, Result};
use crate::protocol::{CopyDataRequest, DEFAULT_WINDOW_NAME};

pub use loopback::{LoopbackHost, LoopbackRegion};
#[cfg(windows)]
pub use win32::{Win32Backend, Win32Region};

/// Opaque reference to the host's message-receiving window.
///
/// Only valid for the query that resolved it; never cache it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(usize);

impl HostHandle {
    /// Wrap a raw window handle value.
    #[inline]
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw window handle value.
    #[inline]
    pub fn as_raw(&self) -> usize {
        self.0
    }
}

/// Window class and title identifying the agent host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    /// Registered window class.
    pub class: String,
    /// Window title.
    pub title: String,
}

impl HostIdentity {
    /// Identity with distinct class and title.
    pub fn new(class: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            title: title.into(),
        }
    }
}

impl Default for HostIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_NAME, DEFAULT_WINDOW_NAME)
    }
}

/// A named block of memory shared with the host for one query.
///
/// Dropping the region unmaps and releases it.
pub trait SharedRegion {
    /// Name the host uses to open the region.
    fn name(&self) -> &str;

    /// Mapped size in bytes.
    fn len(&self) -> usize;

    /// True if nothing is mapped.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `data` into the region at `offset`.
    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Fill `buf` from the region starting at `offset`.
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<()>;
}

/// Platform operations needed to run a query against an agent host.
pub trait Backend: Send + Sync {
    /// Region type produced by [`Backend::create_region`].
    type Region: SharedRegion;

    /// Look up the host window. `None` when the host is not running.
    fn find_window(&self, identity: &HostIdentity) -> Option<HostHandle>;

    /// Identity of the calling execution context (the OS thread id).
    fn context_id(&self) -> u32;

    /// Create and map a named region of `size` bytes.
    fn create_region(&self, name: &str, size: usize) -> Result<Self::Region>;

    /// Deliver the notification and block until the host has answered.
    ///
    /// Returns `false` when the host reports failure.
    fn send_copydata(&self, host: HostHandle, request: &CopyDataRequest) -> bool;
}

/// Verify that `[offset, offset + len)` lies within a region of `size` bytes.
pub(crate) fn check_range(offset: usize, len: usize, size: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(PageantError::ResourceAllocation(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "access of {} bytes at offset {} outside shared region of {} bytes",
                len, offset, size
            ),
        ))),
    }
}
