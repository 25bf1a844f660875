//! Error types for pageant-client.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for all Pageant operations.
#[derive(Debug, Error)]
pub enum PageantError {
    /// No Pageant window could be found.
    #[error("Pageant window not found")]
    HostNotFound,

    /// Request does not fit in a single shared-memory frame.
    #[error("Message too long: {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// `WM_COPYDATA` returned zero: Pageant refused or failed the query.
    #[error("Pageant rejected the query")]
    NotificationFailed,

    /// Creating, mapping or accessing the shared region failed.
    #[error("Shared memory error: {0}")]
    ResourceAllocation(#[source] io::Error),

    /// Response length prefix points past the end of the shared region.
    #[error("Malformed response: declared length {declared} exceeds maximum of {max}")]
    MalformedResponse { declared: u32, max: usize },

    /// Host did not answer within the caller's deadline.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking query task panicked or was cancelled.
    #[error("Query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PageantError {
    fn io_kind(&self) -> io::ErrorKind {
        match self {
            PageantError::HostNotFound => io::ErrorKind::NotFound,
            PageantError::PayloadTooLarge { .. } => io::ErrorKind::InvalidInput,
            PageantError::MalformedResponse { .. } => io::ErrorKind::InvalidData,
            PageantError::Timeout(_) => io::ErrorKind::TimedOut,
            PageantError::ResourceAllocation(e) => e.kind(),
            PageantError::NotificationFailed | PageantError::Task(_) => io::ErrorKind::Other,
        }
    }
}

/// Lets [`PageantError`] cross `std::io::Read`/`Write` boundaries.
///
/// The original error stays reachable through [`io::Error::get_ref`] and
/// [`io::Error::into_inner`].
impl From<PageantError> for io::Error {
    fn from(err: PageantError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

/// Result type alias using PageantError.
pub type Result<T> = std::result::Result<T, PageantError>;
