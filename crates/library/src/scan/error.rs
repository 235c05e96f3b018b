//! Error types for the [`scan`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a scan failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing, stat-ing or opening a file via the storage backend failed.
    Storage,
    /// Reading the file contents while hashing failed.
    Hashing,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Hashing)
    }
}
