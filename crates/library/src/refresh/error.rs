//! Error types for the [`refresh`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A refresh error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for refresh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a refresh failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The catalog source failed to deliver a page.
    #[display("failed to fetch catalog page {page} (offset {offset})")]
    Source { page: usize, offset: usize },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source { .. })
    }
}
