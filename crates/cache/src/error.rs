//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Another refresh cycle is running; this trigger is coalesced into it.
    #[display("catalog refresh already in progress")]
    RefreshInProgress,
    /// A refresh produced no entries. The previous snapshot is kept.
    #[display("refusing to publish an empty catalog")]
    EmptyCatalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmptyCatalog)
    }
}
