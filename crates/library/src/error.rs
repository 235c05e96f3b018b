//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Sub-modules have their own error
//! kinds which are raised into these at the public boundary.
//!
//! Refreshes and updates report failures as values
//! ([`RefreshOutcome`](crate::RefreshOutcome),
//! [`UpdateOutcome`](modsync_extract::models::UpdateOutcome)) instead.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which public operation failed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing or hashing installed mods failed.
    #[display("failed to scan installed mods")]
    Scan,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Scan)
    }
}
