//! Catalog Source Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalog source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failed or was interrupted.
    #[display("network error talking to {_0}")]
    Network(#[error(not(source))] String),
    /// The upstream did not answer within the configured timeout.
    #[display("request to {_0} timed out")]
    Timeout(#[error(not(source))] String),
    /// The upstream answered with a non-success status.
    #[display("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    /// The response body could not be decoded.
    #[display("malformed response from {_0}")]
    Malformed(#[error(not(source))] String),
    /// The client could not be built from the given settings.
    #[display("invalid catalog source configuration: {_0}")]
    Configuration(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::Malformed(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Configuration(_) => false,
        }
    }
}
