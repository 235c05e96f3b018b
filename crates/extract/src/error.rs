//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model construction and parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A hash value is not valid hex of the length its algorithm produces.
    #[display("invalid {algorithm} hash: {value:?}")]
    InvalidHash { algorithm: &'static str, value: String },
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// Details about the parsing failure.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Data is either well-formed or it isn't.
        false
    }
}
