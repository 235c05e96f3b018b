//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// None of these are retryable: the configuration has to be fixed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file extension is not one of `toml`, `yaml`, `yml` or `json`.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The merged sources could not be deserialized.
    #[display("could not read configuration")]
    Malformed,
    /// A value is out of range or missing.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
