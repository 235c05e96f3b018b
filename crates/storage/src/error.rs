//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong touching the mods directory.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No such file in the mods directory.
    #[display("{} does not exist in the mods directory", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The process may not read or write the file.
    #[display("not allowed to access {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Not a plain file name, or the mods directory itself is unusable.
    #[display("{} is not a usable path", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Anything else the operating system reported.
    #[display("filesystem error: {_0}")]
    Io(std::io::Error),
}

impl ErrorKind {
    pub(crate) fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
