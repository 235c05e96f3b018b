//! Error types for the [`update`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! Every error here ends an update with the installed file left untouched.

use derive_more::{Display, Error};

/// An update error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an update failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The catalog entry lists no files to update to.
    #[display("{_0} has no downloadable files")]
    NoFiles(#[error(not(source))] String),
    /// The catalog names the new file with something other than a plain file name.
    #[display("refusing unsafe file name from catalog: {_0:?}")]
    UnsafeFileName(#[error(not(source))] String),
    /// Neither the download endpoint nor the listing provide a link.
    #[display("no download link published for {_0}")]
    NoDownloadLink(#[error(not(source))] String),
    /// Resolving or starting the download failed.
    #[display("download of {_0} failed")]
    Download(#[error(not(source))] String),
    /// The downloaded bytes do not match what the catalog published.
    #[display("downloaded {file} failed verification: {reason}")]
    Verification { file: String, reason: String },
    /// Writing, renaming or removing files in the mods directory failed.
    #[display("could not install {_0}")]
    Storage(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Download(_) | Self::Verification { .. } | Self::Storage(_))
    }
}
