//! Access to the installed mods directory.
//!
//! [`LocalBackend`] is the real thing. [`ReadOnlyBackend`] wraps another
//! backend for dry runs, and `MockBackend` (feature `mock`) keeps files in
//! memory for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::io::Read;
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub(crate) type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Chunks of a download in flight.
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'a>>;

/// Operations on the flat directory the game loads mods from.
///
/// Every `path` argument is a bare file name, checked with
/// [`validate_path`](crate::validate_path) by the implementation.
///
/// ```
/// use std::path::Path;
/// use modsync_storage::{backend::StorageBackend, error::Result};
///
/// async fn installed_size(backend: &dyn StorageBackend, file: &str) -> Result<Option<u64>> {
///     let path = Path::new(file);
///     if !backend.exists(path).await? {
///         return Ok(None);
///     }
///     Ok(Some(backend.stat(path).await?.size))
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Used in log fields only.
    fn name(&self) -> &str;

    /// Every regular file in the directory, in no particular order.
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Like [`list()`](Self::list), yielding entries as they are read.
    /// Sub-directories are not descended into.
    fn list_stream(&self) -> FileInfoStream<'_>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Whole file contents. [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if missing.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// A blocking reader over the file, opened up front so it can be moved
    /// into [`spawn_blocking`](tokio::task::spawn_blocking) for hashing.
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Create or truncate the file with `data`.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Drain `stream` into the file and return the byte count.
    ///
    /// If the stream fails part way, no file is left behind.
    ///
    /// ```no_run
    /// use bytes::Bytes;
    /// use std::path::Path;
    /// # use modsync_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let chunks = futures::stream::iter([Ok(Bytes::from_static(b"PK\x03\x04"))]);
    /// let written = backend.write_stream(Path::new(".mod.jar.part"), Box::pin(chunks)).await?;
    /// assert_eq!(written, 4);
    /// # Ok(())
    /// # }
    /// ```
    async fn write_stream(&self, path: &Path, stream: ByteStream<'_>) -> Result<u64>;

    /// [`NotFound`](crate::error::ErrorKind::NotFound) if missing.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Move `from` over `to`, replacing it if present. Atomic on the local
    /// filesystem.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
