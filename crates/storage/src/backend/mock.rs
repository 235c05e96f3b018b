use super::{BoxSyncRead, ByteStream, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::{FileInfo, StorageBackend, validate_path};
use async_stream::stream;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::sync::RwLock;

struct Stored {
    modified: OffsetDateTime,
    data: Vec<u8>,
}

/// A mods directory held in memory.
///
/// ```
/// use modsync_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("CoolSword-1.2.0.jar", b"PK...")]);
/// assert!(backend.exists(Path::new("CoolSword-1.2.0.jar")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: RwLock<HashMap<PathBuf, Stored>>,
}

impl MockBackend {
    /// Panics on a name [`validate_path`] rejects.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let modified = OffsetDateTime::now_utc();
        let files = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                let Ok(name) = validate_path(&path) else {
                    panic!("MockBackend::with_files: invalid path {}", path.display());
                };
                (name, Stored { modified, data: data.into() })
            })
            .collect();
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Panics if the file does not exist.
    pub async fn set_modified(&self, path: impl AsRef<Path>, modified: OffsetDateTime) {
        let mut files = self.files.write().await;
        let Some(stored) = files.get_mut(path.as_ref()) else {
            panic!("MockBackend::set_modified: no such file {}", path.as_ref().display());
        };
        stored.modified = modified;
    }

    fn not_found(path: PathBuf) -> exn::Exn<ErrorKind> {
        exn::Exn::from(ErrorKind::NotFound(path))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::with_files(Vec::<(PathBuf, Vec<u8>)>::new())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Copy out first; the lock must not be held across a yield.
            let listing: Vec<FileInfo> = self
                .files
                .read()
                .await
                .iter()
                .map(|(path, stored)| FileInfo::new(path.clone(), stored.data.len() as u64, stored.modified))
                .collect();
            for info in listing {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let files = self.files.read().await;
        files.get(&path).map(|stored| stored.data.clone()).ok_or_else(|| Self::not_found(path))
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        Ok(Box::new(std::io::Cursor::new(self.read(path).await?)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        let stored = Stored {
            modified: OffsetDateTime::now_utc(),
            data: data.to_vec(),
        };
        self.files.write().await.insert(path, stored);
        Ok(())
    }

    async fn write_stream(&self, path: &Path, stream: ByteStream<'_>) -> Result<u64> {
        let path = validate_path(path)?;
        // Buffered so a failed stream stores nothing.
        let data: Vec<u8> = stream
            .map_ok(|chunk| chunk.to_vec())
            .try_concat()
            .await
            .map_err(ErrorKind::Io)?;
        let written = data.len() as u64;
        let stored = Stored {
            modified: OffsetDateTime::now_utc(),
            data,
        };
        self.files.write().await.insert(path, stored);
        Ok(written)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(path)),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let (from, to) = (validate_path(from)?, validate_path(to)?);
        let mut files = self.files.write().await;
        let stored = files.remove(&from).ok_or_else(|| Self::not_found(from))?;
        files.insert(to, stored);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let files = self.files.read().await;
        match files.get(&path) {
            Some(stored) => Ok(FileInfo::new(path.clone(), stored.data.len() as u64, stored.modified)),
            None => Err(Self::not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io::Read;

    #[tokio::test]
    async fn test_with_files_and_list() {
        let backend = MockBackend::with_files([("a.jar", b"1".to_vec()), ("./b.zip", b"22".to_vec())]);
        let mut listed: Vec<_> = backend.list().await.unwrap().into_iter().map(|info| (info.path, info.size)).collect();
        listed.sort();
        assert_eq!(listed, [(PathBuf::from("a.jar"), 1), (PathBuf::from("b.zip"), 2)]);
        assert!(backend.exists(Path::new("b.zip")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_write_reader() {
        let backend = MockBackend::default();
        backend.write(Path::new("mod.jar"), b"0123456789").await.unwrap();
        assert_eq!(backend.read(Path::new("mod.jar")).await.unwrap(), b"0123456789");
        let mut buf = Vec::new();
        backend.reader(Path::new("mod.jar")).await.unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"0123456789");
        let err = backend.read(Path::new("missing.jar")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_write_stream() {
        let backend = MockBackend::default();
        let chunks = futures::stream::iter([Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"c"))]);
        assert_eq!(backend.write_stream(Path::new("mod.jar"), Box::pin(chunks)).await.unwrap(), 3);
        assert_eq!(backend.read(Path::new("mod.jar")).await.unwrap(), b"abc");

        let failing = futures::stream::iter([Ok(Bytes::from_static(b"partial")), Err(std::io::Error::other("reset"))]);
        assert!(backend.write_stream(Path::new("other.jar"), Box::pin(failing)).await.is_err());
        assert!(!backend.exists(Path::new("other.jar")).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_delete() {
        let backend = MockBackend::with_files([("old.jar", b"data".to_vec())]);
        backend.rename(Path::new("old.jar"), Path::new("new.jar")).await.unwrap();
        assert!(!backend.exists(Path::new("old.jar")).await.unwrap());
        assert_eq!(backend.read(Path::new("new.jar")).await.unwrap(), b"data");
        let err = backend.rename(Path::new("old.jar"), Path::new("new.jar")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));

        backend.delete(Path::new("new.jar")).await.unwrap();
        assert!(backend.delete(Path::new("new.jar")).await.is_err());
    }

    #[tokio::test]
    async fn test_stat_and_set_modified() {
        let backend = MockBackend::with_files([("mod.jar", b"12345".to_vec())]).with_name("test");
        let modified = time::macros::datetime!(2024-01-02 03:04:05 UTC);
        backend.set_modified("mod.jar", modified).await;
        let info = backend.stat(Path::new("mod.jar")).await.unwrap();
        assert_eq!(info, FileInfo::new("mod.jar", 5, modified));
        assert_eq!(backend.name(), "test");
    }

    #[tokio::test]
    async fn test_rejects_nested_paths() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("disabled/mod.jar"), b"x").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape.jar", b"bad".to_vec())]);
    }
}
