use crate::backend::{BoxSyncRead, ByteStream, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::{BackendHandle, FileInfo, StorageBackend};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::path::Path;

/// Dry-run wrapper: reads pass through, mutations are logged and reported as
/// successful without touching the wrapped backend.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        self.inner.list_stream()
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        self.inner.reader(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(path = %path.display(), bytes = data.len(), "Dry run: not writing");
        Ok(())
    }

    // Drained anyway so a download is still hashed and verified.
    async fn write_stream(&self, path: &Path, stream: ByteStream<'_>) -> Result<u64> {
        let bytes = stream
            .try_fold(0u64, |total, chunk| async move { Ok(total + chunk.len() as u64) })
            .await
            .map_err(ErrorKind::Io)?;
        tracing::info!(path = %path.display(), bytes, "Dry run: downloaded but not written");
        Ok(bytes)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Dry run: not deleting");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(from = %from.display(), to = %to.display(), "Dry run: not renaming");
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use bytes::Bytes;
    use std::sync::Arc;

    fn dry_run(dir: &tempfile::TempDir) -> ReadOnlyBackend {
        ReadOnlyBackend::new(Arc::new(LocalBackend::new("mods", dir.path()).unwrap()))
    }

    #[tokio::test]
    async fn test_mutations_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("CoolSword-1.0.0.jar"), b"installed").unwrap();
        let backend = dry_run(&temp_dir);

        backend.write(Path::new("CoolSword-1.2.0.jar"), b"new").await.unwrap();
        backend.rename(Path::new("CoolSword-1.0.0.jar"), Path::new("CoolSword-1.2.0.jar")).await.unwrap();
        backend.delete(Path::new("CoolSword-1.0.0.jar")).await.unwrap();

        let listed = backend.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, Path::new("CoolSword-1.0.0.jar"));
        assert_eq!(backend.read(Path::new("CoolSword-1.0.0.jar")).await.unwrap(), b"installed");
    }

    #[tokio::test]
    async fn test_write_stream_is_drained() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = dry_run(&temp_dir);
        let chunks = futures::stream::iter([Ok(Bytes::from_static(b"abc")), Ok(Bytes::from_static(b"de"))]);
        assert_eq!(backend.write_stream(Path::new("mod.jar"), Box::pin(chunks)).await.unwrap(), 5);
        assert!(!backend.exists(Path::new("mod.jar")).await.unwrap());

        let failing = futures::stream::iter([Ok(Bytes::from_static(b"abc")), Err(std::io::Error::other("reset"))]);
        assert!(backend.write_stream(Path::new("mod.jar"), Box::pin(failing)).await.is_err());
    }
}
