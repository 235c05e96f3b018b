use crate::backend::{BoxSyncRead, ByteStream, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::{FileInfo, StorageBackend, validate_path};
use async_stream::stream;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// The mods directory on the local filesystem.
///
/// ```no_run
/// use modsync_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("mods", "/opt/hytale/mods")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// `root` must be absolute. It is created if missing, and must be a
    /// directory if present.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Blocking, but only once at startup.
        std::fs::create_dir_all(&root).map_err(|err| ErrorKind::from_io(err, &root))?;
        Ok(Self { name: name.into(), root })
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    fn info(name: PathBuf, metadata: &Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo::new(name, metadata.len(), modified))
    }

    async fn drain_into(file: &mut fs::File, mut stream: ByteStream<'_>) -> std::io::Result<u64> {
        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(err) => {
                    yield Err(exn::Exn::from(ErrorKind::from_io(err, &self.root)));
                    return;
                },
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(err, &self.root)));
                        break;
                    },
                };
                // Follows symlinks; broken links and directories are skipped.
                match fs::metadata(entry.path()).await {
                    Ok(metadata) if metadata.is_file() => yield Self::info(PathBuf::from(entry.file_name()), &metadata),
                    Ok(_) => {},
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
                    Err(err) => yield Err(exn::Exn::from(ErrorKind::from_io(err, &entry.path()))),
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(&full).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        Ok(fs::read(&full).await.map_err(|err| ErrorKind::from_io(err, path))?)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let full = self.resolve(path)?;
        let file = fs::File::open(&full).await.map_err(|err| ErrorKind::from_io(err, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        Ok(fs::write(&full, data).await.map_err(|err| ErrorKind::from_io(err, path))?)
    }

    async fn write_stream(&self, path: &Path, stream: ByteStream<'_>) -> Result<u64> {
        let full = self.resolve(path)?;
        let mut file = fs::File::create(&full).await.map_err(|err| ErrorKind::from_io(err, path))?;
        let result = Self::drain_into(&mut file, stream).await;
        drop(file);
        match result {
            Ok(written) => Ok(written),
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&full).await {
                    tracing::warn!(path = %path.display(), error = %cleanup, "Partial file left behind");
                }
                exn::bail!(ErrorKind::from_io(err, path))
            },
        }
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let full = self.resolve(path)?;
        Ok(fs::remove_file(&full).await.map_err(|err| ErrorKind::from_io(err, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        Ok(fs::rename(&source, &target).await.map_err(|err| ErrorKind::from_io(err, from))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let full = self.resolve(path)?;
        let metadata = fs::metadata(&full).await.map_err(|err| ErrorKind::from_io(err, path))?;
        Self::info(validate_path(path)?, &metadata)
    }
}
