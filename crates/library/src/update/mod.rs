//! Safe in-place updates of installed mods.
//!
//! An update downloads the newest file of a catalog entry next to the
//! installed one under a hidden temporary name, verifies it against the
//! published length and digest, renames it into place and only then removes
//! the old file. Every failure before the rename leaves the mods directory
//! exactly as it was.
//!
//! An update claims both the installed file and the file name it installs.
//! A second request touching either while one is running is answered with
//! [`InProgress`](UpdateStatus::InProgress) instead of racing it, so two
//! installed copies of one mod never share a temporary download.

pub mod error;

use crate::digest::{ContentDigest, ContentHasher};
use crate::update::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use modsync_extract::models::{CatalogEntry, FileRecord, HashAlgorithm, LocalModIdentity, UpdateOutcome, UpdateStatus};
use modsync_extract::{ModVersion, extract_version, strip_extension};
use modsync_source::{DownloadLink, SourceHandle};
use modsync_storage::error::ErrorKind as StorageErrorKind;
use modsync_storage::{BackendHandle, ByteStream, validate_file_name};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::instrument;

/// Appended to the hidden name a download is written under until verified.
pub const TEMP_SUFFIX: &str = ".modsync-part";

/// Downloads, verifies and installs newer versions of installed mods.
pub struct Updater {
    source: SourceHandle,
    backend: BackendHandle,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl Updater {
    pub fn new(source: SourceHandle, backend: BackendHandle) -> Self {
        Self {
            source,
            backend,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Bring `installed` up to the newest file of `entry`.
    ///
    /// Never returns an error: every failure is reported through the
    /// returned [`UpdateOutcome`], with the installed file left in place.
    #[instrument(skip_all, fields(file = %installed.file_name, slug = %entry.slug))]
    pub async fn update(&self, installed: &LocalModIdentity, entry: &CatalogEntry) -> UpdateOutcome {
        let Some(_claim) = self.claim(&installed.path) else {
            tracing::info!("Update already running for this file");
            return UpdateOutcome::unsuccessful(
                UpdateStatus::InProgress,
                format!("An update of {} is already running", installed.file_name),
            );
        };
        match self.update_inner(installed, entry).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = ?err, "Update failed, installed file left in place");
                UpdateOutcome::failed(err.to_string())
            },
        }
    }

    async fn update_inner(&self, installed: &LocalModIdentity, entry: &CatalogEntry) -> Result<UpdateOutcome> {
        let Some(newest) = entry.newest_file() else {
            exn::bail!(ErrorKind::NoFiles(entry.name.clone()));
        };
        if !is_newer(installed, newest) {
            return Ok(UpdateOutcome::up_to_date(format!("{} is already up to date", entry.name)));
        }
        // Checked before anything is downloaded or written.
        let new_name = validate_file_name(&newest.file_name)
            .or_raise(|| ErrorKind::UnsafeFileName(newest.file_name.clone()))?
            .to_string();
        let target = PathBuf::from(&new_name);
        // Held until the new file is in place.
        let Some(_target_claim) = self.claim(&target) else {
            tracing::info!(new = %new_name, "Another update is installing the same file");
            return Ok(UpdateOutcome::unsuccessful(
                UpdateStatus::InProgress,
                format!("Another update is already installing {new_name}"),
            ));
        };

        let link = self
            .source
            .download_url(entry.mod_id, newest.file_id)
            .await
            .or_raise(|| ErrorKind::Download(new_name.clone()))?;
        let url = match link {
            DownloadLink::Url(url) => url,
            DownloadLink::Forbidden => {
                return Ok(UpdateOutcome::unsuccessful(
                    UpdateStatus::Forbidden,
                    format!(
                        "The author of {} does not allow third-party downloads, download it manually from {}",
                        entry.name, entry.url
                    ),
                ));
            },
            DownloadLink::Unavailable => match &newest.download_url {
                Some(url) => {
                    tracing::debug!("No link from the download endpoint, using the listed one");
                    url.clone()
                },
                None => exn::bail!(ErrorKind::NoDownloadLink(new_name)),
            },
        };

        let temp = PathBuf::from(format!(".{new_name}{TEMP_SUFFIX}"));

        let digest = match self.download_to(&url, &temp, &new_name).await {
            Ok(digest) => digest,
            Err(err) => {
                self.discard(&temp).await;
                return Err(err);
            },
        };
        if let Err(mismatch) = digest.verify(newest) {
            self.discard(&temp).await;
            exn::bail!(ErrorKind::Verification {
                file: new_name,
                reason: mismatch.to_string(),
            });
        }
        if let Err(err) = self.backend.rename(&temp, &target).await {
            self.discard(&temp).await;
            return Err(err.raise(ErrorKind::Storage(new_name)));
        }

        let version = remote_version(newest).unwrap_or_else(|| new_name.clone());
        let mut message = format!("Updated {} to {version}", entry.name);
        if target != installed.path {
            if let Err(err) = self.backend.delete(&installed.path).await {
                tracing::warn!(error = ?err, "New version installed but the old file could not be removed");
                message.push_str(&format!(", the old file {} could not be removed", installed.file_name));
            }
        }
        tracing::info!(new = %new_name, "Mod updated");
        Ok(UpdateOutcome::updated(new_name, installed.file_name.clone(), message))
    }

    /// Stream a download into `temp`, hashing it on the way through.
    async fn download_to(&self, url: &str, temp: &Path, file_name: &str) -> Result<ContentDigest> {
        let download = self.source.download(url).await.or_raise(|| ErrorKind::Download(file_name.to_string()))?;
        let hasher = Arc::new(Mutex::new(ContentHasher::new()));
        let observer = hasher.clone();
        let chunks: ByteStream<'_> = Box::pin(download.map(move |chunk| match chunk {
            Ok(bytes) => {
                lock(&observer).update(&bytes);
                Ok(bytes)
            },
            Err(err) => Err(std::io::Error::other(err.to_string())),
        }));
        let written = self
            .backend
            .write_stream(temp, chunks)
            .await
            .or_raise(|| ErrorKind::Download(file_name.to_string()))?;
        let digest = std::mem::take(&mut *lock(&hasher)).finish();
        tracing::debug!(bytes = written, sha1 = %digest.sha1, "Downloaded update");
        Ok(digest)
    }

    /// Best-effort removal of a temporary download.
    async fn discard(&self, temp: &Path) {
        match self.backend.delete(temp).await {
            Ok(()) => tracing::debug!(path = %temp.display(), "Removed partial download"),
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {},
            Err(err) => tracing::warn!(path = %temp.display(), error = ?err, "Could not remove partial download"),
        }
    }

    fn claim(&self, path: &Path) -> Option<Claim<'_>> {
        lock(&self.in_flight).insert(path.to_path_buf()).then(|| Claim {
            in_flight: &self.in_flight,
            path: path.to_path_buf(),
        })
    }
}

/// Marks one installed file as being updated until dropped.
struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}
impl Drop for Claim<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.path);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remote_version(file: &FileRecord) -> Option<String> {
    extract_version(&file.display_name).or_else(|| extract_version(strip_extension(&file.file_name)))
}

/// Whether `newest` should replace `installed`.
///
/// Identical content or an identical file name means no. Otherwise the
/// versions in the names decide when both parse, then the publication date
/// against the local modification time. With no usable signal the remote
/// file is assumed newer.
pub(crate) fn is_newer(installed: &LocalModIdentity, newest: &FileRecord) -> bool {
    if newest.has_hash(HashAlgorithm::Sha1, &installed.sha1) || newest.has_hash(HashAlgorithm::Md5, &installed.md5) {
        return false;
    }
    if newest.file_name == installed.file_name {
        return false;
    }
    let local = installed.version().and_then(|version| version.parse::<ModVersion>().ok());
    let remote = remote_version(newest).and_then(|version| version.parse::<ModVersion>().ok());
    if let (Some(local), Some(remote)) = (local, remote) {
        return remote > local;
    }
    match (newest.file_date, installed.modified) {
        (Some(published), Some(modified)) => published > modified,
        _ => true,
    }
}
