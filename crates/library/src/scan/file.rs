use crate::digest::ContentDigest;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use modsync_extract::models::LocalModIdentity;
use modsync_storage::{BackendHandle, FileInfo};
use std::path::Path;
use tracing::instrument;

/// Compute the identity of a single installed file.
///
/// `path` is relative to the root of `backend`. The contents are streamed
/// through SHA1 and MD5 on a blocking thread; the file is never loaded into
/// memory whole.
pub async fn identify(backend: &BackendHandle, path: &Path) -> LibraryResult<LocalModIdentity> {
    identify_inner(backend, path).await.or_raise(|| LibraryErrorKind::Scan)
}

pub(crate) async fn identify_inner(backend: &BackendHandle, path: &Path) -> Result<LocalModIdentity> {
    let info = backend.stat(path).await.or_raise(|| ErrorKind::Storage)?;
    identify_file_inner(backend, info).await
}

#[instrument(skip(backend, info), fields(path = %info.path.display()))]
pub(crate) async fn identify_file_inner(backend: &BackendHandle, info: FileInfo) -> Result<LocalModIdentity> {
    let reader = backend.reader(&info.path).await.or_raise(|| ErrorKind::Storage)?;
    let digest = tokio::task::spawn_blocking(move || ContentDigest::from_reader(reader))
        .await
        .or_raise(|| ErrorKind::Hashing)?
        .or_raise(|| ErrorKind::Hashing)?;
    if digest.length != info.size {
        // Someone is writing to the file while we read it; the digest is of
        // whatever we saw.
        tracing::warn!(expected = info.size, actual = digest.length, "File changed size while hashing");
    }
    tracing::debug!(sha1 = %digest.sha1, size = digest.length, "Identified installed mod");
    Ok(LocalModIdentity::new(info.path, digest.sha1, digest.md5, digest.length).with_modified(info.modified))
}
