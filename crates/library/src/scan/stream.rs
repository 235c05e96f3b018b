use crate::MAX_HASH_CONCURRENCY;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind as ScanErrorKind, Result as ScanResult};
use crate::scan::file::identify_file_inner;
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use modsync_extract::models::LocalModIdentity;
use modsync_storage::{BackendHandle, FileInfo};

/// Which files in the mods directory count as mods.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Accepted file extensions, compared case-insensitively, without the dot.
    pub extensions: Vec<String>,
}
impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["jar".to_string(), "zip".to_string()],
        }
    }
}
impl ScanOptions {
    pub fn accepts(&self, info: &FileInfo) -> bool {
        info.file_name().is_some_and(|file_name| self.accepts_name(file_name))
    }

    /// Hidden files (including in-progress downloads) are never mods.
    pub fn accepts_name(&self, file_name: &str) -> bool {
        if file_name.starts_with('.') {
            return false;
        }
        match file_name.rsplit_once('.') {
            Some((_, extension)) => self.extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(extension)),
            None => false,
        }
    }
}

/// Progress events emitted by [`scan`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of mod files found.
/// 3. [`Identified`](Self::Identified), once per file that could be hashed.
/// 4. [`Complete`](Self::Complete), exactly once.
///
/// A listing failure terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    DiscoveryComplete(u64),
    Identified(Box<LocalModIdentity>),
    Complete,
}

/// Streams [`ScanEvent`]s for every mod archive in `backend`.
///
/// Files are hashed concurrently, up to `MAX_HASH_CONCURRENCY` at a time.
/// Individual file failures are surfaced as `Err` items without terminating
/// the stream.
pub fn scan<'a>(backend: &'a BackendHandle, options: &'a ScanOptions) -> impl Stream<Item = LibraryResult<ScanEvent>> + 'a {
    stream! {
        for await event in scan_inner(backend, options) {
            yield event.or_raise(|| LibraryErrorKind::Scan);
        }
    }
}

fn scan_inner<'a>(backend: &'a BackendHandle, options: &'a ScanOptions) -> impl Stream<Item = ScanResult<ScanEvent>> + 'a {
    stream!({
        yield Ok(ScanEvent::Started);

        // A mods directory holds tens to hundreds of files; list it up front
        // so the total is known before any hashing starts.
        let listing: Vec<FileInfo> = match backend.list().await {
            Ok(listing) => listing,
            Err(err) => {
                yield Err(err.raise(ScanErrorKind::Storage));
                return;
            },
        };
        let total = listing.len();
        let files: Vec<FileInfo> = listing.into_iter().filter(|info| options.accepts(info)).collect();
        tracing::debug!(total, mods = files.len(), backend = backend.name(), "Listed mods directory");
        yield Ok(ScanEvent::DiscoveryComplete(u64::try_from(files.len()).unwrap_or(0)));

        let mut futures: Vec<_> = files.into_iter().map(|info| identify_file_inner(backend, info)).collect();
        let mut processing = FuturesUnordered::new();
        processing.extend(futures.drain(..MAX_HASH_CONCURRENCY.min(futures.len())));
        while let Some(result) = processing.next().await {
            yield result.map(|identity| ScanEvent::Identified(Box::new(identity)));
            // Pop-n-push, FIFO.
            if !futures.is_empty() {
                processing.push(futures.remove(0));
            }
        }

        yield Ok(ScanEvent::Complete);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use modsync_storage::backend::MockBackend;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn info(path: &str) -> FileInfo {
        FileInfo::new(path, 1, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn test_accepts() {
        let options = ScanOptions::default();
        assert!(options.accepts(&info("CoolSword.jar")));
        assert!(options.accepts(&info("Better-Mobs.ZIP")));
        assert!(!options.accepts(&info("readme.txt")));
        assert!(!options.accepts(&info("noextension")));
        assert!(!options.accepts(&info(".CoolSword-1.3.0.jar.modsync-part")));
        assert!(!options.accepts(&info(".hidden.jar")));
    }

    #[tokio::test]
    async fn test_scan_identifies_mods_only() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files([
            ("a.jar", b"aaa".to_vec()),
            ("b.zip", b"bbbb".to_vec()),
            ("notes.txt", b"hello".to_vec()),
            (".c.jar.modsync-part", b"partial".to_vec()),
        ]));
        let options = ScanOptions::default();
        let events: Vec<ScanEvent> = scan(&backend, &options).try_collect().await.unwrap();

        assert!(matches!(events.first(), Some(ScanEvent::Started)));
        assert!(matches!(events.get(1), Some(ScanEvent::DiscoveryComplete(2))));
        assert!(matches!(events.last(), Some(ScanEvent::Complete)));
        let mut identified: Vec<PathBuf> = events
            .into_iter()
            .filter_map(|event| match event {
                ScanEvent::Identified(identity) => Some(identity.path),
                _ => None,
            })
            .collect();
        identified.sort();
        assert_eq!(identified, [Path::new("a.jar"), Path::new("b.zip")]);
    }

    #[tokio::test]
    async fn test_scan_empty_directory() {
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let options = ScanOptions::default();
        let events: Vec<ScanEvent> = scan(&backend, &options).try_collect().await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], ScanEvent::DiscoveryComplete(0)));
    }
}
