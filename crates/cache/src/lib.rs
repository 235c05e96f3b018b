//! In-memory catalog cache.
//!
//! Holds the most recent complete copy of the remote catalog as an immutable
//! [`Snapshot`] behind a single pointer. Readers clone the pointer and keep a
//! consistent view for as long as they like; a refresh builds a new snapshot
//! off to the side and publishes it in one swap. Nothing is persisted: the
//! cache is rebuilt on every start.
//!
//! # Refresh bookkeeping
//! The cache also tracks the refresh state machine so that status can be
//! reported and concurrent refresh triggers coalesce:
//!
//! ```text
//! Idle -> Fetching(0) -> Fetching(1) -> ... -> Committing -> Idle
//!              \______________ failure _______________/
//! ```
//!
//! A failed cycle keeps serving the previous snapshot and leaves
//! `last_refreshed_at` untouched.

pub mod error;
mod snapshot;
mod status;

pub use crate::snapshot::Snapshot;
pub use crate::status::{RefreshFailure, RefreshState, RefreshStatus};
use crate::error::{ErrorKind, Result};
use modsync_extract::models::CatalogEntry;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Bookkeeping {
    state: RefreshState,
    last_failure: Option<RefreshFailure>,
}

/// Shared catalog cache. Cheap to share behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use modsync_cache::CatalogCache;
///
/// let cache = CatalogCache::new();
/// let guard = cache.try_begin_refresh().unwrap();
/// // A second trigger while the first is running is coalesced.
/// assert!(cache.try_begin_refresh().is_err());
/// guard.fail("upstream unavailable");
/// assert!(cache.last_refreshed_at().is_none());
/// assert!(!cache.is_refreshing());
/// ```
#[derive(Debug)]
pub struct CatalogCache {
    snapshot: watch::Sender<Arc<Snapshot>>,
    bookkeeping: Mutex<Bookkeeping>,
}
impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}
impl CatalogCache {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::empty()));
        Self {
            snapshot,
            bookkeeping: Mutex::new(Bookkeeping::default()),
        }
    }

    /// The current snapshot. Iterating it never observes a later refresh.
    pub fn all(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn get(&self, slug: &str) -> Option<CatalogEntry> {
        self.snapshot.borrow().get(slug).cloned()
    }

    pub fn page(&self, offset: usize, limit: usize) -> Vec<CatalogEntry> {
        self.snapshot.borrow().page(offset, limit).to_vec()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    /// Completion time of the refresh that produced the current snapshot.
    pub fn last_refreshed_at(&self) -> Option<OffsetDateTime> {
        self.snapshot.borrow().refreshed_at()
    }

    pub fn is_refreshing(&self) -> bool {
        self.bookkeeping().state.is_refreshing()
    }

    pub fn status(&self) -> RefreshStatus {
        let bookkeeping = self.bookkeeping();
        let snapshot = self.all();
        RefreshStatus {
            state: bookkeeping.state,
            last_refreshed_at: snapshot.refreshed_at(),
            last_failure: bookkeeping.last_failure.clone(),
            entries: snapshot.len(),
        }
    }

    /// Receiver that is notified every time a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    /// Publish a complete catalog, replacing the current snapshot in one
    /// swap. Only [`RefreshGuard::commit`] calls this from outside tests.
    pub(crate) fn replace(&self, entries: impl IntoIterator<Item = CatalogEntry>) -> Result<Arc<Snapshot>> {
        let snapshot = Snapshot::build(entries, OffsetDateTime::now_utc());
        if snapshot.is_empty() {
            exn::bail!(ErrorKind::EmptyCatalog);
        }
        let snapshot = Arc::new(snapshot);
        self.snapshot.send_replace(snapshot.clone());
        tracing::info!(entries = snapshot.len(), "Published new catalog snapshot");
        Ok(snapshot)
    }

    /// Start a refresh cycle. Fails with
    /// [`RefreshInProgress`](ErrorKind::RefreshInProgress) when one is
    /// already running.
    pub fn try_begin_refresh(&self) -> Result<RefreshGuard<'_>> {
        let mut bookkeeping = self.bookkeeping();
        if bookkeeping.state.is_refreshing() {
            exn::bail!(ErrorKind::RefreshInProgress);
        }
        bookkeeping.state = RefreshState::Fetching { page: 0 };
        Ok(RefreshGuard {
            cache: self,
            finished: false,
        })
    }

    fn bookkeeping(&self) -> MutexGuard<'_, Bookkeeping> {
        // Bookkeeping is plain data, a poisoned lock is still consistent.
        self.bookkeeping.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: RefreshState) {
        self.bookkeeping().state = state;
    }

    fn record_failure(&self, reason: String) {
        tracing::warn!(reason = %reason, "Catalog refresh failed, keeping previous snapshot");
        let mut bookkeeping = self.bookkeeping();
        bookkeeping.state = RefreshState::Idle;
        bookkeeping.last_failure = Some(RefreshFailure {
            at: OffsetDateTime::now_utc(),
            reason,
        });
    }
}

/// Exclusive right to run one refresh cycle.
///
/// Finish it with [`commit`](Self::commit) or [`fail`](Self::fail). Dropping
/// it unfinished (a cancelled task, a panic) counts as a failure and returns
/// the cache to idle.
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    cache: &'a CatalogCache,
    finished: bool,
}
impl RefreshGuard<'_> {
    /// Report progress to the next page.
    pub fn fetching(&self, page: usize) {
        self.cache.set_state(RefreshState::Fetching { page });
    }

    /// Publish the staged entries and end the cycle.
    pub fn commit(mut self, entries: Vec<CatalogEntry>) -> Result<Arc<Snapshot>> {
        self.finished = true;
        self.cache.set_state(RefreshState::Committing);
        match self.cache.replace(entries) {
            Ok(snapshot) => {
                self.cache.set_state(RefreshState::Idle);
                Ok(snapshot)
            },
            Err(err) => {
                self.cache.record_failure(err.to_string());
                Err(err)
            },
        }
    }

    /// End the cycle without touching the snapshot.
    pub fn fail(mut self, reason: impl Into<String>) {
        self.finished = true;
        self.cache.record_failure(reason.into());
    }
}
impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.record_failure("refresh abandoned before completion".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(slug: &str, mod_id: u64) -> CatalogEntry {
        CatalogEntry {
            mod_id,
            slug: slug.to_string(),
            name: slug.to_string(),
            url: format!("https://host/mods/{slug}"),
            authors: vec![],
            latest_version: None,
            files: vec![],
        }
    }

    #[test]
    fn test_new_cache_is_empty_and_idle() {
        let cache = CatalogCache::new();
        assert!(cache.is_empty());
        assert!(cache.last_refreshed_at().is_none());
        let status = cache.status();
        assert_eq!(status.state, RefreshState::Idle);
        assert_eq!(status.entries, 0);
        assert!(status.last_failure.is_none());
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let cache = CatalogCache::new();
        cache.replace([entry("a", 1), entry("b", 2)]).unwrap();
        let before = cache.all();
        cache.replace([entry("c", 3)]).unwrap();
        let after = cache.all();
        // The old view is untouched by the swap.
        assert_eq!(before.iter().map(|e| e.slug.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(after.iter().map(|e| e.slug.as_str()).collect::<Vec<_>>(), ["c"]);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c").unwrap().mod_id, 3);
    }

    #[test]
    fn test_replace_rejects_empty() {
        let cache = CatalogCache::new();
        cache.replace([entry("a", 1)]).unwrap();
        let err = cache.replace([]).unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyCatalog);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_refresh_coalesces() {
        let cache = CatalogCache::new();
        let guard = cache.try_begin_refresh().unwrap();
        assert!(cache.is_refreshing());
        let err = cache.try_begin_refresh().unwrap_err();
        assert_eq!(*err, ErrorKind::RefreshInProgress);
        guard.fetching(3);
        assert_eq!(cache.status().state, RefreshState::Fetching { page: 3 });
        guard.commit(vec![entry("a", 1)]).unwrap();
        assert!(!cache.is_refreshing());
        assert!(cache.try_begin_refresh().is_ok());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let cache = CatalogCache::new();
        cache.try_begin_refresh().unwrap().commit(vec![entry("a", 1)]).unwrap();
        let refreshed_at = cache.last_refreshed_at();
        assert!(refreshed_at.is_some());

        cache.try_begin_refresh().unwrap().fail("page 2: timeout");

        assert_eq!(cache.last_refreshed_at(), refreshed_at);
        assert_eq!(cache.len(), 1);
        let status = cache.status();
        assert_eq!(status.state, RefreshState::Idle);
        assert_eq!(status.last_failure.unwrap().reason, "page 2: timeout");
    }

    #[test]
    fn test_empty_commit_is_a_failure() {
        let cache = CatalogCache::new();
        cache.try_begin_refresh().unwrap().commit(vec![entry("a", 1)]).unwrap();
        assert!(cache.try_begin_refresh().unwrap().commit(vec![]).is_err());
        assert_eq!(cache.len(), 1);
        assert!(cache.status().last_failure.is_some());
        assert!(!cache.is_refreshing());
    }

    #[test]
    fn test_dropped_guard_returns_to_idle() {
        let cache = CatalogCache::new();
        drop(cache.try_begin_refresh().unwrap());
        assert!(!cache.is_refreshing());
        assert!(cache.status().last_failure.unwrap().reason.contains("abandoned"));
    }

    #[tokio::test]
    async fn test_subscribers_see_commits() {
        let cache = CatalogCache::new();
        let mut receiver = cache.subscribe();
        cache.try_begin_refresh().unwrap().commit(vec![entry("a", 1)]).unwrap();
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_page() {
        let cache = CatalogCache::new();
        cache.replace((0..10).map(|i| entry(&format!("m{i}"), i))).unwrap();
        let page = cache.page(8, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].slug, "m8");
    }
}
