//! Catalog refresh cycles and their schedule.
//!
//! A cycle walks the remote listing page by page into a staging vector and
//! publishes it to the [`CatalogCache`] in one swap. Any page failure aborts
//! the cycle and the previous snapshot stays in service. Triggers that arrive
//! while a cycle is running are coalesced into it.
//!
//! [`Refresher::spawn`] runs a cycle immediately and then once per interval
//! until cancelled.

pub mod error;

use crate::refresh::error::{ErrorKind, Result};
use exn::ResultExt;
use modsync_cache::{CatalogCache, RefreshGuard};
use modsync_extract::models::CatalogEntry;
use modsync_source::SourceHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Shortest interval the scheduler will run at.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// How a cycle pages through the catalog.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Records requested per page. The catalog caps this at 50.
    pub page_size: usize,
    /// Safety cap on pages per cycle. Reaching it commits what was fetched.
    pub max_pages: usize,
    /// Pause between page requests.
    pub page_delay: Duration,
}
impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 200,
            page_delay: Duration::from_millis(250),
        }
    }
}

/// What a refresh trigger ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(tag = "outcome", rename_all = "snake_case"))]
pub enum RefreshOutcome {
    /// A new snapshot was published.
    Committed { entries: usize, pages: usize },
    /// Another cycle was already running; this trigger joined it.
    Coalesced,
    /// The cycle failed and the previous snapshot is still served.
    Failed { reason: String },
}

/// Runs refresh cycles from a catalog source into a cache.
#[derive(Clone)]
pub struct Refresher {
    source: SourceHandle,
    cache: Arc<CatalogCache>,
    options: RefreshOptions,
}
impl Refresher {
    pub fn new(source: SourceHandle, cache: Arc<CatalogCache>, options: RefreshOptions) -> Self {
        Self { source, cache, options }
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Run one cycle now, unless one is already running.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let guard = match self.cache.try_begin_refresh() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("Refresh already in progress, coalescing trigger");
                return RefreshOutcome::Coalesced;
            },
        };
        let staged = match self.fetch_all(&guard).await {
            Ok(staged) => staged,
            Err(err) => {
                let reason = err.to_string();
                tracing::debug!(error = ?err, "Refresh cycle aborted");
                guard.fail(reason.clone());
                return RefreshOutcome::Failed { reason };
            },
        };
        let pages = staged.pages;
        // The guard records a rejected commit as a failure itself.
        match guard.commit(staged.entries) {
            Ok(snapshot) => RefreshOutcome::Committed {
                entries: snapshot.len(),
                pages,
            },
            Err(err) => RefreshOutcome::Failed { reason: err.to_string() },
        }
    }

    async fn fetch_all(&self, guard: &RefreshGuard<'_>) -> Result<Staged> {
        let page_size = self.options.page_size.max(1);
        let max_pages = self.options.max_pages.max(1);
        let mut entries = Vec::new();
        for page in 0..max_pages {
            if page > 0 && !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
            guard.fetching(page);
            // Offsets advance by what was asked for: pages come back short,
            // even empty, when non-mod records are filtered out.
            let offset = page * page_size;
            let fetched = self
                .source
                .list_page(offset, page_size)
                .await
                .or_raise(|| ErrorKind::Source { page, offset })?;
            if fetched.is_exhausted() {
                tracing::info!(pages = page, entries = entries.len(), "Fetched full catalog");
                return Ok(Staged { entries, pages: page });
            }
            tracing::debug!(
                page,
                offset,
                records = fetched.raw_count,
                fetched = fetched.entries.len(),
                "Fetched catalog page"
            );
            entries.extend(fetched.entries);
        }
        tracing::warn!(max_pages, entries = entries.len(), "Reached page limit, committing partial catalog");
        Ok(Staged {
            entries,
            pages: max_pages,
        })
    }

    /// Run a cycle immediately, then every `interval` until `cancel` fires.
    ///
    /// A cycle in flight when cancellation arrives is abandoned; the cache
    /// keeps its previous snapshot.
    pub fn spawn(self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {},
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    outcome = self.refresh() => match outcome {
                        RefreshOutcome::Committed { entries, pages } => {
                            tracing::info!(entries, pages, "Scheduled refresh committed");
                        },
                        RefreshOutcome::Coalesced => {},
                        RefreshOutcome::Failed { reason } => {
                            tracing::warn!(%reason, "Scheduled refresh failed");
                        },
                    },
                }
            }
            tracing::info!("Refresh scheduler stopped");
        })
    }
}

struct Staged {
    entries: Vec<CatalogEntry>,
    pages: usize,
}
