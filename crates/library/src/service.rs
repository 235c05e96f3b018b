//! The operations modsync offers to a host (CLI, HTTP server).
//!
//! [`ModService`] wires the catalog cache, the refresher, the scanner, the
//! matcher and the updater together. Every operation returns a structured
//! value; upstream trouble is logged and turned into empty results or
//! unsuccessful outcomes rather than errors.

use crate::matcher::{Matcher, match_identity};
use crate::refresh::{RefreshOptions, RefreshOutcome, Refresher};
use crate::scan::{self, ScanEvent, ScanOptions};
use crate::update::Updater;
use futures::StreamExt;
use modsync_cache::{CatalogCache, RefreshStatus};
use modsync_extract::models::{CatalogEntry, LocalModIdentity, MatchResult, UpdateOutcome, UpdateStatus};
use modsync_source::SourceHandle;
use modsync_storage::{BackendHandle, validate_path};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Tunables of a [`ModService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub scan: ScanOptions,
    pub refresh: RefreshOptions,
    /// Entries per page of [`ModService::cached_catalog_page`].
    pub catalog_page_size: usize,
    /// Maximum results of [`ModService::search_catalog`].
    pub search_page_size: usize,
    /// Origins an HTTP host should allow cross-origin requests from.
    pub allowed_origins: Vec<String>,
}
impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            refresh: RefreshOptions::default(),
            catalog_page_size: 50,
            search_page_size: 50,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// An installed file and what it matched in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstalledMatch {
    pub identity: LocalModIdentity,
    pub result: MatchResult,
}

pub struct ModService {
    source: SourceHandle,
    backend: BackendHandle,
    cache: Arc<CatalogCache>,
    refresher: Refresher,
    updater: Updater,
    options: ServiceOptions,
}

impl ModService {
    /// `backend` is rooted at the mods directory. Wrap it in a
    /// [`ReadOnlyBackend`](modsync_storage::backend::ReadOnlyBackend) for a
    /// dry run.
    pub fn new(source: SourceHandle, backend: BackendHandle, options: ServiceOptions) -> Self {
        let cache = Arc::new(CatalogCache::new());
        Self {
            refresher: Refresher::new(source.clone(), cache.clone(), options.refresh.clone()),
            updater: Updater::new(source.clone(), backend.clone()),
            source,
            backend,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Start the background refresh loop.
    pub fn spawn_refresh(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        self.refresher.clone().spawn(interval, cancel)
    }

    /// Live search against the catalog source. Failures yield no results.
    #[instrument(skip(self))]
    pub async fn search_catalog(&self, term: &str) -> Vec<CatalogEntry> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }
        match self.source.search(term, self.options.search_page_size).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = ?err, retryable = err.is_retryable(), "Catalog search failed");
                Vec::new()
            },
        }
    }

    /// One page of the cached catalog, in listing order.
    pub fn cached_catalog_page(&self, offset: usize) -> Vec<CatalogEntry> {
        self.cache.page(offset, self.options.catalog_page_size)
    }

    /// Scan the mods directory and match every mod against the current
    /// snapshot. Files that cannot be read are logged and left out.
    #[instrument(skip(self))]
    pub async fn match_installed(&self) -> Vec<InstalledMatch> {
        let snapshot = self.cache.all();
        let matcher = Matcher::new(&snapshot);
        let mut matches = Vec::new();
        let mut events = std::pin::pin!(scan::scan(&self.backend, &self.options.scan));
        while let Some(event) = events.next().await {
            match event {
                Ok(ScanEvent::Identified(identity)) => {
                    let result = matcher.match_identity(&identity);
                    matches.push(InstalledMatch {
                        identity: *identity,
                        result,
                    });
                },
                Ok(_) => {},
                Err(err) => tracing::warn!(error = ?err, "Skipping unreadable installed file"),
            }
        }
        matches.sort_by(|a, b| a.identity.path.cmp(&b.identity.path));
        tracing::info!(installed = matches.len(), catalog = snapshot.len(), "Matched installed mods");
        matches
    }

    /// Update one installed file, given by its path relative to the mods
    /// directory.
    ///
    /// The file is identified afresh and matched against the current
    /// snapshot. The matched entry is re-fetched from the source so the
    /// newest file is known; the cached entry is used when that fails.
    #[instrument(skip(self))]
    pub async fn trigger_update(&self, file_name: &str) -> UpdateOutcome {
        let path = match validate_path(file_name) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(error = ?err, "Rejected update request");
                return UpdateOutcome::failed(format!("{file_name:?} is not a valid path in the mods directory"));
            },
        };
        if !path.file_name().and_then(|name| name.to_str()).is_some_and(|name| self.options.scan.accepts_name(name)) {
            return UpdateOutcome::unsuccessful(UpdateStatus::NotMatched, format!("{file_name} is not a mod archive"));
        }
        let identity = match scan::identify(&self.backend, &path).await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not identify installed file");
                return UpdateOutcome::failed(format!("{file_name} could not be read from the mods directory"));
            },
        };
        let Some(slug) = match_identity(&identity, &self.cache.all()).slug else {
            return UpdateOutcome::unsuccessful(
                UpdateStatus::NotMatched,
                format!("{file_name} does not match any mod in the catalog"),
            );
        };
        let entry = match self.source.get_by_slug(&slug).await {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => self.cache.get(&slug),
            Err(err) => {
                tracing::warn!(error = ?err, %slug, "Could not refresh catalog entry, using cached copy");
                self.cache.get(&slug)
            },
        };
        match entry {
            Some(entry) => self.updater.update(&identity, &entry).await,
            None => UpdateOutcome::unsuccessful(UpdateStatus::NotMatched, format!("{slug} is no longer in the catalog")),
        }
    }

    pub fn refresh_status(&self) -> RefreshStatus {
        self.cache.status()
    }

    /// Run a refresh cycle now, or join the one already running.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.refresher.refresh().await
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.options.allowed_origins
    }
}
