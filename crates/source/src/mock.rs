//! In-memory catalog source for testing.

use crate::error::{ErrorKind, Result};
use crate::{CatalogPage, CatalogSource, DownloadLink, DownloadStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use modsync_extract::models::CatalogEntry;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct State {
    catalog: Vec<CatalogEntry>,
    non_mods: HashSet<usize>,
    fail_at_offset: Option<usize>,
    links: HashMap<(u64, u64), DownloadLink>,
    payloads: HashMap<String, Vec<u8>>,
    latency: Option<Duration>,
    download_latency: Option<Duration>,
}

/// In-memory catalog source for testing.
///
/// Listing pages are slices of a single catalog vector, so a test can swap the
/// whole catalog between refresh cycles and inject a failure at a given page
/// offset. Positions marked as non-mods still count as upstream records but
/// are never returned, like modpacks in a real listing. Download links and
/// payloads are registered per file.
///
/// # Examples
///
/// ```
/// use modsync_source::{CatalogSource, DownloadLink, MockSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MockSource::default()
///     .with_download(1, 2, "https://edge/mod.jar", b"PK...");
/// assert_eq!(
///     source.download_url(1, 2).await.unwrap(),
///     DownloadLink::Url("https://edge/mod.jar".to_string())
/// );
/// # }
/// ```
#[derive(Default)]
pub struct MockSource {
    state: Mutex<State>,
    list_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockSource {
    pub fn with_catalog(catalog: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let source = Self::default();
        source.set_catalog(catalog);
        source
    }

    /// Treat the records at these catalog positions as modpacks, worlds or
    /// anything else that is not a mod.
    pub fn with_non_mods(self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.lock().non_mods.extend(positions);
        self
    }

    /// Register a downloadable file.
    pub fn with_download(self, mod_id: u64, file_id: u64, url: &str, payload: &[u8]) -> Self {
        {
            let mut state = self.lock();
            state.links.insert((mod_id, file_id), DownloadLink::Url(url.to_string()));
            state.payloads.insert(url.to_string(), payload.to_vec());
        }
        self
    }

    /// Register a non-URL answer for a file's download link.
    pub fn with_link(self, mod_id: u64, file_id: u64, link: DownloadLink) -> Self {
        self.lock().links.insert((mod_id, file_id), link);
        self
    }

    /// Serve bytes at a URL without registering a link for it.
    pub fn with_payload(self, url: &str, payload: &[u8]) -> Self {
        self.lock().payloads.insert(url.to_string(), payload.to_vec());
        self
    }

    /// Delay every listing call, to widen race windows in tests.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    /// Delay every chunk of every download.
    pub fn with_download_latency(self, latency: Duration) -> Self {
        self.lock().download_latency = Some(latency);
        self
    }

    pub fn set_catalog(&self, catalog: impl IntoIterator<Item = CatalogEntry>) {
        self.lock().catalog = catalog.into_iter().collect();
    }

    /// Make listing fail at exactly this offset. `None` clears it.
    pub fn fail_at_offset(&self, offset: Option<usize>) {
        self.lock().fail_at_offset = offset;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread poisons the lock; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl State {
    fn mods(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.catalog
            .iter()
            .enumerate()
            .filter(|(position, _)| !self.non_mods.contains(position))
            .map(|(_, entry)| entry)
    }
}

#[async_trait]
impl CatalogSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, term: &str, page_size: usize) -> Result<Vec<CatalogEntry>> {
        let term = term.to_lowercase();
        let state = self.lock();
        Ok(state
            .mods()
            .filter(|entry| entry.name.to_lowercase().contains(&term) || entry.slug.contains(&term))
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn list_page(&self, offset: usize, page_size: usize) -> Result<CatalogPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        let state = self.lock();
        if state.fail_at_offset == Some(offset) {
            exn::bail!(ErrorKind::Network(format!("mock://catalog?index={offset}")));
        }
        let raw: Vec<(usize, &CatalogEntry)> = state.catalog.iter().enumerate().skip(offset).take(page_size).collect();
        Ok(CatalogPage {
            raw_count: raw.len(),
            entries: raw
                .into_iter()
                .filter(|(position, _)| !state.non_mods.contains(position))
                .map(|(_, entry)| entry.clone())
                .collect(),
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.lock().mods().find(|entry| entry.slug == slug).cloned())
    }

    async fn download_url(&self, mod_id: u64, file_id: u64) -> Result<DownloadLink> {
        Ok(self.lock().links.get(&(mod_id, file_id)).cloned().unwrap_or(DownloadLink::Unavailable))
    }

    async fn download(&self, url: &str) -> Result<DownloadStream> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.lock().download_latency;
        let Some(payload) = self.lock().payloads.get(url).cloned() else {
            exn::bail!(ErrorKind::Status {
                status: 404,
                url: url.to_string(),
            });
        };
        // Split in two so consumers see more than one chunk.
        let middle = payload.len() / 2;
        let payload = Bytes::from(payload);
        let chunks = vec![Ok(payload.slice(..middle)), Ok(payload.slice(middle..))];
        Ok(Box::pin(futures::stream::iter(chunks).then(move |chunk| async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            chunk
        })))
    }
}
