//! Remote mod catalog boundary.
//!
//! [`CatalogSource`] is everything the rest of modsync needs from an
//! upstream catalog: paged listing, search, lookup by slug, download links
//! and the downloads themselves. [`CurseForgeSource`] talks to the CurseForge
//! REST API; `MockSource` (feature `mock`) serves canned data for tests.

mod curseforge;
pub mod error;
#[cfg(feature = "mock")]
mod mock;

pub use crate::curseforge::{CurseForgeOptions, CurseForgeSource, DEFAULT_BASE_URL, DEFAULT_GAME_ID};
use crate::error::Result;
#[cfg(feature = "mock")]
pub use crate::mock::MockSource;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use modsync_extract::models::CatalogEntry;
use std::pin::Pin;
use std::sync::Arc;

pub type SourceHandle = Arc<dyn CatalogSource + Send + Sync>;

/// Chunks of a file being downloaded.
pub type DownloadStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// One page of the full catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// Mod records of the page, in listing order.
    pub entries: Vec<CatalogEntry>,
    /// Records the upstream page held before non-mod records were dropped.
    pub raw_count: usize,
}
impl CatalogPage {
    /// Nothing upstream at or past this page's offset.
    ///
    /// A page of only modpacks or worlds has no entries but is not the end.
    pub fn is_exhausted(&self) -> bool {
        self.raw_count == 0
    }
}

/// Where a catalog file can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadLink {
    Url(String),
    /// The author has disabled third-party distribution.
    Forbidden,
    /// The catalog returned no link for this file.
    Unavailable,
}

/// Unified interface for remote mod catalogs.
///
/// Record-level problems (entries that are not mods, unusable hashes) are
/// filtered out by implementations; only whole-response failures surface as
/// errors.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Name of the catalog, used for logging only.
    fn name(&self) -> &str;

    /// Free-text search, returning at most `page_size` entries.
    async fn search(&self, term: &str, page_size: usize) -> Result<Vec<CatalogEntry>>;

    /// One page of the full catalog listing, starting at `offset`.
    ///
    /// Non-mod records are filtered out, so a page can hold fewer entries
    /// than `page_size`, or none, without being the last one. Only
    /// [`CatalogPage::is_exhausted`] marks the end of the listing.
    async fn list_page(&self, offset: usize, page_size: usize) -> Result<CatalogPage>;

    /// Fresh copy of a single entry.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<CatalogEntry>>;

    /// Resolve the download location of one file of one mod.
    async fn download_url(&self, mod_id: u64, file_id: u64) -> Result<DownloadLink>;

    /// Start downloading from a resolved location.
    async fn download(&self, url: &str) -> Result<DownloadStream>;
}
