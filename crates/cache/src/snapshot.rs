use modsync_extract::models::CatalogEntry;
use std::collections::HashMap;
use time::OffsetDateTime;

/// An immutable, fully built view of the catalog.
///
/// Snapshots are never mutated after construction; a refresh builds a new one
/// and swaps it in. Slugs are unique: when a refresh yields the same slug
/// twice, the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<CatalogEntry>,
    by_slug: HashMap<String, usize>,
    refreshed_at: Option<OffsetDateTime>,
}
impl Snapshot {
    /// The snapshot served before the first successful refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from the staged entries of a completed refresh.
    pub fn build(staged: impl IntoIterator<Item = CatalogEntry>, refreshed_at: OffsetDateTime) -> Self {
        let mut entries = Vec::new();
        let mut by_slug = HashMap::new();
        let mut duplicates = 0usize;
        for entry in staged {
            if by_slug.contains_key(&entry.slug) {
                duplicates += 1;
                continue;
            }
            by_slug.insert(entry.slug.clone(), entries.len());
            entries.push(entry);
        }
        if duplicates > 0 {
            tracing::debug!(duplicates, "Dropped duplicate slugs while building catalog snapshot");
        }
        Self {
            entries,
            by_slug,
            refreshed_at: Some(refreshed_at),
        }
    }

    pub fn get(&self, slug: &str) -> Option<&CatalogEntry> {
        self.by_slug.get(slug).map(|&index| &self.entries[index])
    }

    /// Entries in the order the catalog listed them.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A window of entries; out-of-range offsets give an empty page.
    pub fn page(&self, offset: usize, limit: usize) -> &[CatalogEntry] {
        let start = offset.min(self.entries.len());
        let end = start.saturating_add(limit).min(self.entries.len());
        &self.entries[start..end]
    }

    /// When the refresh that built this snapshot completed.
    pub fn refreshed_at(&self) -> Option<OffsetDateTime> {
        self.refreshed_at
    }
}
