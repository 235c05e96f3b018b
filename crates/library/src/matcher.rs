//! Matching installed files to catalog entries.
//!
//! Tiers are tried strongest first and the first tier with a candidate wins:
//!
//! 1. [`HashExact`](MatchType::HashExact): a published SHA1 or MD5 of any file
//!    of the entry equals the local digest.
//! 2. [`SlugExact`](MatchType::SlugExact): the normalized file name equals the
//!    normalized slug or name of the entry.
//! 3. [`NameFuzzy`](MatchType::NameFuzzy): the normalized file name is a
//!    substring of the entry's normalized name, or close to it by normalized
//!    Levenshtein distance. Smallest distance wins.
//!
//! Within a tier ties go to the entry with the most recent file, then to the
//! entry that comes first in the snapshot. Matching is a pure function of
//! its inputs: the same identity against the same snapshot always yields the
//! same result.

use modsync_cache::Snapshot;
use modsync_extract::models::{CatalogEntry, HashAlgorithm, LocalModIdentity, MatchResult, MatchType};
use modsync_extract::{normalize_file_name, normalize_name, normalized_distance};
use std::cmp::Ordering;

/// Upper bound (exclusive) on normalized edit distance for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 0.25;
/// Shortest normalized local name allowed to match as a substring. Shorter
/// names ("ui", "lib") are contained in too many unrelated mods.
pub const MIN_SUBSTRING_LEN: usize = 4;

/// Match one identity against a snapshot.
///
/// Prefer [`Matcher`] when matching many identities against the same
/// snapshot; it normalizes every catalog name once.
pub fn match_identity(identity: &LocalModIdentity, snapshot: &Snapshot) -> MatchResult {
    Matcher::new(snapshot).match_identity(identity)
}

/// Matcher bound to one snapshot.
pub struct Matcher<'a> {
    entries: Vec<Candidate<'a>>,
}

struct Candidate<'a> {
    entry: &'a CatalogEntry,
    slug: String,
    name: String,
}

impl<'a> Matcher<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let entries = snapshot
            .iter()
            .map(|entry| Candidate {
                entry,
                slug: normalize_name(&entry.slug),
                name: normalize_name(&entry.name),
            })
            .collect();
        Self { entries }
    }

    pub fn match_identity(&self, identity: &LocalModIdentity) -> MatchResult {
        let found = self
            .by_hash(identity)
            .map(|entry| (entry, MatchType::HashExact))
            .or_else(|| {
                let local = normalize_file_name(&identity.file_name);
                if local.is_empty() {
                    return None;
                }
                self.by_slug(&local)
                    .map(|entry| (entry, MatchType::SlugExact))
                    .or_else(|| self.by_name(&local).map(|entry| (entry, MatchType::NameFuzzy)))
            });
        match found {
            Some((entry, match_type)) => {
                tracing::debug!(file = %identity.file_name, slug = %entry.slug, %match_type, "Matched installed mod");
                MatchResult::from_entry(entry, match_type)
            },
            None => {
                tracing::debug!(file = %identity.file_name, "No catalog match");
                MatchResult::none()
            },
        }
    }

    fn by_hash(&self, identity: &LocalModIdentity) -> Option<&'a CatalogEntry> {
        let matches = |candidate: &Candidate<'a>| {
            (!identity.sha1.is_empty() && candidate.entry.has_hash(HashAlgorithm::Sha1, &identity.sha1))
                || (!identity.md5.is_empty() && candidate.entry.has_hash(HashAlgorithm::Md5, &identity.md5))
        };
        pick(self.entries.iter().filter(|c| matches(*c)).map(|c| (c.entry, 0.0)))
    }

    fn by_slug(&self, local: &str) -> Option<&'a CatalogEntry> {
        pick(self.entries.iter().filter(|c| c.slug == local || c.name == local).map(|c| (c.entry, 0.0)))
    }

    fn by_name(&self, local: &str) -> Option<&'a CatalogEntry> {
        let substring_allowed = local.chars().count() >= MIN_SUBSTRING_LEN;
        pick(self.entries.iter().filter_map(|c| {
            let distance = normalized_distance(local, &c.name).min(normalized_distance(local, &c.slug));
            let contained = substring_allowed && (c.name.contains(local) || c.slug.contains(local));
            (contained || distance < FUZZY_THRESHOLD).then_some((c.entry, distance))
        }))
    }
}

/// Best candidate: smallest distance, then most recent file, then first seen.
fn pick<'a>(candidates: impl Iterator<Item = (&'a CatalogEntry, f64)>) -> Option<&'a CatalogEntry> {
    candidates
        .fold(None, |best: Option<(&'a CatalogEntry, f64)>, (entry, distance)| match best {
            Some(current) if !beats((entry, distance), current) => Some(current),
            _ => Some((entry, distance)),
        })
        .map(|(entry, _)| entry)
}

fn beats(challenger: (&CatalogEntry, f64), current: (&CatalogEntry, f64)) -> bool {
    match challenger.1.total_cmp(&current.1) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => challenger.0.newest_file_date() > current.0.newest_file_date(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modsync_extract::models::{FileHash, FileRecord};
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn file(file_id: u64, file_date: Option<OffsetDateTime>, sha1: Option<&str>) -> FileRecord {
        FileRecord {
            file_id,
            display_name: format!("File {file_id}"),
            file_name: format!("file-{file_id}.jar"),
            file_date,
            download_url: None,
            length: 0,
            hashes: sha1.map(|value| FileHash::new(HashAlgorithm::Sha1, value).unwrap()).into_iter().collect(),
        }
    }

    fn entry(slug: &str, name: &str, files: Vec<FileRecord>) -> CatalogEntry {
        CatalogEntry {
            mod_id: 1,
            slug: slug.to_string(),
            name: name.to_string(),
            url: format!("https://www.curseforge.com/hytale/mods/{slug}"),
            authors: vec![],
            latest_version: Some("2.0.0".to_string()),
            files,
        }
    }

    fn identity(file_name: &str, sha1: &str) -> LocalModIdentity {
        LocalModIdentity::new(file_name, sha1, "", 10)
    }

    fn snapshot(entries: Vec<CatalogEntry>) -> Snapshot {
        Snapshot::build(entries, OffsetDateTime::UNIX_EPOCH)
    }

    const ABC: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";
    const DEF: &str = "589c22335a381f122d129225f5c0ba3056ed5811";

    #[test]
    fn test_hash_match() {
        let snapshot = snapshot(vec![
            entry("cool-sword", "Cool Sword", vec![file(1, None, Some(DEF))]),
            entry("axe-pack", "Axe Pack", vec![file(2, None, Some(ABC))]),
        ]);
        let result = match_identity(&identity("my_sword.jar", ABC), &snapshot);
        assert_eq!(result.match_type, MatchType::HashExact);
        assert_eq!(result.slug.as_deref(), Some("axe-pack"));
        assert_eq!(result.url.as_deref(), Some("https://www.curseforge.com/hytale/mods/axe-pack"));
        assert_eq!(result.latest_version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_hash_is_case_insensitive() {
        let snapshot = snapshot(vec![entry("axe-pack", "Axe Pack", vec![file(2, None, Some(ABC))])]);
        let result = match_identity(&identity("whatever.jar", &ABC.to_uppercase()), &snapshot);
        assert_eq!(result.match_type, MatchType::HashExact);
    }

    #[test]
    fn test_slug_match() {
        let snapshot = snapshot(vec![entry("cool-sword", "Cool Sword", vec![])]);
        let result = match_identity(&identity("CoolSword_v2.jar", DEF), &snapshot);
        assert_eq!(result.match_type, MatchType::SlugExact);
        assert_eq!(result.slug.as_deref(), Some("cool-sword"));
    }

    #[test]
    fn test_hash_outranks_slug() {
        let snapshot = snapshot(vec![
            entry("cool-sword", "Cool Sword", vec![]),
            entry("renamed-sword", "Renamed", vec![file(1, None, Some(ABC))]),
        ]);
        let result = match_identity(&identity("CoolSword.jar", ABC), &snapshot);
        assert_eq!(result.match_type, MatchType::HashExact);
        assert_eq!(result.slug.as_deref(), Some("renamed-sword"));
    }

    #[test]
    fn test_fuzzy_by_distance() {
        let snapshot = snapshot(vec![entry("cool-sword", "Cool Sword", vec![])]);
        let result = match_identity(&identity("coolswrd-1.0.jar", DEF), &snapshot);
        assert_eq!(result.match_type, MatchType::NameFuzzy);
    }

    #[test]
    fn test_fuzzy_by_substring() {
        let snapshot = snapshot(vec![
            entry("better-mobs", "Better Mobs", vec![]),
            entry("cool-sword-mod", "Cool Sword Mod", vec![]),
        ]);
        let result = match_identity(&identity("sword.jar", DEF), &snapshot);
        assert_eq!(result.match_type, MatchType::NameFuzzy);
        assert_eq!(result.slug.as_deref(), Some("cool-sword-mod"));
    }

    #[test]
    fn test_short_names_do_not_match_as_substring() {
        let snapshot = snapshot(vec![entry("axes", "Axes", vec![])]);
        // "axe" is inside "axes" but too short, and 1/4 is not below the threshold.
        let result = match_identity(&identity("axe.jar", DEF), &snapshot);
        assert_eq!(result, MatchResult::none());
    }

    #[test]
    fn test_fuzzy_prefers_smallest_distance() {
        let snapshot = snapshot(vec![
            entry("super-cool-sword-pack", "Super Cool Sword Pack", vec![]),
            entry("cool-swords", "Cool Swords", vec![]),
        ]);
        let result = match_identity(&identity("CoolSword.jar", DEF), &snapshot);
        assert_eq!(result.slug.as_deref(), Some("cool-swords"));
    }

    #[test]
    fn test_tie_breaks_on_most_recent_file() {
        let snapshot = snapshot(vec![
            entry("sword-old", "Cool Sword", vec![file(1, Some(datetime!(2023-01-01 0:00 UTC)), Some(ABC))]),
            entry("sword-new", "Cool Sword", vec![file(2, Some(datetime!(2024-01-01 0:00 UTC)), Some(ABC))]),
            entry("sword-undated", "Cool Sword", vec![file(3, None, Some(ABC))]),
        ]);
        let by_hash = match_identity(&identity("x.jar", ABC), &snapshot);
        assert_eq!(by_hash.slug.as_deref(), Some("sword-new"));
        let by_name = match_identity(&identity("Cool-Sword.jar", DEF), &snapshot);
        assert_eq!(by_name.match_type, MatchType::SlugExact);
        assert_eq!(by_name.slug.as_deref(), Some("sword-new"));
    }

    #[test]
    fn test_full_tie_keeps_snapshot_order() {
        let snapshot = snapshot(vec![
            entry("first", "Cool Sword", vec![]),
            entry("second", "Cool Sword", vec![]),
        ]);
        let matcher = Matcher::new(&snapshot);
        let first = matcher.match_identity(&identity("coolsword.jar", DEF));
        let again = matcher.match_identity(&identity("coolsword.jar", DEF));
        assert_eq!(first.slug.as_deref(), Some("first"));
        assert_eq!(first, again);
    }

    #[test]
    fn test_no_match() {
        let snapshot = snapshot(vec![entry("cool-sword", "Cool Sword", vec![])]);
        assert_eq!(match_identity(&identity("unrelated-thing.jar", DEF), &snapshot), MatchResult::none());
        assert_eq!(match_identity(&identity("x.jar", DEF), &Snapshot::empty()), MatchResult::none());
    }

    #[test]
    fn test_md5_alone_is_a_hash_match() {
        let mut record = file(1, None, None);
        record.hashes.push(FileHash::new(HashAlgorithm::Md5, "900150983cd24fb0d6963f7d28e17f72").unwrap());
        let snapshot = snapshot(vec![
            entry("cool-sword", "Cool Sword", vec![file(2, None, Some(DEF))]),
            entry("axe-pack", "Axe Pack", vec![record]),
        ]);
        let local = LocalModIdentity::new("my_sword.jar", ABC, "900150983CD24FB0D6963F7D28E17F72", 3);
        let result = match_identity(&local, &snapshot);
        assert_eq!(result.match_type, MatchType::HashExact);
        assert_eq!(result.slug.as_deref(), Some("axe-pack"));
    }

    #[test]
    fn test_empty_local_digests_never_hash_match() {
        let mut record = file(1, None, None);
        record.hashes.push(FileHash::new(HashAlgorithm::Md5, "900150983cd24fb0d6963f7d28e17f72").unwrap());
        let snapshot = snapshot(vec![entry("cool-sword", "Cool Sword", vec![record])]);
        let result = match_identity(&LocalModIdentity::new("other.jar", "", "", 0), &snapshot);
        assert_eq!(result.match_type, MatchType::None);
    }
}
