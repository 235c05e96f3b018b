use super::{FileHash, HashAlgorithm};
use time::OffsetDateTime;

/// A mod as listed by the remote catalog.
///
/// Entries are owned by the catalog cache and replaced wholesale on every
/// refresh cycle. The `slug` is the unique key within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogEntry {
    /// Upstream numeric identity, needed to request download links.
    pub mod_id: u64,
    pub slug: String,
    pub name: String,
    /// Human-facing project page.
    pub url: String,
    pub authors: Vec<String>,
    /// Best-effort version of the newest file, see [`latest_version`](crate::latest_version).
    pub latest_version: Option<String>,
    pub files: Vec<FileRecord>,
}
impl CatalogEntry {
    /// The file with the most recent publication date.
    ///
    /// Undated files sort oldest. When dates tie, the earlier file in the
    /// list wins.
    pub fn newest_file(&self) -> Option<&FileRecord> {
        self.files.iter().fold(None, |best: Option<&FileRecord>, file| match best {
            Some(current) if file.file_date <= current.file_date => Some(current),
            _ => Some(file),
        })
    }

    pub fn newest_file_date(&self) -> Option<OffsetDateTime> {
        self.newest_file().and_then(|file| file.file_date)
    }

    /// Recompute `latest_version` from the files.
    pub fn with_derived_version(mut self) -> Self {
        self.latest_version = crate::latest_version(&self.files);
        self
    }

    /// Whether any file of this entry publishes the given digest.
    pub fn has_hash(&self, algorithm: HashAlgorithm, value: &str) -> bool {
        self.files.iter().any(|file| file.has_hash(algorithm, value))
    }
}

/// One downloadable file of a catalog entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileRecord {
    pub file_id: u64,
    pub display_name: String,
    pub file_name: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub file_date: Option<OffsetDateTime>,
    /// Direct download location, when the catalog includes one in listings.
    pub download_url: Option<String>,
    /// Size in bytes, zero when unknown.
    pub length: u64,
    pub hashes: Vec<FileHash>,
}
impl FileRecord {
    pub fn hash(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.hashes.iter().find(|hash| hash.algorithm == algorithm).map(|hash| hash.value.as_str())
    }

    pub fn has_hash(&self, algorithm: HashAlgorithm, value: &str) -> bool {
        self.hashes.iter().any(|hash| hash.matches(algorithm, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn file(file_id: u64, file_date: Option<OffsetDateTime>, display_name: &str) -> FileRecord {
        FileRecord {
            file_id,
            display_name: display_name.to_string(),
            file_name: format!("{display_name}.jar"),
            file_date,
            download_url: None,
            length: 0,
            hashes: vec![],
        }
    }

    fn entry(files: Vec<FileRecord>) -> CatalogEntry {
        CatalogEntry {
            mod_id: 1,
            slug: "cool-sword".to_string(),
            name: "Cool Sword".to_string(),
            url: "https://www.curseforge.com/hytale/mods/cool-sword".to_string(),
            authors: vec!["smith".to_string()],
            latest_version: None,
            files,
        }
    }

    #[test]
    fn test_newest_file_by_date() {
        let entry = entry(vec![
            file(1, Some(datetime!(2024-01-01 0:00 UTC)), "CoolSword 1.0.0"),
            file(2, Some(datetime!(2024-03-01 0:00 UTC)), "CoolSword 1.2.0"),
            file(3, None, "CoolSword 0.9.0"),
        ]);
        assert_eq!(entry.newest_file().unwrap().file_id, 2);
        assert_eq!(entry.newest_file_date(), Some(datetime!(2024-03-01 0:00 UTC)));
    }

    #[test]
    fn test_newest_file_tie_keeps_first() {
        let date = Some(datetime!(2024-01-01 0:00 UTC));
        let entry = entry(vec![file(7, date, "a 1.0.0"), file(8, date, "b 1.0.0")]);
        assert_eq!(entry.newest_file().unwrap().file_id, 7);
    }

    #[test]
    fn test_newest_file_empty() {
        assert!(entry(vec![]).newest_file().is_none());
    }

    #[test]
    fn test_with_derived_version() {
        let entry = entry(vec![
            file(1, Some(datetime!(2024-01-01 0:00 UTC)), "CoolSword 1.0.0"),
            file(2, Some(datetime!(2024-03-01 0:00 UTC)), "CoolSword v1.2.0"),
        ])
        .with_derived_version();
        assert_eq!(entry.latest_version.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn test_has_hash() {
        let mut record = file(1, None, "CoolSword 1.0.0");
        record.hashes.push(FileHash {
            algorithm: HashAlgorithm::Sha1,
            value: "abc123".to_string(),
        });
        let entry = entry(vec![record]);
        assert!(entry.has_hash(HashAlgorithm::Sha1, "ABC123"));
        assert!(!entry.has_hash(HashAlgorithm::Md5, "abc123"));
        assert_eq!(entry.files[0].hash(HashAlgorithm::Sha1), Some("abc123"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip_keeps_dates() {
        let entry = entry(vec![file(1, Some(datetime!(2024-01-01 12:30 UTC)), "CoolSword 1.0.0")]);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("2024-01-01T12:30:00Z"));
        let back: CatalogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
