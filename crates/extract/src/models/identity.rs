use std::path::PathBuf;
use time::OffsetDateTime;

/// Identity of a mod file installed locally, produced fresh on every scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalModIdentity {
    /// Path relative to the mods directory.
    pub path: PathBuf,
    pub file_name: String,
    pub display_name_guess: String,
    /// Lowercase hex SHA1 of the file contents.
    pub sha1: String,
    /// Lowercase hex MD5 of the file contents.
    pub md5: String,
    pub size: u64,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub modified: Option<OffsetDateTime>,
}
impl LocalModIdentity {
    pub fn new(path: impl Into<PathBuf>, sha1: impl Into<String>, md5: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let file_name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        Self {
            display_name_guess: crate::display_name_guess(&file_name),
            file_name,
            path,
            sha1: sha1.into().to_ascii_lowercase(),
            md5: md5.into().to_ascii_lowercase(),
            size,
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: OffsetDateTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Version embedded in the installed file name, if any.
    pub fn version(&self) -> Option<String> {
        crate::extract_version(crate::strip_extension(&self.file_name))
    }
}
