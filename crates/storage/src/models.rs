use std::path::PathBuf;
use time::OffsetDateTime;

/// A file in the mods directory, as listed or stat'ed by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Bare file name inside the mods directory.
    pub path: PathBuf,
    pub size: u64,
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        Self {
            path: path.into(),
            size,
            modified: modified.into(),
        }
    }

    /// `None` when the name is not valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}
