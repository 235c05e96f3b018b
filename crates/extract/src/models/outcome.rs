use std::fmt::{Display, Formatter, Result as FmtResult};

/// Why an update request ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum UpdateStatus {
    /// The new file is installed.
    Updated,
    /// The installed file is already the newest.
    UpToDate,
    /// The catalog does not allow third-party downloads of this mod.
    Forbidden,
    /// Another update for the same file is running.
    InProgress,
    /// The file could not be matched to a catalog entry.
    NotMatched,
    /// Download, verification or filesystem failure. The original file is intact.
    Failed,
}
impl Display for UpdateStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            Self::Updated => "updated",
            Self::UpToDate => "up to date",
            Self::Forbidden => "forbidden",
            Self::InProgress => "in progress",
            Self::NotMatched => "not matched",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of an update request, handed back to the caller as-is.
///
/// File names are only ever populated on success; the constructors are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UpdateOutcome {
    status: UpdateStatus,
    success: bool,
    message: String,
    new_file_name: Option<String>,
    old_file_name: Option<String>,
}
impl UpdateOutcome {
    pub fn updated(new_file_name: impl Into<String>, old_file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::Updated,
            success: true,
            message: message.into(),
            new_file_name: Some(new_file_name.into()),
            old_file_name: Some(old_file_name.into()),
        }
    }

    /// Any non-success outcome. Passing [`UpdateStatus::Updated`] here is a
    /// programming error and is downgraded to [`UpdateStatus::Failed`].
    pub fn unsuccessful(status: UpdateStatus, message: impl Into<String>) -> Self {
        let status = match status {
            UpdateStatus::Updated => UpdateStatus::Failed,
            other => other,
        };
        Self {
            status,
            success: false,
            message: message.into(),
            new_file_name: None,
            old_file_name: None,
        }
    }

    pub fn up_to_date(message: impl Into<String>) -> Self {
        Self::unsuccessful(UpdateStatus::UpToDate, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::unsuccessful(UpdateStatus::Failed, message)
    }

    pub fn status(&self) -> UpdateStatus {
        self.status
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn new_file_name(&self) -> Option<&str> {
        self.new_file_name.as_deref()
    }

    pub fn old_file_name(&self) -> Option<&str> {
        self.old_file_name.as_deref()
    }
}
impl Display for UpdateOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.status, self.message)
    }
}
