use std::fmt::{Display, Formatter, Result as FmtResult};
use time::OffsetDateTime;

/// Where the refresh state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "state", rename_all = "snake_case"))]
pub enum RefreshState {
    #[default]
    Idle,
    /// Fetching the given (zero-based) page.
    Fetching { page: usize },
    /// Building and publishing the new snapshot.
    Committing,
}
impl RefreshState {
    pub fn is_refreshing(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}
impl Display for RefreshState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching { page } => write!(f, "fetching page {page}"),
            Self::Committing => write!(f, "committing"),
        }
    }
}

/// The most recent failed refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RefreshFailure {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub at: OffsetDateTime,
    pub reason: String,
}

/// Point-in-time report of the cache and its refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RefreshStatus {
    pub state: RefreshState,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    pub last_refreshed_at: Option<OffsetDateTime>,
    pub last_failure: Option<RefreshFailure>,
    pub entries: usize,
}
