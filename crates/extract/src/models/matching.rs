use super::CatalogEntry;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Confidence tier of a match, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchType {
    None,
    NameFuzzy,
    SlugExact,
    HashExact,
}
impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::NameFuzzy => "NameFuzzy",
            Self::SlugExact => "SlugExact",
            Self::HashExact => "HashExact",
        }
    }
}
impl Display for MatchType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of matching one local file against the catalog. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchResult {
    pub url: Option<String>,
    pub slug: Option<String>,
    pub match_type: MatchType,
    pub latest_version: Option<String>,
}
impl MatchResult {
    pub fn none() -> Self {
        Self {
            url: None,
            slug: None,
            match_type: MatchType::None,
            latest_version: None,
        }
    }

    pub fn from_entry(entry: &CatalogEntry, match_type: MatchType) -> Self {
        Self {
            url: Some(entry.url.clone()),
            slug: Some(entry.slug.clone()),
            match_type,
            latest_version: entry.latest_version.clone(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.match_type != MatchType::None
    }
}
