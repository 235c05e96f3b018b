//! Best-effort version extraction and ordering.

use crate::consts::VERSION_REGEX;
use crate::error::{ErrorKind, Result};
use crate::models::FileRecord;
use crate::strip_extension;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Pull a dotted version number out of free text.
///
/// ```
/// use modsync_extract::extract_version;
/// assert_eq!(extract_version("Cool Sword v1.2.0").as_deref(), Some("1.2.0"));
/// assert_eq!(extract_version("CoolSword-2.0.1-beta.3").as_deref(), Some("2.0.1-beta.3"));
/// assert_eq!(extract_version("CoolSword_v2"), None);
/// ```
pub fn extract_version(text: &str) -> Option<String> {
    VERSION_REGEX.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

/// Version of the newest file: its display name first, then its file name.
/// No match means no version, never "no update".
pub fn latest_version(files: &[FileRecord]) -> Option<String> {
    let newest = files.iter().fold(None, |best: Option<&FileRecord>, file| match best {
        Some(current) if file.file_date <= current.file_date => Some(current),
        _ => Some(file),
    })?;
    extract_version(&newest.display_name).or_else(|| extract_version(strip_extension(&newest.file_name)))
}

/// Order two extracted version strings. Unparseable input compares equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.parse::<ModVersion>(), b.parse::<ModVersion>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// A parsed dotted version with an optional pre-release label.
///
/// Missing trailing components count as zero (`1.2 == 1.2.0`), a pre-release
/// sorts before its release, and build metadata after `+` is ignored.
#[derive(Debug, Clone)]
pub struct ModVersion {
    numbers: Vec<u64>,
    pre: Option<String>,
}
impl FromStr for ModVersion {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches(['v', 'V']);
        let s = s.split_once('+').map_or(s, |(core, _build)| core);
        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_ascii_lowercase())),
            None => (s, None),
        };
        let numbers = core
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| ErrorKind::ParseError {
                field: "version",
                value: s.to_string(),
            })?;
        Ok(Self { numbers, pre })
    }
}
impl Ord for ModVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for i in 0..len {
            let a = self.numbers.get(i).copied().unwrap_or(0);
            let b = other.numbers.get(i).copied().unwrap_or(0);
            if a != b {
                return a.cmp(&b);
            }
        }
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => compare_pre_release(a, b),
        }
    }
}

// Dot-separated identifiers, numeric ones compared as numbers.
fn compare_pre_release(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}
impl PartialOrd for ModVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for ModVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for ModVersion {}
impl Display for ModVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let numbers = self.numbers.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        match &self.pre {
            Some(pre) => write!(f, "{numbers}-{pre}"),
            None => write!(f, "{numbers}"),
        }
    }
}
