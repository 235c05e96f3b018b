use crate::consts::HEX_REGEX;
use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Hash algorithms published by the catalog for each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HashAlgorithm {
    Sha1,
    Md5,
}
impl HashAlgorithm {
    /// Map the catalog's numeric algorithm code. Unknown codes yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Sha1),
            2 => Some(Self::Md5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
        }
    }

    /// Length of the hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Md5 => 32,
        }
    }
}
impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A published digest of a catalog file, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileHash {
    pub algorithm: HashAlgorithm,
    pub value: String,
}
impl FileHash {
    /// Validate and normalise a hex digest.
    pub fn new(algorithm: HashAlgorithm, value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if value.len() != algorithm.hex_len() || !HEX_REGEX.is_match(value) {
            exn::bail!(ErrorKind::InvalidHash {
                algorithm: algorithm.as_str(),
                value: value.to_string(),
            });
        }
        Ok(Self {
            algorithm,
            value: value.to_ascii_lowercase(),
        })
    }

    /// Case-insensitive comparison against a locally computed digest.
    pub fn matches(&self, algorithm: HashAlgorithm, value: &str) -> bool {
        self.algorithm == algorithm && self.value.eq_ignore_ascii_case(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, Some(HashAlgorithm::Sha1))]
    #[case(2, Some(HashAlgorithm::Md5))]
    #[case(0, None)]
    #[case(3, None)]
    fn test_from_code(#[case] code: u32, #[case] expected: Option<HashAlgorithm>) {
        assert_eq!(HashAlgorithm::from_code(code), expected);
    }

    #[test]
    fn test_new_lowercases() {
        let hash = FileHash::new(HashAlgorithm::Md5, "0CC175B9C0F1B6A831C399E269772661").unwrap();
        assert_eq!(hash.value, "0cc175b9c0f1b6a831c399e269772661");
    }

    #[rstest]
    #[case(HashAlgorithm::Sha1, "abc123")]
    #[case(HashAlgorithm::Md5, "zz175b9c0f1b6a831c399e269772661z")]
    #[case(HashAlgorithm::Sha1, "")]
    fn test_new_rejects_invalid(#[case] algorithm: HashAlgorithm, #[case] value: &str) {
        let err = FileHash::new(algorithm, value).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidHash { .. }));
    }

    #[test]
    fn test_matches_ignores_case_but_not_algorithm() {
        let hash = FileHash::new(HashAlgorithm::Sha1, "86f7e437faa5a7fce15d1ddcb9eaeaea377667b8").unwrap();
        assert!(hash.matches(HashAlgorithm::Sha1, "86F7E437FAA5A7FCE15D1DDCB9EAEAEA377667B8"));
        assert!(!hash.matches(HashAlgorithm::Md5, "86f7e437faa5a7fce15d1ddcb9eaeaea377667b8"));
    }
}
