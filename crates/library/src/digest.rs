//! Content digests of mod archives.
//!
//! The catalog publishes SHA1 and MD5 for most files, so both are computed in
//! a single pass: once over installed files while scanning, and once over the
//! bytes of a download as they stream to disk.

use modsync_extract::models::{FileRecord, HashAlgorithm};
use sha1::{Digest, Sha1};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Read;

const BUFFER_SIZE: usize = 8192;

/// Incremental SHA1 + MD5 hasher.
pub(crate) struct ContentHasher {
    sha1: Sha1,
    md5: md5::Context,
    length: u64,
}
impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
impl ContentHasher {
    pub fn new() -> Self {
        Self {
            sha1: Sha1::new(),
            md5: md5::Context::new(),
            length: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.sha1.update(chunk);
        self.md5.consume(chunk);
        self.length += chunk.len() as u64;
    }

    pub fn finish(self) -> ContentDigest {
        ContentDigest {
            sha1: format!("{:x}", self.sha1.finalize()),
            md5: format!("{:x}", self.md5.compute()),
            length: self.length,
        }
    }
}

/// Lowercase hex digests and byte count of some content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentDigest {
    pub sha1: String,
    pub md5: String,
    pub length: u64,
}
impl ContentDigest {
    /// Hash everything a blocking reader yields. Call from a blocking task.
    pub fn from_reader(mut reader: impl Read) -> std::io::Result<Self> {
        let mut hasher = ContentHasher::new();
        let mut buffer = [0u8; BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.finish())
    }

    /// Compare against what the catalog published for a file.
    ///
    /// SHA1 is preferred over MD5 when both are published. A file with no
    /// published digest only has its length checked.
    pub fn verify(&self, record: &FileRecord) -> Result<(), Mismatch> {
        if record.length > 0 && record.length != self.length {
            return Err(Mismatch::Length {
                expected: record.length,
                actual: self.length,
            });
        }
        let (algorithm, expected, actual) = match (record.hash(HashAlgorithm::Sha1), record.hash(HashAlgorithm::Md5)) {
            (Some(expected), _) => (HashAlgorithm::Sha1, expected, &self.sha1),
            (None, Some(expected)) => (HashAlgorithm::Md5, expected, &self.md5),
            (None, None) => {
                tracing::warn!(file_id = record.file_id, "No published hash, only the length was checked");
                return Ok(());
            },
        };
        if !expected.eq_ignore_ascii_case(actual) {
            return Err(Mismatch::Hash {
                algorithm,
                expected: expected.to_string(),
                actual: actual.clone(),
            });
        }
        Ok(())
    }
}

/// Why downloaded content was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mismatch {
    Length { expected: u64, actual: u64 },
    Hash { algorithm: HashAlgorithm, expected: String, actual: String },
}
impl Display for Mismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Length { expected, actual } => write!(f, "expected {expected} bytes, got {actual}"),
            Self::Hash {
                algorithm,
                expected,
                actual,
            } => write!(f, "{algorithm} mismatch, expected {expected}, got {actual}"),
        }
    }
}
