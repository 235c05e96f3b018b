mod catalog;
mod hash;
mod identity;
mod matching;
mod outcome;

pub use self::catalog::{CatalogEntry, FileRecord};
pub use self::hash::{FileHash, HashAlgorithm};
pub use self::identity::LocalModIdentity;
pub use self::matching::{MatchResult, MatchType};
pub use self::outcome::{UpdateOutcome, UpdateStatus};
