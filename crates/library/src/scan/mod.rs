//! Local mod extraction.
//!
//! Turns files in the mods directory into [`LocalModIdentity`] values: the
//! file name, a display name guessed from it, content digests and the
//! file's size and modification time. Identities are computed fresh on
//! every scan and never cached.
//!
//! [`identify`] handles one file; [`scan`] streams every mod archive found
//! in a [storage backend](modsync_storage).
//!
//! [`LocalModIdentity`]: modsync_extract::models::LocalModIdentity

pub mod error;
mod file;
mod stream;

pub use self::file::identify;
pub use self::stream::{ScanEvent, ScanOptions, scan};
