//! Keeping a Hytale mods directory in sync with CurseForge.
//!
//! - [`refresh`] mirrors the remote catalog into a
//!   [`CatalogCache`](modsync_cache::CatalogCache) on a schedule.
//! - [`scan`] identifies the files installed locally.
//! - [`matcher`] pairs installed files with catalog entries.
//! - [`update`] replaces an installed file with its newest version, safely.
//! - [`service`] puts the above behind the operations a host exposes.

mod digest;
pub mod error;
pub mod matcher;
pub mod refresh;
pub mod scan;
pub mod service;
pub mod update;

/// Files hashed at the same time during a scan.
pub const MAX_HASH_CONCURRENCY: usize = 16;

pub use crate::matcher::{FUZZY_THRESHOLD, MIN_SUBSTRING_LEN, Matcher, match_identity};
pub use crate::refresh::{RefreshOptions, RefreshOutcome, Refresher};
pub use crate::scan::{ScanEvent, ScanOptions, identify, scan};
pub use crate::service::{InstalledMatch, ModService, ServiceOptions};
pub use crate::update::Updater;
