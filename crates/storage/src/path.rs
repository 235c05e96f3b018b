//! Names of files inside the mods directory.
//!
//! The game loads mods from a single flat directory, so every path handled by
//! a backend is a bare file name. Anything with more than one component is
//! rejected rather than normalized.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validate a path relative to the mods directory.
///
/// A leading `./` is tolerated. The result is the bare file name.
///
/// ```
/// use std::path::Path;
/// use modsync_storage::validate_path;
/// assert_eq!(validate_path("./CoolSword-1.2.0.jar").unwrap(), Path::new("CoolSword-1.2.0.jar"));
/// assert!(validate_path("disabled/old-mod.zip").is_err());
/// assert!(validate_path("../server.properties").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut names = path.components().filter(|component| !matches!(component, Component::CurDir));
    match (names.next(), names.next()) {
        (Some(Component::Normal(name)), None) if is_plain(name.as_encoded_bytes()) => Ok(PathBuf::from(name)),
        _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
    }
}

/// Validate a file name handed over by a remote party, returning it as-is.
///
/// ```
/// use modsync_storage::validate_file_name;
/// assert!(validate_file_name("CoolSword-1.3.0.jar").is_ok());
/// assert!(validate_file_name("./CoolSword.jar").is_err());
/// assert!(validate_file_name("..").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if is_plain(name.as_bytes()) => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidPath(PathBuf::from(name))),
    }
}

// Null bytes truncate in syscalls; backslashes are separators on Windows.
fn is_plain(bytes: &[u8]) -> bool {
    !bytes.contains(&0) && !bytes.contains(&b'\\')
}
