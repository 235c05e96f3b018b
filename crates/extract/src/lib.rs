mod consts;
pub mod error;
pub mod models;
mod normalize;
mod version;

pub use crate::normalize::{
    display_name_guess, levenshtein, normalize_file_name, normalize_name, normalized_distance, strip_extension,
};
pub use crate::version::{ModVersion, compare_versions, extract_version, latest_version};
