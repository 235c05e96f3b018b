//! Name normalization and string distance for matching local files to
//! catalog entries.
//!
//! Local file names and catalog slugs/names are folded into the same shape:
//! lowercase, version and pre-release tokens removed, separators dropped. So
//! `CoolSword_v2.jar`, `cool-sword` and `Cool Sword` all become `coolsword`.

use crate::consts::{PRERELEASE_TOKEN_REGEX, TOKEN_SPLIT_REGEX, VERSION_TOKEN_REGEX};

/// Strip a short alphabetic extension (`.jar`, `.zip`), leaving version
/// suffixes like `-1.2` alone.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && (1..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        },
        _ => file_name,
    }
}

/// Normalize an installed file name for comparison.
pub fn normalize_file_name(file_name: &str) -> String {
    normalize_name(strip_extension(file_name))
}

/// Normalize a catalog slug or display name for comparison.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let normalized: String = name_tokens(&lower).flat_map(|token| token.chars().filter(|c| c.is_alphanumeric())).collect();
    if normalized.is_empty() {
        // Names made only of version-like tokens ("2048") keep their digits.
        return lower.chars().filter(|c| c.is_alphanumeric()).collect();
    }
    normalized
}

/// Human-readable guess at a mod's name from its file name.
pub fn display_name_guess(file_name: &str) -> String {
    let stem = strip_extension(file_name);
    let guess = name_tokens(stem).map(|token| token.trim_matches('.')).filter(|t| !t.is_empty()).collect::<Vec<_>>();
    match guess.is_empty() {
        true => stem.to_string(),
        false => guess.join(" "),
    }
}

fn name_tokens(s: &str) -> impl Iterator<Item = &str> {
    TOKEN_SPLIT_REGEX.split(s).filter(|token| !token.is_empty() && !is_noise(token))
}

fn is_noise(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    VERSION_TOKEN_REGEX.is_match(&lower) || PRERELEASE_TOKEN_REGEX.is_match(&lower)
}

/// Levenshtein edit distance, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Edit distance scaled by the longer string, in `0.0..=1.0`.
pub fn normalized_distance(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(a, b) as f64 / longest as f64
}
