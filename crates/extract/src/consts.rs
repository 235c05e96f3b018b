use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Version embedded in a display name or file name, e.g. "Cool Sword v1.2.0-beta".
regex!(VERSION_REGEX, r"(?i)v?(\d+(?:\.\d+)+(?:[-+][\w.]+)?)");
// Anything that separates words in a mod name. Dots stay so that "1.2.0" is one token.
regex!(TOKEN_SPLIT_REGEX, r"[^\p{L}\p{N}.]+");
regex!(VERSION_TOKEN_REGEX, r"^v?\d+(?:\.\d+)*$");
regex!(PRERELEASE_TOKEN_REGEX, r"^(?:alpha|beta|rc|pre|snapshot|release|final)\.?\d*$");
regex!(HEX_REGEX, r"^[0-9a-fA-F]+$");
