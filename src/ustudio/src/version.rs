//! Engine version strings
//!
//! Versions look like `5.6.3p1` or `2017.4.2f2`: a dotted number, a build
//! type letter run, and a build number.

use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z.]").expect("separator pattern compiles"));

static BUILD_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.)+\d+(?P<build>[A-Za-z]+)\d+").expect("build type pattern compiles")
});

/// Minimum number of components reported for any version
const MIN_COMPONENTS: usize = 4;

/// Numeric components of a version string, padded with zeros
///
/// Pieces that are not numbers are skipped, so this never fails.
pub fn components(version: &str) -> Vec<i32> {
    let mut parts: Vec<i32> = SEPARATORS
        .split(version)
        .filter_map(|piece| piece.parse().ok())
        .collect();
    if parts.len() < MIN_COMPONENTS {
        parts.resize(MIN_COMPONENTS, 0);
    }
    parts
}

/// Build type letters following the dotted number (`p`, `f`, `b`, `a`)
pub fn build_type(version: &str) -> String {
    BUILD_TYPE
        .captures(version)
        .and_then(|caps| caps.name("build"))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
