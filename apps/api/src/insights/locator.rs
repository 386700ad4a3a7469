//! Content locator normalization: maps a pasted YouTube URL to its video id.

use std::sync::LazyLock;

use regex::Regex;

/// Accepted URL shapes, tried in order. The id runs up to the next `?` or `&`.
static LOCATOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"youtube\.com/shorts/([^?&]+)").unwrap(),
        Regex::new(r"youtube\.com/watch\?v=([^?&]+)").unwrap(),
        Regex::new(r"youtu\.be/([^?&]+)").unwrap(),
    ]
});

/// Returns the content id for a locator.
///
/// Unrecognised input is passed through (trimmed) so a bare video id works too.
pub fn extract_content_id(locator: &str) -> String {
    let locator = locator.trim();
    LOCATOR_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(locator))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| locator.to_string())
}
