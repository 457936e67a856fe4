//! Defensive title cleanup before querying the catalog.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::strategy::text::collapse_whitespace;

static RELEASE_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|【[^】]*】").unwrap());

static RESOLUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\s*\d{3,4}p\s*\)|\b\d{3,4}p\b|\b[48]k\b").unwrap());

static SEASON_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bseason\s*\d{1,3}\b|\bs\d{1,2}(?:e\d{1,4})?\b").unwrap());

/// Remove release-group tags and resolution markers, keeping season and
/// year tokens so the matcher can score them.
pub fn strip_release_tags(title: &str) -> String {
    let cleaned = RELEASE_TAG_RE.replace_all(title, " ");
    let cleaned = RESOLUTION_RE.replace_all(&cleaned, " ");
    collapse_whitespace(&cleaned)
}

/// Title sent to the catalog: release tags, resolution markers and
/// "Season N"/"SN" tokens removed, whitespace collapsed.
pub fn clean_title_for_search(title: &str) -> String {
    let cleaned = strip_release_tags(title);
    let cleaned = SEASON_TOKEN_RE.replace_all(&cleaned, " ");
    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.is_empty() {
        collapse_whitespace(title)
    } else {
        cleaned
    }
}
