//! Title normalization and similarity helpers shared by strategies and the matcher.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::catalog::CatalogEntry;

/// Genre IDs treated as animation-related (Animation, Action & Adventure,
/// Kids, Sci-Fi & Fantasy).
pub const ANIMATION_GENRE_IDS: [u32; 4] = [16, 10759, 10762, 10765];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static SEASON_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)시즌\s*(\d{1,3})",
        r"(?i)\bseason\s*(\d{1,3})\b",
        r"(?i)\bs\s?(\d{1,2})(?:e\d{1,4})?\b",
        r"(\d{1,3})\s*기",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BRACKETED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|【[^】]*】").unwrap());

/// Lowercase, trim and collapse internal whitespace.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse whitespace without changing case.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased alphanumeric words of `text`.
pub fn words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word-set Jaccard similarity. Zero when either side has no words.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = words(a);
    let b = words(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Exact-match ladder: 1.0 on equality, 0.9 on containment, 0.8 when the
/// query words are a subset of the candidate words.
pub fn title_ladder(query: &str, candidate: &str) -> Option<f64> {
    let q = normalize(query);
    let c = normalize(candidate);
    if q.is_empty() || c.is_empty() {
        return None;
    }
    if q == c {
        return Some(1.0);
    }
    if c.contains(&q) || q.contains(&c) {
        return Some(0.9);
    }
    let qw = words(&q);
    if !qw.is_empty() && qw.is_subset(&words(&c)) {
        return Some(0.8);
    }
    None
}

/// Ladder score, falling back to word Jaccard.
pub fn title_similarity(query: &str, candidate: &str) -> f64 {
    title_ladder(query, candidate).unwrap_or_else(|| jaccard(query, candidate))
}

/// Best [`title_similarity`] against the entry's title and original title.
pub fn best_title_similarity(query: &str, entry: &CatalogEntry) -> f64 {
    title_similarity(query, &entry.title).max(title_similarity(query, &entry.original_title))
}

/// First 4-digit year between 1900 and 2099.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Season number from "season N", "S N"/"SN", "시즌 N" or "N기".
pub fn extract_season(text: &str) -> Option<u32> {
    SEASON_RES.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Remove year and season tokens, leaving the bare title.
pub fn strip_year_and_season(text: &str) -> String {
    let mut out = YEAR_RE.replace_all(text, " ").into_owned();
    for re in SEASON_RES.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    collapse_whitespace(&out)
}

/// Remove `[...]`, `(...)` and `【...】` groups.
pub fn strip_bracketed(text: &str) -> String {
    collapse_whitespace(&BRACKETED_RE.replace_all(text, " "))
}

/// Replace everything that is not alphanumeric or whitespace with a space.
pub fn strip_punctuation(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    collapse_whitespace(&replaced)
}

/// Remove ASCII digits.
pub fn strip_digits(text: &str) -> String {
    let replaced: String = text.chars().filter(|c| !c.is_ascii_digit()).collect();
    collapse_whitespace(&replaced)
}

/// Whether any of the entry's genres is on the animation allow-list.
pub fn has_animation_genre(entry: &CatalogEntry) -> bool {
    entry
        .genre_ids
        .iter()
        .any(|id| ANIMATION_GENRE_IDS.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_idempotent() {
        for title in [
            "  Attack   on Titan ",
            "進撃の巨人",
            "[SubsPlease] Frieren - 01 (1080p)",
            "\tMIXED case\nTitle",
            "",
        ] {
            let once = normalize(title);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", title);
        }
        assert_eq!(normalize("  Attack   on Titan "), "attack on titan");
    }

    #[test]
    fn test_title_ladder() {
        assert_eq!(title_ladder("attack on titan", "Attack On  Titan"), Some(1.0));
        assert_eq!(title_ladder("Titan", "Attack on Titan"), Some(0.9));
        assert_eq!(title_ladder("titan attack", "Attack on Titan"), Some(0.8));
        assert_eq!(title_ladder("one piece", "Attack on Titan"), None);
        assert_eq!(title_ladder("", "Attack on Titan"), None);
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard("attack on titan", "attack on titan"), 1.0);
        assert_eq!(jaccard("attack on titan 2013", "attack on titan"), 0.75);
        assert_eq!(jaccard("", "attack"), 0.0);
        assert_eq!(jaccard("bleach", "naruto"), 0.0);
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("Attack on Titan 2013"), Some(2013));
        assert_eq!(extract_year("Akira (1988)"), Some(1988));
        assert_eq!(extract_year("Episode 12345"), None);
        assert_eq!(extract_year("Show 2150"), None);
        assert_eq!(extract_year("No year"), None);
    }

    #[test]
    fn test_extract_season() {
        assert_eq!(extract_season("Attack on Titan Season 3"), Some(3));
        assert_eq!(extract_season("Attack on Titan S2"), Some(2));
        assert_eq!(extract_season("Attack on Titan s 4"), Some(4));
        assert_eq!(extract_season("Frieren S01E05"), Some(1));
        assert_eq!(extract_season("진격의 거인 시즌 2"), Some(2));
        assert_eq!(extract_season("진격의 거인 3기"), Some(3));
        assert_eq!(extract_season("Attack on Titans"), None);
        assert_eq!(extract_season("Bleach"), None);
    }

    #[test]
    fn test_strip_year_and_season() {
        assert_eq!(strip_year_and_season("Attack on Titan 2013"), "Attack on Titan");
        assert_eq!(strip_year_and_season("Attack on Titan Season 2"), "Attack on Titan");
        assert_eq!(strip_year_and_season("진격의 거인 3기"), "진격의 거인");
    }

    #[test]
    fn test_variant_helpers() {
        assert_eq!(strip_bracketed("[Group] Frieren (2023)"), "Frieren");
        assert_eq!(strip_punctuation("Re:Zero - Starting Life"), "Re Zero Starting Life");
        assert_eq!(strip_digits("Mob Psycho 100"), "Mob Psycho");
    }
}
