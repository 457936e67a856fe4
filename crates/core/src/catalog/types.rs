//! Types shared by catalog clients and the resolution pipeline.

use serde::{Deserialize, Serialize};

/// Kind of media being looked up.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Tv,
    Movie,
    Anime,
    Unknown,
}

impl MediaType {
    /// Stable lowercase name, used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Tv => "tv",
            MediaType::Movie => "movie",
            MediaType::Anime => "anime",
            MediaType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed to a catalog search call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogQuery {
    /// Free-text title to search for.
    pub text: String,
    /// Media type to search.
    #[serde(default)]
    pub media_type: MediaType,
    /// Optional release/first-air year filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Response language (e.g. "ko-KR").
    #[serde(default = "default_language")]
    pub language: String,
    /// Whether adult titles may be returned.
    #[serde(default)]
    pub include_adult: bool,
    /// Maximum number of entries to return.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_language() -> String {
    "ko-KR".to_string()
}

fn default_max_results() -> usize {
    20
}

impl CatalogQuery {
    /// Create a query with default options.
    pub fn new(text: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            text: text.into(),
            media_type,
            year: None,
            language: default_language(),
            include_adult: false,
            max_results: default_max_results(),
        }
    }

    /// Set the year filter.
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Same options, different search text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// One raw result item returned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    /// External catalog ID.
    pub id: u64,
    /// Media type of this entry.
    #[serde(default)]
    pub media_type: MediaType,
    /// Localized title (TV `name` or movie `title`).
    pub title: String,
    /// Title in the original language.
    #[serde(default)]
    pub original_title: String,
    /// Overview/synopsis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    /// First air date (YYYY-MM-DD), TV only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    /// Release date (YYYY-MM-DD), movies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Poster path (relative to the image base URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    /// Backdrop path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    /// Average vote (0-10).
    #[serde(default)]
    pub vote_average: f64,
    /// Number of votes.
    #[serde(default)]
    pub vote_count: u32,
    /// Catalog popularity score.
    #[serde(default)]
    pub popularity: f64,
    /// Genre tag IDs.
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    /// Number of seasons, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_count: Option<u32>,
    /// Number of episodes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
}

impl CatalogEntry {
    /// First available date (first air date, then release date).
    pub fn date(&self) -> Option<&str> {
        self.first_air_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or_else(|| self.release_date.as_deref().filter(|d| !d.is_empty()))
    }

    /// Year of the first available date.
    pub fn year(&self) -> Option<i32> {
        self.date()
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            id: 1429,
            media_type: MediaType::Tv,
            title: "Attack on Titan".to_string(),
            original_title: "進撃の巨人".to_string(),
            overview: None,
            first_air_date: Some("2013-04-07".to_string()),
            release_date: None,
            poster_path: None,
            backdrop_path: None,
            vote_average: 8.7,
            vote_count: 6000,
            popularity: 120.0,
            genre_ids: vec![16, 10759],
            season_count: Some(4),
            episode_count: Some(89),
        }
    }

    #[test]
    fn test_year_from_first_air_date() {
        assert_eq!(entry().year(), Some(2013));
    }

    #[test]
    fn test_year_falls_back_to_release_date() {
        let mut e = entry();
        e.first_air_date = Some(String::new());
        e.release_date = Some("2021-07-15".to_string());
        assert_eq!(e.year(), Some(2021));

        e.release_date = None;
        assert_eq!(e.year(), None);
    }

    #[test]
    fn test_query_with_text_keeps_options() {
        let query = CatalogQuery::new("Bleach", MediaType::Tv).with_year(Some(2004));
        let variant = query.with_text("bleach");
        assert_eq!(variant.text, "bleach");
        assert_eq!(variant.year, Some(2004));
        assert_eq!(variant.language, "ko-KR");
    }

    #[test]
    fn test_entry_deserialize_minimal() {
        let json = r#"{"id": 7, "title": "Mushishi"}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.media_type, MediaType::Tv);
        assert!(entry.genre_ids.is_empty());
        assert_eq!(entry.season_count, None);
    }
}
