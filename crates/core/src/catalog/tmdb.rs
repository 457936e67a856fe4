//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{CatalogEntry, CatalogQuery, MediaType};
use super::{CatalogError, MetadataCatalog};

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// HTTP client timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Fetch TV details for each search hit to fill in season/episode counts.
    /// Costs one extra request per TV result.
    #[serde(default)]
    pub fetch_details: bool,
}

fn default_timeout() -> u64 {
    30
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    fetch_details: bool,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, CatalogError> {
        if config.api_key.is_empty() {
            return Err(CatalogError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string());

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            fetch_details: config.fetch_details,
        })
    }

    /// Search for TV series.
    pub async fn search_tv(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = format!("{}/search/tv", self.base_url);

        debug!(
            "TMDB TV search: query='{}', year={:?}, language={}",
            query.text, query.year, query.language
        );

        let mut params = self.common_params(query);
        if let Some(year) = query.year {
            params.push(("first_air_date_year", year.to_string()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let response = check_status(response).await?;

        let search_result: TmdbSearchResponse<TmdbTvResult> =
            response.json().await.map_err(|e| {
                CatalogError::ParseError(format!("Failed to parse TV search response: {}", e))
            })?;

        Ok(search_result
            .results
            .into_iter()
            .take(query.max_results)
            .map(CatalogEntry::from)
            .collect())
    }

    /// Search for movies.
    pub async fn search_movies(
        &self,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = format!("{}/search/movie", self.base_url);

        debug!(
            "TMDB movie search: query='{}', year={:?}, language={}",
            query.text, query.year, query.language
        );

        let mut params = self.common_params(query);
        if let Some(year) = query.year {
            params.push(("year", year.to_string()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let response = check_status(response).await?;

        let search_result: TmdbSearchResponse<TmdbMovieResult> =
            response.json().await.map_err(|e| {
                CatalogError::ParseError(format!("Failed to parse movie search response: {}", e))
            })?;

        Ok(search_result
            .results
            .into_iter()
            .take(query.max_results)
            .map(CatalogEntry::from)
            .collect())
    }

    /// Get a TV series by TMDB ID.
    pub async fn get_tv(&self, tmdb_id: u64, language: &str) -> Result<CatalogEntry, CatalogError> {
        let url = format!("{}/tv/{}", self.base_url, tmdb_id);

        debug!("TMDB get TV: id={}", tmdb_id);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", language)])
            .send()
            .await?;

        if response.status() == 404 {
            return Err(CatalogError::NotFound(format!("TV series ID {}", tmdb_id)));
        }
        let response = check_status(response).await?;

        let details: TmdbTvDetails = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse TV response: {}", e))
        })?;

        Ok(details.into())
    }

    fn common_params(&self, query: &CatalogQuery) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("query", query.text.clone()),
            ("language", query.language.clone()),
            ("include_adult", query.include_adult.to_string()),
        ]
    }

    /// Fill season/episode counts from the details endpoint.
    /// A failed lookup keeps the search hit as-is.
    async fn enrich(&self, entries: Vec<CatalogEntry>, language: &str) -> Vec<CatalogEntry> {
        let mut enriched = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.get_tv(entry.id, language).await {
                Ok(details) => enriched.push(CatalogEntry {
                    season_count: details.season_count,
                    episode_count: details.episode_count,
                    ..entry
                }),
                Err(e) => {
                    warn!("TMDB details lookup failed for {}: {}", entry.id, e);
                    enriched.push(entry);
                }
            }
        }
        enriched
    }
}

#[async_trait]
impl MetadataCatalog for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        match query.media_type {
            MediaType::Movie => self.search_movies(query).await,
            MediaType::Tv | MediaType::Anime | MediaType::Unknown => {
                let entries = self.search_tv(query).await?;
                if self.fetch_details {
                    Ok(self.enrich(entries, &query.language).await)
                } else {
                    Ok(entries)
                }
            }
        }
    }
}

/// Map non-success HTTP statuses to catalog errors.
async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status == 401 {
        return Err(CatalogError::NotConfigured(
            "Invalid TMDB API key".to_string(),
        ));
    }
    if status == 429 {
        return Err(CatalogError::RateLimitExceeded);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(response)
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvResult {
    id: u64,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u64,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetails {
    id: u64,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<TmdbTvResult> for CatalogEntry {
    fn from(r: TmdbTvResult) -> Self {
        Self {
            id: r.id,
            media_type: MediaType::Tv,
            original_title: r.original_name.unwrap_or_else(|| r.name.clone()),
            title: r.name,
            overview: r.overview,
            first_air_date: r.first_air_date,
            release_date: None,
            poster_path: r.poster_path,
            backdrop_path: r.backdrop_path,
            vote_average: r.vote_average.unwrap_or(0.0),
            vote_count: r.vote_count.unwrap_or(0),
            popularity: r.popularity.unwrap_or(0.0),
            genre_ids: r.genre_ids,
            season_count: None, // Not available in search results
            episode_count: None,
        }
    }
}

impl From<TmdbMovieResult> for CatalogEntry {
    fn from(r: TmdbMovieResult) -> Self {
        Self {
            id: r.id,
            media_type: MediaType::Movie,
            original_title: r.original_title.unwrap_or_else(|| r.title.clone()),
            title: r.title,
            overview: r.overview,
            first_air_date: None,
            release_date: r.release_date,
            poster_path: r.poster_path,
            backdrop_path: r.backdrop_path,
            vote_average: r.vote_average.unwrap_or(0.0),
            vote_count: r.vote_count.unwrap_or(0),
            popularity: r.popularity.unwrap_or(0.0),
            genre_ids: r.genre_ids,
            season_count: None,
            episode_count: None,
        }
    }
}

impl From<TmdbTvDetails> for CatalogEntry {
    fn from(d: TmdbTvDetails) -> Self {
        Self {
            id: d.id,
            media_type: MediaType::Tv,
            original_title: d.original_name.unwrap_or_else(|| d.name.clone()),
            title: d.name,
            overview: d.overview,
            first_air_date: d.first_air_date,
            release_date: None,
            poster_path: d.poster_path,
            backdrop_path: d.backdrop_path,
            vote_average: d.vote_average.unwrap_or(0.0),
            vote_count: d.vote_count.unwrap_or(0),
            popularity: d.popularity.unwrap_or(0.0),
            genre_ids: d.genres.into_iter().map(|g| g.id).collect(),
            season_count: d.number_of_seasons,
            episode_count: d.number_of_episodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let result = TmdbClient::new(TmdbConfig {
            api_key: String::new(),
            base_url: None,
            timeout_secs: 30,
            fetch_details: false,
        });
        assert!(matches!(result, Err(CatalogError::NotConfigured(_))));
    }

    #[test]
    fn test_tv_result_conversion() {
        let json = r#"{
            "id": 1429,
            "name": "Attack on Titan",
            "original_name": "進撃の巨人",
            "first_air_date": "2013-04-07",
            "overview": "Humanity fights for survival.",
            "poster_path": "/poster.jpg",
            "vote_average": 8.7,
            "vote_count": 6100,
            "popularity": 150.2,
            "genre_ids": [16, 10765, 10759]
        }"#;
        let result: TmdbTvResult = serde_json::from_str(json).unwrap();

        let entry: CatalogEntry = result.into();
        assert_eq!(entry.id, 1429);
        assert_eq!(entry.title, "Attack on Titan");
        assert_eq!(entry.original_title, "進撃の巨人");
        assert_eq!(entry.year(), Some(2013));
        assert_eq!(entry.genre_ids, vec![16, 10765, 10759]);
        assert!(entry.season_count.is_none()); // Not in search results
    }

    #[test]
    fn test_movie_result_without_original_title() {
        let json = r#"{"id": 372058, "title": "Your Name.", "release_date": "2016-08-26"}"#;
        let result: TmdbMovieResult = serde_json::from_str(json).unwrap();

        let entry: CatalogEntry = result.into();
        assert_eq!(entry.media_type, MediaType::Movie);
        assert_eq!(entry.original_title, "Your Name.");
        assert_eq!(entry.year(), Some(2016));
        assert_eq!(entry.vote_count, 0);
    }

    #[test]
    fn test_tv_details_conversion() {
        let json = r#"{
            "id": 30984,
            "name": "Bleach",
            "original_name": "BLEACH",
            "first_air_date": "2004-10-05",
            "number_of_seasons": 2,
            "number_of_episodes": 392,
            "genres": [{"id": 16, "name": "Animation"}]
        }"#;
        let details: TmdbTvDetails = serde_json::from_str(json).unwrap();

        let entry: CatalogEntry = details.into();
        assert_eq!(entry.season_count, Some(2));
        assert_eq!(entry.episode_count, Some(392));
        assert_eq!(entry.genre_ids, vec![16]);
    }
}
