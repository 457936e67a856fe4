//! Testing utilities: a mock catalog and fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use metaresolve_core::testing::{fixtures, MockCatalog};
//!
//! let catalog = Arc::new(MockCatalog::new());
//! catalog.set_results(vec![fixtures::attack_on_titan()]).await;
//!
//! let service = ResolutionService::new(config, Some(catalog.clone()));
//! ```

mod mock_catalog;

pub use mock_catalog::MockCatalog;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{CatalogEntry, MediaType};

    /// Create a TV catalog entry with reasonable defaults.
    pub fn tv_entry(id: u64, title: &str, original_title: &str, first_air_date: &str) -> CatalogEntry {
        CatalogEntry {
            id,
            media_type: MediaType::Tv,
            title: title.to_string(),
            original_title: original_title.to_string(),
            overview: Some(format!("A series called {}.", title)),
            first_air_date: Some(first_air_date.to_string()),
            release_date: None,
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: None,
            vote_average: 7.5,
            vote_count: 100,
            popularity: 10.0,
            genre_ids: Vec::new(),
            season_count: None,
            episode_count: None,
        }
    }

    /// Create a movie catalog entry.
    pub fn movie_entry(id: u64, title: &str, release_date: &str) -> CatalogEntry {
        CatalogEntry {
            media_type: MediaType::Movie,
            first_air_date: None,
            release_date: Some(release_date.to_string()),
            ..tv_entry(id, title, title, "")
        }
    }

    /// "Attack on Titan" as the catalog returns it from a plain search.
    pub fn attack_on_titan() -> CatalogEntry {
        tv_entry(1429, "Attack on Titan", "Shingeki no Kyojin", "2013-04-07")
    }
}
