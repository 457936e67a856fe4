use async_trait::async_trait;
use tracing::debug;

use super::text::extract_season;
use super::SearchStrategy;
use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};

/// Prefers entries that have at least as many seasons as the query asks for.
pub struct SeasonBased;

const BASE_SCORE: f64 = 0.4;
const SEASON_BONUS: f64 = 0.2;

/// Inclusive floors: with a season token only entries that earned the
/// season bonus survive.
const MIN_SCORE_WITH_SEASON: f64 = 0.6;
const MIN_SCORE_WITHOUT_SEASON: f64 = 0.4;

#[async_trait]
impl SearchStrategy for SeasonBased {
    fn name(&self) -> &'static str {
        "season"
    }

    async fn search(
        &self,
        catalog: &dyn MetadataCatalog,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let season = extract_season(&query.text);
        let floor = if season.is_some() {
            MIN_SCORE_WITH_SEASON
        } else {
            MIN_SCORE_WITHOUT_SEASON
        };

        let results = catalog.search(query).await?;
        let total = results.len();
        let kept: Vec<CatalogEntry> = results
            .into_iter()
            .filter(|entry| self.score(&query.text, entry) >= floor - f64::EPSILON)
            .collect();

        debug!(query = %query.text, ?season, total, kept = kept.len(), "season strategy filtered results");
        Ok(kept)
    }

    fn score(&self, query: &str, entry: &CatalogEntry) -> f64 {
        match (extract_season(query), entry.season_count) {
            (Some(wanted), Some(count)) if count >= wanted => BASE_SCORE + SEASON_BONUS,
            _ => BASE_SCORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaType;
    use crate::testing::fixtures::tv_entry;
    use crate::testing::MockCatalog;

    fn with_seasons(id: u64, title: &str, seasons: Option<u32>) -> CatalogEntry {
        let mut entry = tv_entry(id, title, title, "2013-04-07");
        entry.season_count = seasons;
        entry
    }

    #[test]
    fn test_score() {
        let entry = with_seasons(1, "Attack on Titan", Some(4));
        assert!((SeasonBased.score("Attack on Titan Season 3", &entry) - 0.6).abs() < 1e-9);
        assert_eq!(SeasonBased.score("Attack on Titan Season 5", &entry), 0.4);
        assert_eq!(SeasonBased.score("Attack on Titan", &entry), 0.4);
        assert_eq!(
            SeasonBased.score("Attack on Titan S2", &with_seasons(2, "x", None)),
            0.4
        );
    }

    #[tokio::test]
    async fn test_search_with_season_token() {
        let catalog = MockCatalog::new();
        catalog
            .set_results(vec![
                with_seasons(1, "Attack on Titan", Some(4)),
                with_seasons(2, "Attack on Titan: Junior High", Some(1)),
                with_seasons(3, "Attack on Titan Specials", None),
            ])
            .await;

        let query = CatalogQuery::new("진격의 거인 3기", MediaType::Anime);
        let results = SeasonBased.search(&catalog, &query).await.unwrap();

        let ids: Vec<u64> = results.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_search_without_season_token_keeps_all() {
        let catalog = MockCatalog::new();
        catalog
            .set_results(vec![
                with_seasons(1, "Attack on Titan", Some(4)),
                with_seasons(3, "Attack on Titan Specials", None),
            ])
            .await;

        let query = CatalogQuery::new("Attack on Titan", MediaType::Tv);
        let results = SeasonBased.search(&catalog, &query).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
