use async_trait::async_trait;
use tracing::debug;

use super::text::title_ladder;
use super::SearchStrategy;
use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};

/// Keeps entries whose title equals or contains the query.
pub struct ExactMatch;

const MIN_SCORE: f64 = 0.8;

#[async_trait]
impl SearchStrategy for ExactMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn search(
        &self,
        catalog: &dyn MetadataCatalog,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let results = catalog.search(query).await?;
        let total = results.len();

        let kept: Vec<CatalogEntry> = results
            .into_iter()
            .filter(|entry| self.score(&query.text, entry) > MIN_SCORE)
            .collect();

        debug!(query = %query.text, total, kept = kept.len(), "exact strategy filtered results");
        Ok(kept)
    }

    fn score(&self, query: &str, entry: &CatalogEntry) -> f64 {
        let title = title_ladder(query, &entry.title).unwrap_or(0.0);
        let original = title_ladder(query, &entry.original_title).unwrap_or(0.0);
        title.max(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaType;
    use crate::testing::fixtures::tv_entry;
    use crate::testing::MockCatalog;

    #[test]
    fn test_score_ladder() {
        let entry = tv_entry(1, "Attack on Titan", "Shingeki no Kyojin", "2013-04-07");
        assert_eq!(ExactMatch.score("attack on  titan", &entry), 1.0);
        assert_eq!(ExactMatch.score("shingeki no kyojin", &entry), 1.0);
        assert_eq!(ExactMatch.score("Titan", &entry), 0.9);
        assert_eq!(ExactMatch.score("titan attack", &entry), 0.8);
        assert_eq!(ExactMatch.score("Bleach", &entry), 0.0);
    }

    #[tokio::test]
    async fn test_search_keeps_only_strong_matches() {
        let catalog = MockCatalog::new();
        catalog
            .set_results(vec![
                tv_entry(1, "Attack on Titan", "Shingeki no Kyojin", "2013-04-07"),
                tv_entry(2, "Titan Attack Force", "Titan Attack Force", "2001-01-01"),
                tv_entry(3, "Bleach", "BLEACH", "2004-10-05"),
            ])
            .await;

        let query = CatalogQuery::new("Attack on Titan", MediaType::Tv);
        let results = ExactMatch.search(&catalog, &query).await.unwrap();

        let ids: Vec<u64> = results.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(catalog.call_count().await, 1);
    }
}
