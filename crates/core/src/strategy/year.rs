use async_trait::async_trait;
use tracing::debug;

use super::text::extract_year;
use super::SearchStrategy;
use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};

/// Uses a year found in the query text as the catalog year filter and
/// prefers entries close to it.
pub struct YearBased;

const BASE_SCORE: f64 = 0.5;
const MIN_SCORE: f64 = 0.5;

#[async_trait]
impl SearchStrategy for YearBased {
    fn name(&self) -> &'static str {
        "year"
    }

    async fn search(
        &self,
        catalog: &dyn MetadataCatalog,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let year = extract_year(&query.text).or(query.year);
        let filtered = query.clone().with_year(year);

        let results = catalog.search(&filtered).await?;
        let total = results.len();
        let kept: Vec<CatalogEntry> = results
            .into_iter()
            .filter(|entry| self.score(&query.text, entry) > MIN_SCORE)
            .collect();

        debug!(query = %query.text, ?year, total, kept = kept.len(), "year strategy filtered results");
        Ok(kept)
    }

    fn score(&self, query: &str, entry: &CatalogEntry) -> f64 {
        let bonus = match (extract_year(query), entry.year()) {
            (Some(wanted), Some(actual)) => match (wanted - actual).abs() {
                0..=1 => 0.3,
                2..=3 => 0.1,
                _ => 0.0,
            },
            _ => 0.0,
        };
        BASE_SCORE + bonus
    }
}
