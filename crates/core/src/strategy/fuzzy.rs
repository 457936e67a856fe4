use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use super::text::{
    collapse_whitespace, has_animation_genre, jaccard, strip_bracketed, strip_digits,
    strip_punctuation,
};
use super::SearchStrategy;
use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};

/// Searches several cleaned-up variants of the query and ranks the union
/// by word overlap.
pub struct FuzzyMatch;

const MIN_SCORE: f64 = 0.3;
const ANIMATION_BONUS: f64 = 0.1;
const POPULARITY_BONUS: f64 = 0.05;
const POPULARITY_THRESHOLD: f64 = 50.0;

impl FuzzyMatch {
    /// Query variants in search order: whitespace-collapsed original,
    /// brackets stripped, punctuation stripped, digits stripped.
    /// Empty and duplicate variants are dropped.
    pub fn variants(query: &str) -> Vec<String> {
        let candidates = [
            collapse_whitespace(query),
            strip_bracketed(query),
            strip_punctuation(query),
            strip_digits(query),
        ];

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|v| !v.is_empty())
            .filter(|v| seen.insert(v.clone()))
            .collect()
    }
}

#[async_trait]
impl SearchStrategy for FuzzyMatch {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    async fn search(
        &self,
        catalog: &dyn MetadataCatalog,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let variants = Self::variants(&query.text);
        let mut seen_ids = HashSet::new();
        let mut unique = Vec::new();

        for variant in &variants {
            let results = catalog.search(&query.with_text(variant.as_str())).await?;
            for entry in results {
                if seen_ids.insert(entry.id) {
                    unique.push(entry);
                }
            }
        }

        let mut scored: Vec<(CatalogEntry, f64)> = unique
            .into_iter()
            .map(|entry| {
                let score = self.score(&query.text, &entry);
                (entry, score)
            })
            .filter(|(_, score)| *score > MIN_SCORE)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!(
            query = %query.text,
            variants = variants.len(),
            kept = scored.len(),
            "fuzzy strategy ranked results"
        );
        Ok(scored.into_iter().map(|(entry, _)| entry).collect())
    }

    fn score(&self, query: &str, entry: &CatalogEntry) -> f64 {
        let mut score = jaccard(query, &entry.title).max(jaccard(query, &entry.original_title));
        if has_animation_genre(entry) {
            score += ANIMATION_BONUS;
        }
        if entry.popularity > POPULARITY_THRESHOLD {
            score += POPULARITY_BONUS;
        }
        score.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaType;
    use crate::testing::fixtures::tv_entry;
    use crate::testing::MockCatalog;

    #[test]
    fn test_variants_deduplicated() {
        assert_eq!(FuzzyMatch::variants("Bleach"), vec!["Bleach"]);

        let variants = FuzzyMatch::variants("[Group] Mob Psycho 100 (2016)");
        assert_eq!(
            variants,
            vec![
                "[Group] Mob Psycho 100 (2016)",
                "Mob Psycho 100",
                "Group Mob Psycho 100 2016",
                "[Group] Mob Psycho ()",
            ]
        );
    }

    #[test]
    fn test_variants_drop_empty() {
        assert_eq!(FuzzyMatch::variants("2013"), vec!["2013"]);
        assert!(FuzzyMatch::variants("   ").is_empty());
    }

    #[test]
    fn test_score_bonuses_capped() {
        let mut entry = tv_entry(1, "Attack on Titan", "Shingeki no Kyojin", "2013-04-07");
        assert_eq!(FuzzyMatch.score("attack on titan", &entry), 1.0);

        assert_eq!(FuzzyMatch.score("attack on titan 2013", &entry), 0.75);

        entry.genre_ids = vec![16];
        entry.popularity = 80.0;
        let score = FuzzyMatch.score("attack on titan 2013", &entry);
        assert!((score - 0.9).abs() < 1e-9);
        assert_eq!(FuzzyMatch.score("attack on titan", &entry), 1.0);
    }

    #[tokio::test]
    async fn test_search_dedupes_and_sorts() {
        let catalog = MockCatalog::new();
        catalog
            .set_results(vec![
                tv_entry(2, "Mob Psycho", "Mob Psycho", "2016-07-11"),
                tv_entry(1, "Mob Psycho 100", "モブサイコ100", "2016-07-11"),
                tv_entry(3, "Unrelated Show", "Unrelated Show", "2000-01-01"),
            ])
            .await;

        let query = CatalogQuery::new("Mob Psycho 100", MediaType::Tv);
        let results = FuzzyMatch.search(&catalog, &query).await.unwrap();

        // Two variants ("Mob Psycho 100", "Mob Psycho"), each returning all three
        assert_eq!(catalog.call_count().await, 2);
        let ids: Vec<u64> = results.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
