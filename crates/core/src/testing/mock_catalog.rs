//! Mock metadata catalog for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};
use crate::strategy::text::normalize;

/// Mock implementation of the MetadataCatalog trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable results, globally or per query text
/// - Track queries for assertions
/// - Simulate failures and slow responses
///
/// # Example
///
/// ```rust,ignore
/// use metaresolve_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.set_results(vec![fixtures::attack_on_titan()]).await;
///
/// let results = catalog.search(&query).await?;
/// assert_eq!(results.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockCatalog {
    /// Results returned for any query without a specific entry.
    results: Arc<RwLock<Vec<CatalogEntry>>>,
    /// Results by normalized query text.
    results_by_query: Arc<RwLock<HashMap<String, Vec<CatalogEntry>>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<CatalogQuery>>>,
    /// Errors returned by the next calls, in order.
    errors: Arc<RwLock<VecDeque<CatalogError>>>,
    /// Artificial latency for calls from the given index on.
    delay: Arc<RwLock<Option<(usize, Duration)>>>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new mock catalog that returns nothing.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            results_by_query: Arc::new(RwLock::new(HashMap::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            errors: Arc::new(RwLock::new(VecDeque::new())),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the results returned for any query.
    pub async fn set_results(&self, results: Vec<CatalogEntry>) {
        *self.results.write().await = results;
    }

    /// Set the results returned for one query text (matched after normalization).
    pub async fn set_results_for(&self, query: &str, results: Vec<CatalogEntry>) {
        self.results_by_query
            .write()
            .await
            .insert(normalize(query), results);
    }

    /// Make the next call fail with this error.
    pub async fn set_next_error(&self, error: CatalogError) {
        self.errors.write().await.push_back(error);
    }

    /// Make the next `count` calls fail with errors built by `make`.
    pub async fn fail_next(&self, count: usize, make: impl Fn() -> CatalogError) {
        let mut errors = self.errors.write().await;
        for _ in 0..count {
            errors.push_back(make());
        }
    }

    /// Delay every call by this duration.
    pub async fn set_delay(&self, delay: Duration) {
        self.set_delay_after(0, delay).await;
    }

    /// Answer the first `calls` calls immediately and delay the rest.
    pub async fn set_delay_after(&self, calls: usize, delay: Duration) {
        *self.delay.write().await = Some((calls, delay));
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// All recorded queries, in call order.
    pub async fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.read().await.clone()
    }

    /// Number of calls made.
    pub async fn call_count(&self) -> usize {
        self.queries.read().await.len()
    }

    /// Clear recorded queries.
    pub async fn clear_queries(&self) {
        self.queries.write().await.clear();
    }
}

#[async_trait]
impl MetadataCatalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        let index = {
            let mut queries = self.queries.write().await;
            queries.push(query.clone());
            queries.len() - 1
        };

        let delay = *self.delay.read().await;
        if let Some((after, delay)) = delay {
            if index >= after {
                tokio::time::sleep(delay).await;
            }
        }

        if let Some(error) = self.errors.write().await.pop_front() {
            return Err(error);
        }

        let specific = self
            .results_by_query
            .read()
            .await
            .get(&normalize(&query.text))
            .cloned();
        let mut results = match specific {
            Some(results) => results,
            None => self.results.read().await.clone(),
        };
        results.truncate(query.max_results);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaType;
    use crate::testing::fixtures::{attack_on_titan, tv_entry};

    #[tokio::test]
    async fn test_returns_configured_results() {
        let catalog = MockCatalog::new();
        catalog.set_results(vec![attack_on_titan()]).await;
        catalog
            .set_results_for("Bleach", vec![tv_entry(2, "Bleach", "BLEACH", "2004-10-05")])
            .await;

        let query = CatalogQuery::new("Attack on Titan", MediaType::Tv);
        assert_eq!(catalog.search(&query).await.unwrap()[0].id, 1429);

        let query = CatalogQuery::new("  bleach ", MediaType::Tv);
        assert_eq!(catalog.search(&query).await.unwrap()[0].id, 2);

        assert_eq!(catalog.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_errors_consumed_in_order() {
        let catalog = MockCatalog::new();
        catalog.fail_next(2, || CatalogError::RateLimitExceeded).await;

        let query = CatalogQuery::new("x", MediaType::Tv);
        assert!(catalog.search(&query).await.is_err());
        assert!(catalog.search(&query).await.is_err());
        assert!(catalog.search(&query).await.unwrap().is_empty());
    }
}
