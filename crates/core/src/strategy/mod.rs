//! Search strategies.
//!
//! A strategy decides which catalog calls to issue for a query and which of
//! the returned entries are worth keeping. Strategies are stateless and
//! shared through [`StrategyFactory`].

mod exact;
mod fuzzy;
mod season;
pub mod text;
mod year;

pub use exact::ExactMatch;
pub use fuzzy::FuzzyMatch;
pub use season::SeasonBased;
pub use year::YearBased;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};

/// Trait for search strategies.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// Registry name of this strategy ("exact", "fuzzy", ...).
    fn name(&self) -> &'static str;

    /// Query the catalog and return the entries this strategy accepts.
    async fn search(
        &self,
        catalog: &dyn MetadataCatalog,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Strategy-specific confidence for one entry, in [0, 1].
    fn score(&self, query: &str, entry: &CatalogEntry) -> f64;
}

/// Strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Exact,
    #[default]
    Fuzzy,
    #[serde(rename = "year")]
    YearBased,
    #[serde(rename = "season")]
    SeasonBased,
}

impl StrategyKind {
    /// All kinds in registry order.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Exact,
        StrategyKind::Fuzzy,
        StrategyKind::YearBased,
        StrategyKind::SeasonBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Exact => "exact",
            StrategyKind::Fuzzy => "fuzzy",
            StrategyKind::YearBased => "year",
            StrategyKind::SeasonBased => "season",
        }
    }

    /// Parse a strategy name. Unknown names fall back to fuzzy.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "exact" => StrategyKind::Exact,
            "year" => StrategyKind::YearBased,
            "season" => StrategyKind::SeasonBased,
            _ => StrategyKind::Fuzzy,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name → strategy registry.
pub struct StrategyFactory {
    strategies: HashMap<StrategyKind, Arc<dyn SearchStrategy>>,
}

impl StrategyFactory {
    /// Registry with all built-in strategies.
    pub fn new() -> Self {
        let mut strategies: HashMap<StrategyKind, Arc<dyn SearchStrategy>> = HashMap::new();
        strategies.insert(StrategyKind::Exact, Arc::new(ExactMatch));
        strategies.insert(StrategyKind::Fuzzy, Arc::new(FuzzyMatch));
        strategies.insert(StrategyKind::YearBased, Arc::new(YearBased));
        strategies.insert(StrategyKind::SeasonBased, Arc::new(SeasonBased));
        Self { strategies }
    }

    /// Strategy for a kind.
    pub fn get(&self, kind: StrategyKind) -> Arc<dyn SearchStrategy> {
        match self.strategies.get(&kind) {
            Some(strategy) => Arc::clone(strategy),
            None => Arc::new(FuzzyMatch),
        }
    }

    /// Strategy by name, falling back to fuzzy.
    pub fn create(&self, name: &str) -> Arc<dyn SearchStrategy> {
        self.get(StrategyKind::from_name(name))
    }

    /// Registered names in registry order.
    pub fn names(&self) -> Vec<&'static str> {
        StrategyKind::ALL.iter().map(|k| k.as_str()).collect()
    }

    /// All strategies in registry order.
    pub fn all(&self) -> Vec<Arc<dyn SearchStrategy>> {
        StrategyKind::ALL.iter().map(|k| self.get(*k)).collect()
    }
}

impl Default for StrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}
