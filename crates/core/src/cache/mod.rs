//! In-memory cache of catalog search results.
//!
//! Keys are derived from the normalized title, media type and optional year.
//! Without a TTL an entry stays until the whole cache is cleared; with a TTL
//! configured, stale entries are dropped on lookup.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::catalog::{CatalogEntry, MediaType};
use crate::strategy::text::normalize;

/// Build a cache key: `normalize(title)|media_type[|year]`.
pub fn cache_key(title: &str, media_type: MediaType, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{}|{}|{}", normalize(title), media_type, year),
        None => format!("{}|{}", normalize(title), media_type),
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Vec<CatalogEntry>),
    Miss,
    /// The entry was older than the TTL and has been removed.
    Expired,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub lookups: u64,
    pub hit_rate: f64,
}

struct CacheEntry {
    results: Vec<CatalogEntry>,
    inserted_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    lookups: u64,
}

impl CacheState {
    fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Search result cache with hit-rate tracking.
///
/// Thread-safe and async-compatible.
pub struct ResolutionCache {
    state: RwLock<CacheState>,
    ttl: Option<Duration>,
}

impl ResolutionCache {
    /// Cache without expiry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl: None,
        }
    }

    /// Cache whose entries expire `ttl_hours` after insertion.
    ///
    /// A TTL too large for a [`Duration`] disables expiry.
    pub fn with_ttl_hours(ttl_hours: u64) -> Self {
        let ttl = i64::try_from(ttl_hours).ok().and_then(Duration::try_hours);
        if ttl.is_none() {
            warn!(ttl_hours, "Cache TTL out of range, entries will not expire");
        }

        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
        }
    }

    /// Look up a key, counting the lookup.
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        self.lookup_at(key, Utc::now()).await
    }

    /// Cached results for a key, if present and fresh.
    pub async fn get(&self, key: &str) -> Option<Vec<CatalogEntry>> {
        match self.lookup(key).await {
            CacheLookup::Hit(results) => Some(results),
            CacheLookup::Miss | CacheLookup::Expired => None,
        }
    }

    /// Store results under a key, replacing any previous set.
    /// Returns the new cache size.
    pub async fn put(&self, key: &str, results: Vec<CatalogEntry>) -> usize {
        self.put_at(key, results, Utc::now()).await
    }

    /// Drop every entry and reset the counters.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        let dropped = state.entries.len();
        *state = CacheState::default();
        debug!(dropped, "cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Hits divided by lookups, 0 when nothing was looked up yet.
    pub async fn hit_rate(&self) -> f64 {
        self.state.read().await.hit_rate()
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            size: state.entries.len(),
            hits: state.hits,
            lookups: state.lookups,
            hit_rate: state.hit_rate(),
        }
    }

    async fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> CacheLookup {
        let mut state = self.state.write().await;
        state.lookups += 1;

        let expired = match (state.entries.get(key), self.ttl) {
            (None, _) => return CacheLookup::Miss,
            (Some(entry), Some(ttl)) => now - entry.inserted_at >= ttl,
            (Some(_), None) => false,
        };

        if expired {
            state.entries.remove(key);
            debug!(key, "cache entry expired");
            return CacheLookup::Expired;
        }

        state.hits += 1;
        match state.entries.get(key) {
            Some(entry) => CacheLookup::Hit(entry.results.clone()),
            None => CacheLookup::Miss,
        }
    }

    async fn put_at(&self, key: &str, results: Vec<CatalogEntry>, now: DateTime<Utc>) -> usize {
        let mut state = self.state.write().await;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                results,
                inserted_at: now,
            },
        );
        state.entries.len()
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}
