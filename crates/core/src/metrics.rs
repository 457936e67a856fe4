//! Prometheus metrics for the resolution pipeline.
//!
//! This module provides metrics for:
//! - Searches (results, durations)
//! - Cache lookups
//! - Catalog requests and retries
//! - Matching and bulk resolution

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Searches
// =============================================================================

/// Searches total by result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("metaresolve_searches_total", "Total searches"),
        &["result"], // "completed", "failed", "cancelled", "cached"
    )
    .unwrap()
});

/// Search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "metaresolve_search_duration_seconds",
            "Duration of a single search including catalog calls",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["strategy"],
    )
    .unwrap()
});

// =============================================================================
// Cache
// =============================================================================

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("metaresolve_cache_lookups_total", "Total cache lookups"),
        &["result"], // "hit", "miss", "expired"
    )
    .unwrap()
});

// =============================================================================
// Catalog
// =============================================================================

/// Catalog requests by status.
pub static CATALOG_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("metaresolve_catalog_requests_total", "Total catalog requests"),
        &["status"], // "success", "api_error", "rate_limited", "timeout", ...
    )
    .unwrap()
});

/// Catalog request retries.
pub static CATALOG_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "metaresolve_catalog_retries_total",
        "Total catalog request retries",
    )
    .unwrap()
});

// =============================================================================
// Matching
// =============================================================================

/// Accepted match scores.
pub static MATCH_SCORE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("metaresolve_match_score", "Score of accepted matches")
            .buckets(vec![0.2, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        &["mode"], // "auto", "manual"
    )
    .unwrap()
});

/// Bulk-resolved groups by outcome.
pub static BULK_GROUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("metaresolve_bulk_groups_total", "Groups processed by bulk resolution"),
        &["outcome"], // "matched", "manual", "failed", "cancelled"
    )
    .unwrap()
});

/// All collectors, for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CATALOG_REQUESTS.clone()),
        Box::new(CATALOG_RETRIES.clone()),
        Box::new(MATCH_SCORE.clone()),
        Box::new(BULK_GROUPS.clone()),
    ]
}
