//! Records and reports kept by the statistics collector.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matcher::{ConfidenceLevel, ScoreHistogram};

/// How a search was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Automatic,
    Manual,
    Bulk,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Automatic => "automatic",
            SearchType::Manual => "manual",
            SearchType::Bulk => "bulk",
        }
    }
}

/// Lifecycle state of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Searching,
    Matching,
    Completed,
    Failed,
    Cancelled,
}

impl SearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStatus::Idle => "idle",
            SearchStatus::Searching => "searching",
            SearchStatus::Matching => "matching",
            SearchStatus::Completed => "completed",
            SearchStatus::Failed => "failed",
            SearchStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the search has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchStatus::Completed | SearchStatus::Failed | SearchStatus::Cancelled
        )
    }
}

/// One search, from start to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRecord {
    pub search_id: Uuid,
    pub search_type: SearchType,
    pub query: String,
    pub started_at: DateTime<Utc>,
    /// Set on completion.
    pub duration_ms: Option<u64>,
    pub status: SearchStatus,
    pub results_count: usize,
    pub match_found: bool,
    pub confidence: Option<ConfidenceLevel>,
    pub score: f64,
    pub error: Option<String>,
}

/// One accepted or selected match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub search_id: Uuid,
    pub search_type: SearchType,
    pub catalog_id: u64,
    pub title: String,
    pub confidence: ConfidenceLevel,
    pub score: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Filter for history queries.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub max_age: Option<Duration>,
    pub search_type: Option<SearchType>,
    pub min_confidence: Option<ConfidenceLevel>,
}

impl HistoryFilter {
    /// Everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Records from the last `days` days.
    pub fn last_days(days: u32) -> Self {
        Self {
            max_age: Some(Duration::days(days as i64)),
            ..Default::default()
        }
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = Some(search_type);
        self
    }

    pub fn with_min_confidence(mut self, confidence: ConfidenceLevel) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    pub(crate) fn accepts(
        &self,
        now: DateTime<Utc>,
        at: DateTime<Utc>,
        search_type: SearchType,
        confidence: Option<ConfidenceLevel>,
    ) -> bool {
        if let Some(max_age) = self.max_age {
            if now - at > max_age {
                return false;
            }
        }
        if let Some(wanted) = self.search_type {
            if wanted != search_type {
                return false;
            }
        }
        if let Some(floor) = self.min_confidence {
            match confidence {
                Some(c) if c >= floor => {}
                _ => return false,
            }
        }
        true
    }
}

/// Aggregate counters at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_searches: u64,
    pub successful_searches: u64,
    pub failed_searches: u64,
    pub cancelled_searches: u64,
    /// Searches answered from the cache.
    pub cached_results: u64,
    /// Catalog requests issued, retries included.
    pub catalog_calls: u64,
    pub average_search_time_ms: f64,
    pub cache_hit_rate: f64,
    /// Successful / total, in [0, 1].
    pub success_rate: f64,
    /// Matches / successful searches, in [0, 1].
    pub match_rate: f64,
    pub total_matches: u64,
    pub confidence_counts: BTreeMap<ConfidenceLevel, u64>,
    pub score_distribution: ScoreHistogram,
}

/// Summary of the search duration series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub count: usize,
    pub average_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    /// Last 10 samples, oldest first.
    pub recent_ms: Vec<u64>,
}

/// Per-search-type aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchTypeStatistics {
    pub count: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_duration_ms: u64,
    pub total_results: u64,
    pub matches_found: u64,
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub average_results: f64,
    /// Matches / successful searches.
    pub match_rate: f64,
}

/// Record counts and age range of the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_search_records: usize,
    pub total_match_records: usize,
    pub oldest_search: Option<DateTime<Utc>>,
    pub newest_search: Option<DateTime<Utc>>,
}

/// Serializable export of everything the collector knows.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub current: StatisticsSnapshot,
    pub search_types: BTreeMap<SearchType, SearchTypeStatistics>,
    /// Last 7 days.
    pub confidence_distribution: BTreeMap<ConfidenceLevel, u64>,
    /// Last 7 days, keyed by bucket label.
    pub score_distribution: BTreeMap<String, u64>,
    pub performance: PerformanceSummary,
    pub data_summary: DataSummary,
    pub exported_at: DateTime<Utc>,
}
