//! Search and match statistics.
//!
//! The collector is plain data guarded by the owner; the resolution service
//! keeps it behind a `RwLock`.

mod types;

pub use types::*;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::matcher::{ConfidenceLevel, Match, ScoreHistogram};

/// Default cap on the duration series kept by [`StatisticsCollector::clear_old`].
pub const DEFAULT_MAX_PERFORMANCE_SAMPLES: usize = 100;

/// Window used by the distributions in [`StatisticsReport`].
const REPORT_WINDOW_DAYS: u32 = 7;

/// Collects search and match history plus running counters.
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    searches: Vec<SearchRecord>,
    matches: Vec<MatchRecord>,
    durations_ms: Vec<u64>,
    max_performance_samples: usize,
    total_searches: u64,
    successful_searches: u64,
    failed_searches: u64,
    cancelled_searches: u64,
    cached_results: u64,
    catalog_calls: u64,
    total_matches: u64,
    confidence_counts: BTreeMap<ConfidenceLevel, u64>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::with_max_performance_samples(DEFAULT_MAX_PERFORMANCE_SAMPLES)
    }

    pub fn with_max_performance_samples(max_performance_samples: usize) -> Self {
        Self {
            searches: Vec::new(),
            matches: Vec::new(),
            durations_ms: Vec::new(),
            max_performance_samples,
            total_searches: 0,
            successful_searches: 0,
            failed_searches: 0,
            cancelled_searches: 0,
            cached_results: 0,
            catalog_calls: 0,
            total_matches: 0,
            confidence_counts: BTreeMap::new(),
        }
    }

    /// Start tracking a search.
    pub fn record_search_start(&mut self, search_id: Uuid, search_type: SearchType, query: &str) {
        self.record_search_start_at(search_id, search_type, query, Utc::now());
    }

    /// Finish a search. Returns false when the id was never started.
    pub fn record_search_completion(
        &mut self,
        search_id: Uuid,
        status: SearchStatus,
        results_count: usize,
        error: Option<String>,
    ) -> bool {
        self.record_search_completion_at(search_id, status, results_count, error, Utc::now())
    }

    /// Attach the match outcome to a search.
    ///
    /// `None` marks the search as having no match (confidence `Uncertain`).
    pub fn record_match(&mut self, search_id: Uuid, found: Option<&Match>) {
        self.record_match_at(search_id, found, Utc::now());
    }

    /// Count a search answered from the cache.
    pub fn record_cache_hit(&mut self) {
        self.cached_results += 1;
    }

    /// Count catalog requests, retries included.
    pub fn record_catalog_calls(&mut self, count: u64) {
        self.catalog_calls += count;
    }

    /// Aggregate snapshot. The cache hit rate comes from the cache itself.
    pub fn current_statistics(&self, cache_hit_rate: f64) -> StatisticsSnapshot {
        let average_search_time_ms = if self.durations_ms.is_empty() {
            0.0
        } else {
            self.durations_ms.iter().sum::<u64>() as f64 / self.durations_ms.len() as f64
        };

        let mut score_distribution = ScoreHistogram::default();
        for record in &self.matches {
            score_distribution.record(record.score);
        }

        StatisticsSnapshot {
            total_searches: self.total_searches,
            successful_searches: self.successful_searches,
            failed_searches: self.failed_searches,
            cancelled_searches: self.cancelled_searches,
            cached_results: self.cached_results,
            catalog_calls: self.catalog_calls,
            average_search_time_ms,
            cache_hit_rate,
            success_rate: ratio(self.successful_searches, self.total_searches),
            match_rate: ratio(self.total_matches, self.successful_searches),
            total_matches: self.total_matches,
            confidence_counts: self.confidence_counts.clone(),
            score_distribution,
        }
    }

    /// Search records passing the filter, oldest first.
    pub fn search_history(&self, filter: &HistoryFilter) -> Vec<SearchRecord> {
        self.search_history_at(filter, Utc::now())
    }

    /// Match records passing the filter, oldest first.
    pub fn match_history(&self, filter: &HistoryFilter) -> Vec<MatchRecord> {
        self.match_history_at(filter, Utc::now())
    }

    /// Summary of the search duration series.
    pub fn performance_summary(&self) -> PerformanceSummary {
        let samples = &self.durations_ms;
        if samples.is_empty() {
            return PerformanceSummary::default();
        }

        let recent_start = samples.len().saturating_sub(10);
        PerformanceSummary {
            count: samples.len(),
            average_ms: samples.iter().sum::<u64>() as f64 / samples.len() as f64,
            min_ms: samples.iter().copied().min().unwrap_or(0),
            max_ms: samples.iter().copied().max().unwrap_or(0),
            recent_ms: samples[recent_start..].to_vec(),
        }
    }

    /// Aggregates per search type over the whole history.
    pub fn search_type_statistics(&self) -> BTreeMap<SearchType, SearchTypeStatistics> {
        let mut by_type: BTreeMap<SearchType, SearchTypeStatistics> = BTreeMap::new();

        for record in &self.searches {
            let stats = by_type.entry(record.search_type).or_default();
            stats.count += 1;
            match record.status {
                SearchStatus::Completed => stats.successful += 1,
                SearchStatus::Failed => stats.failed += 1,
                _ => {}
            }
            stats.total_duration_ms += record.duration_ms.unwrap_or(0);
            stats.total_results += record.results_count as u64;
            if record.match_found {
                stats.matches_found += 1;
            }
        }

        for stats in by_type.values_mut() {
            stats.success_rate = ratio(stats.successful, stats.count);
            stats.average_duration_ms = stats.total_duration_ms as f64 / stats.count as f64;
            stats.average_results = stats.total_results as f64 / stats.count as f64;
            stats.match_rate = ratio(stats.matches_found, stats.successful);
        }

        by_type
    }

    /// Confidence counts of matches from the last `days` days.
    pub fn confidence_distribution(&self, days: u32) -> BTreeMap<ConfidenceLevel, u64> {
        let mut distribution = BTreeMap::new();
        for record in self.match_history(&HistoryFilter::last_days(days)) {
            *distribution.entry(record.confidence).or_insert(0) += 1;
        }
        distribution
    }

    /// Score histogram of matches from the last `days` days.
    pub fn score_distribution(&self, days: u32) -> ScoreHistogram {
        let mut histogram = ScoreHistogram::default();
        for record in self.match_history(&HistoryFilter::last_days(days)) {
            histogram.record(record.score);
        }
        histogram
    }

    /// Everything in one serializable report.
    pub fn export(&self, cache_hit_rate: f64) -> StatisticsReport {
        StatisticsReport {
            current: self.current_statistics(cache_hit_rate),
            search_types: self.search_type_statistics(),
            confidence_distribution: self.confidence_distribution(REPORT_WINDOW_DAYS),
            score_distribution: self.score_distribution(REPORT_WINDOW_DAYS).labelled(),
            performance: self.performance_summary(),
            data_summary: DataSummary {
                total_search_records: self.searches.len(),
                total_match_records: self.matches.len(),
                oldest_search: self.searches.iter().map(|r| r.started_at).min(),
                newest_search: self.searches.iter().map(|r| r.started_at).max(),
            },
            exported_at: Utc::now(),
        }
    }

    /// Drop records older than `days` days and trim the duration series.
    /// Returns the number of records removed.
    pub fn clear_old(&mut self, days: u32) -> usize {
        self.clear_old_at(days, Utc::now())
    }

    /// Wipe all history and counters.
    pub fn reset(&mut self) {
        *self = Self::with_max_performance_samples(self.max_performance_samples);
        info!("Statistics reset");
    }

    fn record_search_start_at(
        &mut self,
        search_id: Uuid,
        search_type: SearchType,
        query: &str,
        now: DateTime<Utc>,
    ) {
        self.searches.push(SearchRecord {
            search_id,
            search_type,
            query: query.to_string(),
            started_at: now,
            duration_ms: None,
            status: SearchStatus::Searching,
            results_count: 0,
            match_found: false,
            confidence: None,
            score: 0.0,
            error: None,
        });
        self.total_searches += 1;
    }

    fn record_search_completion_at(
        &mut self,
        search_id: Uuid,
        status: SearchStatus,
        results_count: usize,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(record) = self.searches.iter_mut().find(|r| r.search_id == search_id) else {
            warn!(%search_id, "Completion recorded for unknown search");
            return false;
        };

        let duration_ms = (now - record.started_at).num_milliseconds().max(0) as u64;
        record.status = status;
        record.results_count = results_count;
        record.error = error;
        record.duration_ms = Some(duration_ms);

        match status {
            SearchStatus::Completed => self.successful_searches += 1,
            SearchStatus::Failed => self.failed_searches += 1,
            SearchStatus::Cancelled => self.cancelled_searches += 1,
            _ => {}
        }
        self.durations_ms.push(duration_ms);
        true
    }

    fn record_match_at(&mut self, search_id: Uuid, found: Option<&Match>, now: DateTime<Utc>) {
        let record = self.searches.iter_mut().find(|r| r.search_id == search_id);
        let search_type = record
            .as_ref()
            .map(|r| r.search_type)
            .unwrap_or(SearchType::Manual);

        match (record, found) {
            (Some(record), Some(m)) => {
                record.match_found = true;
                record.confidence = Some(m.confidence);
                record.score = m.score;
            }
            (Some(record), None) => {
                record.match_found = false;
                record.confidence = Some(ConfidenceLevel::Uncertain);
                record.score = 0.0;
            }
            (None, _) => debug!(%search_id, "Match recorded without a search record"),
        }

        if let Some(m) = found {
            self.total_matches += 1;
            *self.confidence_counts.entry(m.confidence).or_insert(0) += 1;
            self.matches.push(MatchRecord {
                search_id,
                search_type,
                catalog_id: m.entry.id,
                title: m.entry.title.clone(),
                confidence: m.confidence,
                score: m.score,
                recorded_at: now,
            });
        }
    }

    fn search_history_at(&self, filter: &HistoryFilter, now: DateTime<Utc>) -> Vec<SearchRecord> {
        self.searches
            .iter()
            .filter(|r| filter.accepts(now, r.started_at, r.search_type, r.confidence))
            .cloned()
            .collect()
    }

    fn match_history_at(&self, filter: &HistoryFilter, now: DateTime<Utc>) -> Vec<MatchRecord> {
        self.matches
            .iter()
            .filter(|r| filter.accepts(now, r.recorded_at, r.search_type, Some(r.confidence)))
            .cloned()
            .collect()
    }

    fn clear_old_at(&mut self, days: u32, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(days as i64);

        let searches_before = self.searches.len();
        self.searches.retain(|r| r.started_at >= cutoff);
        let searches_removed = searches_before - self.searches.len();

        let matches_before = self.matches.len();
        self.matches.retain(|r| r.recorded_at >= cutoff);
        let matches_removed = matches_before - self.matches.len();

        if self.durations_ms.len() > self.max_performance_samples {
            let excess = self.durations_ms.len() - self.max_performance_samples;
            self.durations_ms.drain(..excess);
        }

        info!(
            searches_removed,
            matches_removed, "Cleared statistics older than {} days", days
        );
        searches_removed + matches_removed
    }
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
