use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{CatalogEntry, MediaType};
use crate::matcher::Match;
use crate::stats::{SearchStatus, StatisticsSnapshot};

/// Cache mutation reported by [`ResolutionEvent::CacheUpdated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOperation {
    Add,
    Clear,
    Expire,
}

/// A ranked candidate offered for manual selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub entry: CatalogEntry,
    pub score: f64,
}

/// Resolution event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionEvent {
    // Search lifecycle
    SearchStarted {
        search_id: Uuid,
        query: String,
        media_type: MediaType,
        /// Strategy name ("fuzzy", "exact", ...).
        strategy: String,
        /// Group this search resolves, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_id: Option<String>,
    },
    SearchProgress {
        search_id: Uuid,
        current_item: usize,
        total_items: usize,
        current_query: String,
        status: SearchStatus,
        progress_percent: u8,
    },
    SearchResults {
        search_id: Uuid,
        results: Vec<CatalogEntry>,
        duration_ms: u64,
        from_cache: bool,
    },
    SearchCompleted {
        search_id: Uuid,
        total_results: usize,
        duration_ms: u64,
        statistics: StatisticsSnapshot,
    },
    SearchFailed {
        search_id: Uuid,
        /// Error category ("api_error", "timeout", "catalog_unavailable", ...).
        error_type: String,
        error_message: String,
        /// Retries actually performed.
        retry_count: u32,
        max_retries: u32,
    },
    SearchCancelled {
        search_id: Uuid,
        reason: String,
        /// Results gathered before cancellation.
        partial_results: Vec<CatalogEntry>,
    },

    // Cache
    CacheUpdated {
        operation: CacheOperation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        size: usize,
        hit_rate: f64,
    },

    // Matching
    MatchFound {
        search_id: Uuid,
        group_id: String,
        #[serde(rename = "match")]
        matched: Match,
        auto_matched: bool,
    },
    ManualSelectionRequested {
        search_id: Uuid,
        group_id: String,
        query: String,
        /// Best first.
        candidates: Vec<Candidate>,
    },
    ManualSelectionCompleted {
        search_id: Uuid,
        group_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected: Option<Match>,
        user_cancelled: bool,
    },

    // Bulk resolution
    BulkStarted {
        bulk_id: Uuid,
        group_ids: Vec<String>,
        total_groups: usize,
        strategy: String,
    },
    BulkProgress {
        bulk_id: Uuid,
        /// 1-based index of the group just processed.
        current_group: usize,
        total_groups: usize,
        current_group_id: String,
        completed_groups: usize,
        failed_groups: usize,
        progress_percent: u8,
    },
    BulkCompleted {
        bulk_id: Uuid,
        total_groups: usize,
        successful_matches: usize,
        failed_searches: usize,
        manual_selections_required: usize,
        cancelled: bool,
        duration_ms: u64,
        statistics: StatisticsSnapshot,
    },
}

impl ResolutionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ResolutionEvent::SearchStarted { .. } => "search_started",
            ResolutionEvent::SearchProgress { .. } => "search_progress",
            ResolutionEvent::SearchResults { .. } => "search_results",
            ResolutionEvent::SearchCompleted { .. } => "search_completed",
            ResolutionEvent::SearchFailed { .. } => "search_failed",
            ResolutionEvent::SearchCancelled { .. } => "search_cancelled",
            ResolutionEvent::CacheUpdated { .. } => "cache_updated",
            ResolutionEvent::MatchFound { .. } => "match_found",
            ResolutionEvent::ManualSelectionRequested { .. } => "manual_selection_requested",
            ResolutionEvent::ManualSelectionCompleted { .. } => "manual_selection_completed",
            ResolutionEvent::BulkStarted { .. } => "bulk_started",
            ResolutionEvent::BulkProgress { .. } => "bulk_progress",
            ResolutionEvent::BulkCompleted { .. } => "bulk_completed",
        }
    }

    /// Get the search ID if this event concerns a single search
    pub fn search_id(&self) -> Option<Uuid> {
        match self {
            ResolutionEvent::SearchStarted { search_id, .. }
            | ResolutionEvent::SearchProgress { search_id, .. }
            | ResolutionEvent::SearchResults { search_id, .. }
            | ResolutionEvent::SearchCompleted { search_id, .. }
            | ResolutionEvent::SearchFailed { search_id, .. }
            | ResolutionEvent::SearchCancelled { search_id, .. }
            | ResolutionEvent::MatchFound { search_id, .. }
            | ResolutionEvent::ManualSelectionRequested { search_id, .. }
            | ResolutionEvent::ManualSelectionCompleted { search_id, .. } => Some(*search_id),
            ResolutionEvent::CacheUpdated { .. }
            | ResolutionEvent::BulkStarted { .. }
            | ResolutionEvent::BulkProgress { .. }
            | ResolutionEvent::BulkCompleted { .. } => None,
        }
    }

    /// Whether this event ends a search.
    pub fn is_search_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionEvent::SearchCompleted { .. }
                | ResolutionEvent::SearchFailed { .. }
                | ResolutionEvent::SearchCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ResultMatcher;
    use crate::testing::fixtures::attack_on_titan;

    #[test]
    fn test_event_type_search_failed() {
        let event = ResolutionEvent::SearchFailed {
            search_id: Uuid::new_v4(),
            error_type: "timeout".to_string(),
            error_message: "Catalog request timed out after 10000 ms".to_string(),
            retry_count: 0,
            max_retries: 3,
        };
        assert_eq!(event.event_type(), "search_failed");
        assert!(event.is_search_terminal());
        assert!(event.search_id().is_some());
    }

    #[test]
    fn test_event_type_cache_updated() {
        let event = ResolutionEvent::CacheUpdated {
            operation: CacheOperation::Clear,
            key: None,
            size: 0,
            hit_rate: 0.0,
        };
        assert_eq!(event.event_type(), "cache_updated");
        assert_eq!(event.search_id(), None);
        assert!(!event.is_search_terminal());
    }

    #[test]
    fn test_serialize_match_found() {
        let matched = ResultMatcher::default().to_match("Attack on Titan 2013", &attack_on_titan(), Vec::new());
        let event = ResolutionEvent::MatchFound {
            search_id: Uuid::new_v4(),
            group_id: "group-1".to_string(),
            matched,
            auto_matched: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "match_found");
        assert_eq!(json["match"]["confidence"], "medium");
        assert_eq!(json["match"]["entry"]["title"], "Attack on Titan");

        let parsed: ResolutionEvent = serde_json::from_value(json).unwrap();
        assert!(matches!(parsed, ResolutionEvent::MatchFound { auto_matched: true, .. }));
    }

    #[test]
    fn test_serialize_bulk_progress() {
        let event = ResolutionEvent::BulkProgress {
            bulk_id: Uuid::new_v4(),
            current_group: 2,
            total_groups: 4,
            current_group_id: "g2".to_string(),
            completed_groups: 1,
            failed_groups: 1,
            progress_percent: 50,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"bulk_progress\""));
        assert!(json.contains("\"progress_percent\":50"));
    }
}
