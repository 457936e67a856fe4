//! Request and outcome types of the resolution service.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MediaType};
use crate::events::Candidate;
use crate::matcher::{Match, MatchRejection};
use crate::stats::{SearchStatus, SearchType};

/// Errors surfaced by the resolution service.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionError {
    /// No catalog client is configured.
    #[error("Catalog unavailable: no catalog client configured")]
    CatalogUnavailable,

    /// The catalog call failed (network, provider or parse error).
    #[error("Catalog request failed ({error_type}) after {retries} retries: {message}")]
    CatalogRequestFailed {
        error_type: String,
        message: String,
        retries: u32,
    },

    /// The catalog call did not finish in time.
    #[error("Catalog request timed out after {timeout_ms} ms ({retries} retries)")]
    Timeout { timeout_ms: u64, retries: u32 },

    /// The search was cancelled.
    #[error("Search cancelled")]
    Cancelled,

    /// The best candidate did not pass validation.
    #[error("Match validation failed: {0}")]
    ValidationFailure(MatchRejection),
}

impl ResolutionError {
    /// Convert a catalog error, recording how many retries were made.
    pub fn from_catalog(error: &CatalogError, retries: u32) -> Self {
        match error {
            CatalogError::NotConfigured(_) => ResolutionError::CatalogUnavailable,
            CatalogError::Timeout(timeout_ms) => ResolutionError::Timeout {
                timeout_ms: *timeout_ms,
                retries,
            },
            CatalogError::Cancelled => ResolutionError::Cancelled,
            other => ResolutionError::CatalogRequestFailed {
                error_type: other.error_type().to_string(),
                message: other.to_string(),
                retries,
            },
        }
    }

    /// Error category reported in `SearchFailed` events.
    pub fn error_type(&self) -> &str {
        match self {
            ResolutionError::CatalogUnavailable => "catalog_unavailable",
            ResolutionError::CatalogRequestFailed { error_type, .. } => error_type,
            ResolutionError::Timeout { .. } => "timeout",
            ResolutionError::Cancelled => "cancelled",
            ResolutionError::ValidationFailure(_) => "validation_failure",
        }
    }

    /// Retries performed before giving up.
    pub fn retries(&self) -> u32 {
        match self {
            ResolutionError::CatalogRequestFailed { retries, .. }
            | ResolutionError::Timeout { retries, .. } => *retries,
            _ => 0,
        }
    }
}

/// A search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default = "default_search_type")]
    pub search_type: SearchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Overrides the configured language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub include_adult: bool,
    /// Overrides the configured maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    /// Whether the result cache may be used.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_search_type() -> SearchType {
    SearchType::Automatic
}

fn default_use_cache() -> bool {
    true
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            text: text.into(),
            media_type,
            search_type: default_search_type(),
            year: None,
            language: None,
            include_adult: false,
            max_results: None,
            use_cache: true,
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Bypass the result cache for this search.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Catalog options, filling unset fields from the given defaults.
    pub fn to_catalog_query(&self, language: &str, max_results: usize) -> CatalogQuery {
        CatalogQuery {
            text: self.text.clone(),
            media_type: self.media_type,
            year: self.year,
            language: self.language.clone().unwrap_or_else(|| language.to_string()),
            include_adult: self.include_adult,
            max_results: self.max_results.unwrap_or(max_results),
        }
    }
}

/// Result of a single search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub search_id: Uuid,
    /// Completed, Failed or Cancelled.
    pub status: SearchStatus,
    pub results: Vec<CatalogEntry>,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionError>,
    pub duration_ms: u64,
}

impl SearchOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == SearchStatus::Completed
    }
}

/// How a group ended up after resolution.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// A candidate was accepted automatically.
    Matched(Match),
    /// The user has to pick; candidates are ranked best first and may be empty.
    ManualSelectionRequired { candidates: Vec<Candidate> },
    Failed(ResolutionError),
    Cancelled,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Matched(_) => "matched",
            Resolution::ManualSelectionRequired { .. } => "manual",
            Resolution::Failed(_) => "failed",
            Resolution::Cancelled => "cancelled",
        }
    }
}

/// Resolution of one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResolution {
    pub search_id: Uuid,
    pub group_id: String,
    /// Title actually sent to the catalog.
    pub query: String,
    pub resolution: Resolution,
}

/// A group to resolve in bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkGroup {
    pub group_id: String,
    /// Raw title as detected locally.
    pub title: String,
    #[serde(default)]
    pub media_type: MediaType,
}

impl BulkGroup {
    pub fn new(group_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            title: title.into(),
            media_type: MediaType::default(),
        }
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }
}

/// Result of a bulk resolution.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub bulk_id: Uuid,
    pub total_groups: usize,
    /// Groups searched without failure (auto-matched or awaiting manual selection).
    pub successful: usize,
    pub failed: usize,
    /// Subset of `successful` that needs a manual pick.
    pub manual_required: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
    /// Per-group outcomes in processing order.
    pub groups: Vec<GroupResolution>,
}
