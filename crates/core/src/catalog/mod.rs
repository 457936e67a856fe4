//! External media catalog integration.
//!
//! The resolution pipeline talks to the catalog only through the
//! [`MetadataCatalog`] trait, so the HTTP client can be swapped for a mock
//! in tests or left out entirely (which surfaces as `CatalogUnavailable`).

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when querying a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),

    /// The call did not finish within the configured timeout.
    #[error("Catalog request timed out after {0} ms")]
    Timeout(u64),

    /// The search owning this call was cancelled.
    #[error("Catalog request cancelled")]
    Cancelled,
}

impl CatalogError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::HttpError(_)
            | CatalogError::RateLimitExceeded
            | CatalogError::Timeout(_) => true,
            CatalogError::ApiError { status, .. } => *status >= 500,
            CatalogError::NotFound(_)
            | CatalogError::ParseError(_)
            | CatalogError::NotConfigured(_)
            | CatalogError::Cancelled => false,
        }
    }

    /// Error category reported in `SearchFailed` events.
    pub fn error_type(&self) -> &'static str {
        match self {
            CatalogError::HttpError(_)
            | CatalogError::ApiError { .. }
            | CatalogError::NotFound(_)
            | CatalogError::ParseError(_) => "api_error",
            CatalogError::RateLimitExceeded => "rate_limited",
            CatalogError::NotConfigured(_) => "catalog_unavailable",
            CatalogError::Timeout(_) => "timeout",
            CatalogError::Cancelled => "cancelled",
        }
    }
}

/// Trait for metadata catalog clients.
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    /// Name of this catalog for logging.
    fn name(&self) -> &str;

    /// Search the catalog for entries matching the query.
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        assert_eq!(CatalogError::Timeout(500).error_type(), "timeout");
        assert_eq!(CatalogError::RateLimitExceeded.error_type(), "rate_limited");
        assert_eq!(
            CatalogError::NotConfigured("x".to_string()).error_type(),
            "catalog_unavailable"
        );
        assert_eq!(
            CatalogError::ApiError {
                status: 500,
                message: "boom".to_string()
            }
            .error_type(),
            "api_error"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CatalogError::RateLimitExceeded.is_retryable());
        assert!(CatalogError::Timeout(10).is_retryable());
        assert!(CatalogError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!CatalogError::ApiError {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!CatalogError::Cancelled.is_retryable());
        assert!(!CatalogError::ParseError("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = CatalogError::Timeout(1500);
        assert_eq!(err.to_string(), "Catalog request timed out after 1500 ms");
    }
}
