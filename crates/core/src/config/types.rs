use serde::{Deserialize, Serialize};

use crate::catalog::TmdbConfig;
use crate::strategy::StrategyKind;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Catalog client settings. Without them every search fails with
    /// `CatalogUnavailable`.
    #[serde(default)]
    pub catalog: Option<TmdbConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

/// Resolution service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Strategy used by title and group searches.
    #[serde(default)]
    pub default_strategy: StrategyKind,
    /// Delay between groups in bulk resolution.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Per catalog call timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Candidates offered when manual selection is required.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Auto mode accepts the best candidate only above this score.
    #[serde(default = "default_auto_accept_threshold")]
    pub auto_accept_threshold: f64,
    /// Catalog response language.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub include_adult: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_strategy: StrategyKind::default(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_suggestions: default_max_suggestions(),
            auto_accept_threshold: default_auto_accept_threshold(),
            language: default_language(),
            include_adult: false,
            max_results: default_max_results(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_rate_limit_delay_ms() -> u64 {
    200
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_suggestions() -> usize {
    5
}

fn default_auto_accept_threshold() -> f64 {
    0.6
}

fn default_language() -> String {
    "ko-KR".to_string()
}

fn default_max_results() -> usize {
    20
}

/// Retry policy for failed catalog calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Off by default: a failed call fails the search immediately.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Retries allowed per call (0 when disabled).
    pub fn effective_max_retries(&self) -> u32 {
        if self.enabled {
            self.max_retries
        } else {
            0
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        (delay as u64).min(self.max_backoff_ms)
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Entry lifetime. Unset keeps entries until the cache is cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hours: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_hours: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

/// Statistics retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatisticsConfig {
    #[serde(default = "default_history_retention_days")]
    pub history_retention_days: u32,
    #[serde(default = "default_max_performance_samples")]
    pub max_performance_samples: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            history_retention_days: default_history_retention_days(),
            max_performance_samples: default_max_performance_samples(),
        }
    }
}

fn default_history_retention_days() -> u32 {
    30
}

fn default_max_performance_samples() -> usize {
    100
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<SanitizedCatalogConfig>,
    pub resolver: ResolverConfig,
    pub statistics: StatisticsConfig,
}

/// Sanitized catalog config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
    pub fetch_details: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            catalog: config.catalog.as_ref().map(|c| SanitizedCatalogConfig {
                base_url: c.base_url.clone(),
                api_key_configured: !c.api_key.is_empty(),
                timeout_secs: c.timeout_secs,
                fetch_details: c.fetch_details,
            }),
            resolver: config.resolver.clone(),
            statistics: config.statistics.clone(),
        }
    }
}
