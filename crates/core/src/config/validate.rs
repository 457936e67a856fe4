use super::{types::Config, ConfigError};

/// Ten years.
pub const MAX_CACHE_TTL_HOURS: u64 = 24 * 365 * 10;

/// Validate configuration
/// Currently validates:
/// - Catalog API key is not empty when a catalog is configured
/// - Request timeout is not 0
/// - Auto-accept threshold is within [0, 1]
/// - At least one suggestion is offered
/// - Retry backoff does not shrink
/// - Cache TTL, when set, is between 1 and [`MAX_CACHE_TTL_HOURS`]
/// - Performance sample cap is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if let Some(catalog) = &config.catalog {
        if catalog.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.api_key cannot be empty".to_string(),
            ));
        }
    }

    let resolver = &config.resolver;
    if resolver.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "resolver.request_timeout_secs cannot be 0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&resolver.auto_accept_threshold) {
        return Err(ConfigError::ValidationError(format!(
            "resolver.auto_accept_threshold must be between 0 and 1, got {}",
            resolver.auto_accept_threshold
        )));
    }

    if resolver.max_suggestions == 0 {
        return Err(ConfigError::ValidationError(
            "resolver.max_suggestions cannot be 0".to_string(),
        ));
    }

    if resolver.retry.enabled && resolver.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "resolver.retry.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }

    if resolver.cache.ttl_hours == Some(0) {
        return Err(ConfigError::ValidationError(
            "resolver.cache.ttl_hours cannot be 0 (leave unset to disable expiry)".to_string(),
        ));
    }

    if let Some(ttl_hours) = resolver.cache.ttl_hours {
        if ttl_hours > MAX_CACHE_TTL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "resolver.cache.ttl_hours must be at most {}, got {}",
                MAX_CACHE_TTL_HOURS, ttl_hours
            )));
        }
    }

    if config.statistics.max_performance_samples == 0 {
        return Err(ConfigError::ValidationError(
            "statistics.max_performance_samples cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TmdbConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_api_key_fails() {
        let config = Config {
            catalog: Some(TmdbConfig {
                api_key: "  ".to_string(),
                base_url: None,
                timeout_secs: 30,
                fetch_details: false,
            }),
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_timeout_zero_fails() {
        let mut config = Config::default();
        config.resolver.request_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_threshold_out_of_range_fails() {
        let mut config = Config::default();
        config.resolver.auto_accept_threshold = 1.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("auto_accept_threshold"));
    }

    #[test]
    fn test_validate_shrinking_backoff_only_when_enabled() {
        let mut config = Config::default();
        config.resolver.retry.backoff_multiplier = 0.5;
        assert!(validate_config(&config).is_ok());

        config.resolver.retry.enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_ttl_fails() {
        let mut config = Config::default();
        config.resolver.cache.ttl_hours = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_ttl_upper_bound() {
        let mut config = Config::default();
        config.resolver.cache.ttl_hours = Some(MAX_CACHE_TTL_HOURS);
        assert!(validate_config(&config).is_ok());

        config.resolver.cache.ttl_hours = Some(u64::MAX);
        assert!(validate_config(&config).is_err());
    }
}
