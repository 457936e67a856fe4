pub mod cache;
pub mod catalog;
pub mod config;
pub mod events;
pub mod matcher;
pub mod metrics;
pub mod service;
pub mod stats;
pub mod strategy;
pub mod testing;

pub use cache::{cache_key, CacheLookup, CacheStats, ResolutionCache};
pub use catalog::{
    CatalogEntry, CatalogError, CatalogQuery, MediaType, MetadataCatalog, TmdbClient, TmdbConfig,
};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use events::{event_channel, EventEnvelope, EventHandle, ResolutionEvent};
pub use matcher::{ConfidenceLevel, Match, MatchRejection, MatcherConfig, ResultMatcher};
pub use service::{
    BulkGroup, BulkOutcome, GroupResolution, Resolution, ResolutionError, ResolutionService,
    SearchOutcome, SearchQuery,
};
pub use stats::{
    SearchStatus, SearchType, StatisticsCollector, StatisticsReport, StatisticsSnapshot,
};
pub use strategy::{SearchStrategy, StrategyFactory, StrategyKind};
