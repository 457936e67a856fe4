//! The resolution service: searches, group matching and bulk resolution.
//!
//! A search moves through `Searching`, optionally `Matching`, and ends in
//! exactly one of `Completed`, `Failed` or `Cancelled`. Whoever removes the
//! search from the active registry first emits the terminal event, so a
//! `cancel()` racing a finishing search never produces two terminal events.

mod guard;
mod title;
mod types;

pub use title::*;
pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{cache_key, CacheLookup, CacheStats, ResolutionCache};
use crate::catalog::{CatalogEntry, MediaType, MetadataCatalog};
use crate::config::{Config, ResolverConfig, StatisticsConfig};
use crate::events::{CacheOperation, Candidate, EventHandle, ResolutionEvent};
use crate::matcher::{ConfidenceLevel, Match, MatcherConfig, ResultMatcher};
use crate::metrics;
use crate::stats::{
    SearchStatus, SearchType, StatisticsCollector, StatisticsReport, StatisticsSnapshot,
};
use crate::strategy::{StrategyFactory, StrategyKind};
use guard::GuardedCatalog;

/// Score given to a user-picked candidate.
const MANUAL_SELECTION_SCORE: f64 = 0.95;

/// Registry entry for a search that has not reached a terminal state.
pub(crate) struct ActiveSearch {
    pub(crate) query: String,
    pub(crate) token: CancellationToken,
    /// Results of the catalog calls finished so far.
    pub(crate) partial_results: Vec<CatalogEntry>,
}

/// Group matching parameters for a search.
struct GroupContext<'a> {
    group_id: &'a str,
    /// Title the candidates are scored against.
    target: String,
    auto_match: bool,
}

/// Resolves local titles against the metadata catalog.
///
/// Thread-safe; share it through an `Arc`.
pub struct ResolutionService {
    config: ResolverConfig,
    statistics_config: StatisticsConfig,
    catalog: Option<Arc<dyn MetadataCatalog>>,
    events: Option<EventHandle>,
    strategies: StrategyFactory,
    matcher: ResultMatcher,
    cache: ResolutionCache,
    statistics: RwLock<StatisticsCollector>,
    active: RwLock<HashMap<Uuid, ActiveSearch>>,
    bulks: RwLock<HashMap<Uuid, CancellationToken>>,
    results: RwLock<HashMap<Uuid, Vec<CatalogEntry>>>,
    group_matches: RwLock<HashMap<String, Match>>,
}

impl ResolutionService {
    /// Create a service. Without a catalog every search fails with
    /// [`ResolutionError::CatalogUnavailable`].
    pub fn new(config: &Config, catalog: Option<Arc<dyn MetadataCatalog>>) -> Self {
        let resolver = config.resolver.clone();

        let matcher = ResultMatcher::new(MatcherConfig {
            auto_accept_threshold: resolver.auto_accept_threshold,
            ..MatcherConfig::default()
        });

        let cache = match resolver.cache.ttl_hours {
            Some(hours) => ResolutionCache::with_ttl_hours(hours),
            None => ResolutionCache::new(),
        };

        let statistics = StatisticsCollector::with_max_performance_samples(
            config.statistics.max_performance_samples,
        );

        if catalog.is_none() {
            warn!("No catalog client configured, searches will fail");
        }

        Self {
            config: resolver,
            statistics_config: config.statistics.clone(),
            catalog,
            events: None,
            strategies: StrategyFactory::new(),
            matcher,
            cache,
            statistics: RwLock::new(statistics),
            active: RwLock::new(HashMap::new()),
            bulks: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
            group_matches: RwLock::new(HashMap::new()),
        }
    }

    /// Emit events through this handle.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Names of the available strategies.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.names()
    }

    // =========================================================================
    // Searching
    // =========================================================================

    /// Search by title with the configured default strategy.
    pub async fn search_by_title(
        &self,
        title: &str,
        media_type: MediaType,
        year: Option<i32>,
    ) -> SearchOutcome {
        let query = SearchQuery::new(title, media_type).with_year(year);
        let (outcome, _) = self
            .execute(query, self.config.default_strategy, None, None)
            .await;
        outcome
    }

    /// Search with an explicit strategy.
    pub async fn search(&self, query: SearchQuery, strategy: StrategyKind) -> SearchOutcome {
        let (outcome, _) = self.execute(query, strategy, None, None).await;
        outcome
    }

    /// Clean a raw group title, search for it and try to match the results.
    pub async fn resolve_for_group(
        &self,
        group_id: &str,
        raw_title: &str,
        auto_match: bool,
    ) -> GroupResolution {
        let group = BulkGroup::new(group_id, raw_title);
        self.resolve_group(&group, auto_match, SearchType::Automatic, None)
            .await
    }

    async fn resolve_group(
        &self,
        group: &BulkGroup,
        auto_match: bool,
        search_type: SearchType,
        parent: Option<&CancellationToken>,
    ) -> GroupResolution {
        let query_text = clean_title_for_search(&group.title);
        let context = GroupContext {
            group_id: &group.group_id,
            target: strip_release_tags(&group.title),
            auto_match,
        };

        debug!(
            group_id = %group.group_id,
            raw_title = %group.title,
            query = %query_text,
            "Resolving group"
        );

        let query =
            SearchQuery::new(query_text.clone(), group.media_type).with_search_type(search_type);
        let (outcome, resolution) = self
            .execute(query, self.config.default_strategy, Some(context), parent)
            .await;

        let resolution = match resolution {
            Some(resolution) => resolution,
            None => match outcome.error {
                Some(ResolutionError::Cancelled) | None => Resolution::Cancelled,
                Some(error) => Resolution::Failed(error),
            },
        };

        GroupResolution {
            search_id: outcome.search_id,
            group_id: group.group_id.clone(),
            query: query_text,
            resolution,
        }
    }

    /// Run one search from registration to its terminal event.
    ///
    /// The resolution is only present for group searches that completed.
    async fn execute(
        &self,
        query: SearchQuery,
        strategy: StrategyKind,
        group: Option<GroupContext<'_>>,
        parent: Option<&CancellationToken>,
    ) -> (SearchOutcome, Option<Resolution>) {
        let search_id = Uuid::new_v4();
        let started = Instant::now();
        let token = match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        // Announced before registration so a cancel can never precede it
        info!(
            %search_id,
            query = %query.text,
            media_type = %query.media_type,
            %strategy,
            "Search started"
        );
        self.emit(ResolutionEvent::SearchStarted {
            search_id,
            query: query.text.clone(),
            media_type: query.media_type,
            strategy: strategy.to_string(),
            group_id: group.as_ref().map(|g| g.group_id.to_string()),
        })
        .await;

        self.active.write().await.insert(
            search_id,
            ActiveSearch {
                query: query.text.clone(),
                token: token.clone(),
                partial_results: Vec::new(),
            },
        );
        self.statistics
            .write()
            .await
            .record_search_start(search_id, query.search_type, &query.text);

        let fetched = self.fetch(search_id, &query, strategy, &token).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (results, from_cache) = match fetched {
            Ok(fetched) => fetched,
            Err(error) => {
                let outcome = self.finish_unsuccessful(search_id, error, duration_ms).await;
                return (outcome, None);
            }
        };

        if self.claim(search_id).await.is_none() {
            debug!(%search_id, "Search was cancelled before completing");
            return (cancelled_outcome(search_id, duration_ms), None);
        }

        self.emit(ResolutionEvent::SearchResults {
            search_id,
            results: results.clone(),
            duration_ms,
            from_cache,
        })
        .await;
        self.results.write().await.insert(search_id, results.clone());

        let resolution = match group {
            Some(context) => Some(self.match_group(search_id, &context, &query.text, &results).await),
            None => None,
        };

        self.statistics.write().await.record_search_completion(
            search_id,
            SearchStatus::Completed,
            results.len(),
            None,
        );
        metrics::SEARCHES_TOTAL
            .with_label_values(&[if from_cache { "cached" } else { "completed" }])
            .inc();
        metrics::SEARCH_DURATION
            .with_label_values(&[strategy.as_str()])
            .observe(started.elapsed().as_secs_f64());

        info!(
            %search_id,
            results = results.len(),
            from_cache,
            duration_ms,
            "Search completed"
        );
        let statistics = self.statistics().await;
        self.emit(ResolutionEvent::SearchCompleted {
            search_id,
            total_results: results.len(),
            duration_ms,
            statistics,
        })
        .await;

        let outcome = SearchOutcome {
            search_id,
            status: SearchStatus::Completed,
            results,
            from_cache,
            error: None,
            duration_ms,
        };
        (outcome, resolution)
    }

    /// Cached results, or the strategy run against the guarded catalog.
    async fn fetch(
        &self,
        search_id: Uuid,
        query: &SearchQuery,
        strategy: StrategyKind,
        token: &CancellationToken,
    ) -> Result<(Vec<CatalogEntry>, bool), ResolutionError> {
        let use_cache = self.config.cache.enabled && query.use_cache;
        let key = cache_key(&query.text, query.media_type, query.year);

        if use_cache {
            match self.cache.lookup(&key).await {
                CacheLookup::Hit(results) => {
                    metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                    self.statistics.write().await.record_cache_hit();
                    debug!(%search_id, %key, "Cache hit");
                    return Ok((results, true));
                }
                CacheLookup::Expired => {
                    metrics::CACHE_LOOKUPS.with_label_values(&["expired"]).inc();
                    let stats = self.cache.stats().await;
                    self.emit(ResolutionEvent::CacheUpdated {
                        operation: CacheOperation::Expire,
                        key: Some(key.clone()),
                        size: stats.size,
                        hit_rate: stats.hit_rate,
                    })
                    .await;
                }
                CacheLookup::Miss => {
                    metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                }
            }
        }

        let Some(catalog) = &self.catalog else {
            return Err(ResolutionError::CatalogUnavailable);
        };

        self.emit(ResolutionEvent::SearchProgress {
            search_id,
            current_item: 0,
            total_items: 1,
            current_query: query.text.clone(),
            status: SearchStatus::Searching,
            progress_percent: 0,
        })
        .await;

        let mut catalog_query = query.to_catalog_query(&self.config.language, self.config.max_results);
        catalog_query.include_adult |= self.config.include_adult;

        let guarded = GuardedCatalog::new(
            catalog.as_ref(),
            token,
            &self.config.retry,
            Duration::from_secs(self.config.request_timeout_secs),
            search_id,
            &self.active,
        );
        let result = self
            .strategies
            .get(strategy)
            .search(&guarded, &catalog_query)
            .await;
        self.statistics
            .write()
            .await
            .record_catalog_calls(guarded.calls());

        let results =
            result.map_err(|e| ResolutionError::from_catalog(&e, guarded.retries()))?;

        if use_cache {
            let size = self.cache.put(&key, results.clone()).await;
            let hit_rate = self.cache.hit_rate().await;
            self.emit(ResolutionEvent::CacheUpdated {
                operation: CacheOperation::Add,
                key: Some(key),
                size,
                hit_rate,
            })
            .await;
        }

        Ok((results, false))
    }

    /// Terminal handling for a failed or cancelled search.
    async fn finish_unsuccessful(
        &self,
        search_id: Uuid,
        error: ResolutionError,
        duration_ms: u64,
    ) -> SearchOutcome {
        let Some(search) = self.claim(search_id).await else {
            // cancel() already reported it
            return cancelled_outcome(search_id, duration_ms);
        };

        if error == ResolutionError::Cancelled {
            info!(%search_id, "Search cancelled by parent");
            self.record_cancelled(search_id, "cancelled", search.partial_results)
                .await;
            return cancelled_outcome(search_id, duration_ms);
        }

        warn!(
            %search_id,
            query = %search.query,
            error_type = error.error_type(),
            "Search failed: {}",
            error
        );
        self.statistics.write().await.record_search_completion(
            search_id,
            SearchStatus::Failed,
            0,
            Some(error.to_string()),
        );
        metrics::SEARCHES_TOTAL.with_label_values(&["failed"]).inc();

        self.emit(ResolutionEvent::SearchFailed {
            search_id,
            error_type: error.error_type().to_string(),
            error_message: error.to_string(),
            retry_count: error.retries(),
            max_retries: self.config.retry.effective_max_retries(),
        })
        .await;

        SearchOutcome {
            search_id,
            status: SearchStatus::Failed,
            results: Vec::new(),
            from_cache: false,
            error: Some(error),
            duration_ms,
        }
    }

    async fn record_cancelled(&self, search_id: Uuid, reason: &str, partial: Vec<CatalogEntry>) {
        self.statistics.write().await.record_search_completion(
            search_id,
            SearchStatus::Cancelled,
            partial.len(),
            Some(reason.to_string()),
        );
        metrics::SEARCHES_TOTAL.with_label_values(&["cancelled"]).inc();

        self.emit(ResolutionEvent::SearchCancelled {
            search_id,
            reason: reason.to_string(),
            partial_results: partial,
        })
        .await;
    }

    /// Remove a search from the registry. Only the caller that gets `Some`
    /// may emit the terminal event.
    async fn claim(&self, search_id: Uuid) -> Option<ActiveSearch> {
        self.active.write().await.remove(&search_id)
    }

    // =========================================================================
    // Matching
    // =========================================================================

    async fn match_group(
        &self,
        search_id: Uuid,
        context: &GroupContext<'_>,
        query: &str,
        results: &[CatalogEntry],
    ) -> Resolution {
        self.emit(ResolutionEvent::SearchProgress {
            search_id,
            current_item: 1,
            total_items: 1,
            current_query: query.to_string(),
            status: SearchStatus::Matching,
            progress_percent: 100,
        })
        .await;

        if context.auto_match {
            if let Some(found) = self.matcher.match_candidates(&context.target, results, true) {
                match self.validate_match(&context.target, &found) {
                    Ok(()) => {
                        self.accept_match(search_id, context.group_id, found.clone(), true)
                            .await;
                        return Resolution::Matched(found);
                    }
                    Err(e) => {
                        debug!(%search_id, group_id = context.group_id, "Best candidate rejected: {}", e);
                    }
                }
            }
        }

        let candidates: Vec<Candidate> = self
            .matcher
            .suggestions(&context.target, results, self.config.max_suggestions)
            .into_iter()
            .map(|(entry, score)| Candidate { entry, score })
            .collect();

        self.statistics.write().await.record_match(search_id, None);

        info!(
            %search_id,
            group_id = context.group_id,
            candidates = candidates.len(),
            "Manual selection required"
        );
        self.emit(ResolutionEvent::ManualSelectionRequested {
            search_id,
            group_id: context.group_id.to_string(),
            query: query.to_string(),
            candidates: candidates.clone(),
        })
        .await;

        Resolution::ManualSelectionRequired { candidates }
    }

    /// Check a match against the validation floors.
    pub fn validate_match(&self, target: &str, found: &Match) -> Result<(), ResolutionError> {
        self.matcher
            .validate(target, found)
            .map_err(ResolutionError::ValidationFailure)
    }

    async fn accept_match(&self, search_id: Uuid, group_id: &str, found: Match, auto_matched: bool) {
        self.group_matches
            .write()
            .await
            .insert(group_id.to_string(), found.clone());
        self.statistics.write().await.record_match(search_id, Some(&found));
        metrics::MATCH_SCORE
            .with_label_values(&[if auto_matched { "auto" } else { "manual" }])
            .observe(found.score);

        info!(
            %search_id,
            group_id,
            catalog_id = found.entry.id,
            title = %found.entry.title,
            confidence = %found.confidence,
            score = found.score,
            auto_matched,
            "Match found"
        );
        self.emit(ResolutionEvent::MatchFound {
            search_id,
            group_id: group_id.to_string(),
            matched: found,
            auto_matched,
        })
        .await;
    }

    /// Record the user's pick for a group.
    pub async fn manual_select(
        &self,
        search_id: Uuid,
        group_id: &str,
        chosen: CatalogEntry,
    ) -> Match {
        let selected = Match {
            entry: chosen,
            confidence: ConfidenceLevel::High,
            score: MANUAL_SELECTION_SCORE,
            criteria: vec!["manual_selection".to_string()],
            alternatives: Vec::new(),
        };

        self.accept_match(search_id, group_id, selected.clone(), false)
            .await;
        self.emit(ResolutionEvent::ManualSelectionCompleted {
            search_id,
            group_id: group_id.to_string(),
            selected: Some(selected.clone()),
            user_cancelled: false,
        })
        .await;

        selected
    }

    /// The user dismissed the selection for a group.
    pub async fn cancel_manual_selection(&self, search_id: Uuid, group_id: &str) {
        info!(%search_id, group_id, "Manual selection cancelled");
        self.emit(ResolutionEvent::ManualSelectionCompleted {
            search_id,
            group_id: group_id.to_string(),
            selected: None,
            user_cancelled: true,
        })
        .await;
    }

    // =========================================================================
    // Bulk resolution
    // =========================================================================

    /// Resolve groups one after another.
    pub async fn bulk_resolve(&self, groups: Vec<BulkGroup>, auto_match: bool) -> BulkOutcome {
        self.bulk_resolve_as(Uuid::new_v4(), groups, auto_match).await
    }

    /// [`bulk_resolve`](Self::bulk_resolve) under a caller-chosen id, so the
    /// caller can [`cancel`](Self::cancel) it while it runs.
    pub async fn bulk_resolve_as(
        &self,
        bulk_id: Uuid,
        groups: Vec<BulkGroup>,
        auto_match: bool,
    ) -> BulkOutcome {
        let started = Instant::now();
        let token = CancellationToken::new();
        self.bulks.write().await.insert(bulk_id, token.clone());

        let total_groups = groups.len();
        let delay = Duration::from_millis(self.config.rate_limit_delay_ms);

        info!(%bulk_id, total_groups, auto_match, "Bulk resolution started");
        self.emit(ResolutionEvent::BulkStarted {
            bulk_id,
            group_ids: groups.iter().map(|g| g.group_id.clone()).collect(),
            total_groups,
            strategy: self.config.default_strategy.to_string(),
        })
        .await;

        let mut outcome = BulkOutcome {
            bulk_id,
            total_groups,
            successful: 0,
            failed: 0,
            manual_required: 0,
            cancelled: false,
            duration_ms: 0,
            groups: Vec::with_capacity(total_groups),
        };

        for (index, group) in groups.iter().enumerate() {
            if token.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let resolved = self
                .resolve_group(group, auto_match, SearchType::Bulk, Some(&token))
                .await;

            let label = resolved.resolution.as_str();
            metrics::BULK_GROUPS.with_label_values(&[label]).inc();
            match &resolved.resolution {
                Resolution::Matched(_) => outcome.successful += 1,
                Resolution::ManualSelectionRequired { .. } => {
                    outcome.successful += 1;
                    outcome.manual_required += 1;
                }
                Resolution::Cancelled if token.is_cancelled() => {
                    outcome.cancelled = true;
                    outcome.groups.push(resolved);
                    break;
                }
                // a single group search cancelled on its own counts as failed
                Resolution::Failed(_) | Resolution::Cancelled => outcome.failed += 1,
            }
            outcome.groups.push(resolved);

            let processed = outcome.successful + outcome.failed;
            self.emit(ResolutionEvent::BulkProgress {
                bulk_id,
                current_group: index + 1,
                total_groups,
                current_group_id: group.group_id.clone(),
                completed_groups: outcome.successful,
                failed_groups: outcome.failed,
                progress_percent: percent(processed, total_groups),
            })
            .await;

            if index + 1 < total_groups && !delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => {
                        outcome.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.bulks.write().await.remove(&bulk_id);
        outcome.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            %bulk_id,
            successful = outcome.successful,
            failed = outcome.failed,
            manual_required = outcome.manual_required,
            cancelled = outcome.cancelled,
            duration_ms = outcome.duration_ms,
            "Bulk resolution finished"
        );
        let statistics = self.statistics().await;
        self.emit(ResolutionEvent::BulkCompleted {
            bulk_id,
            total_groups,
            successful_matches: outcome.successful,
            failed_searches: outcome.failed,
            manual_selections_required: outcome.manual_required,
            cancelled: outcome.cancelled,
            duration_ms: outcome.duration_ms,
            statistics,
        })
        .await;

        outcome
    }

    // =========================================================================
    // Cancellation and lifecycle
    // =========================================================================

    /// Cancel an active search or bulk. Returns false when nothing with this
    /// id is running.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let removed = self.active.write().await.remove(&id);
        if let Some(search) = removed {
            search.token.cancel();
            info!(search_id = %id, query = %search.query, "Search cancelled");
            self.record_cancelled(id, "cancelled by user", search.partial_results)
                .await;
            return true;
        }

        let bulk = self.bulks.write().await.remove(&id);
        if let Some(token) = bulk {
            token.cancel();
            info!(bulk_id = %id, "Bulk resolution cancelled");
            return true;
        }

        false
    }

    /// Drop every cached result.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Resolution cache cleared");
        self.emit(ResolutionEvent::CacheUpdated {
            operation: CacheOperation::Clear,
            key: None,
            size: 0,
            hit_rate: 0.0,
        })
        .await;
    }

    /// Cancel everything in flight and clear the cache.
    pub async fn dispose(&self) {
        let searches: Vec<Uuid> = self.active.read().await.keys().copied().collect();
        for id in searches {
            self.cancel(id).await;
        }

        let bulks: Vec<Uuid> = self.bulks.read().await.keys().copied().collect();
        for id in bulks {
            self.cancel(id).await;
        }

        self.clear_cache().await;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Results of a completed search.
    pub async fn search_results(&self, search_id: Uuid) -> Option<Vec<CatalogEntry>> {
        self.results.read().await.get(&search_id).cloned()
    }

    /// Accepted match of a group.
    pub async fn match_for_group(&self, group_id: &str) -> Option<Match> {
        self.group_matches.read().await.get(group_id).cloned()
    }

    pub async fn is_active(&self, search_id: Uuid) -> bool {
        self.active.read().await.contains_key(&search_id)
    }

    pub async fn active_searches(&self) -> Vec<Uuid> {
        self.active.read().await.keys().copied().collect()
    }

    pub async fn statistics(&self) -> StatisticsSnapshot {
        let hit_rate = self.cache.hit_rate().await;
        self.statistics.read().await.current_statistics(hit_rate)
    }

    pub async fn statistics_report(&self) -> StatisticsReport {
        let hit_rate = self.cache.hit_rate().await;
        self.statistics.read().await.export(hit_rate)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop statistics older than the configured retention.
    pub async fn clear_old_statistics(&self) -> usize {
        self.statistics
            .write()
            .await
            .clear_old(self.statistics_config.history_retention_days)
    }

    pub async fn reset_statistics(&self) {
        self.statistics.write().await.reset();
    }

    async fn emit(&self, event: ResolutionEvent) {
        if let Some(events) = &self.events {
            events.emit(event).await;
        }
    }
}

fn cancelled_outcome(search_id: Uuid, duration_ms: u64) -> SearchOutcome {
    SearchOutcome {
        search_id,
        status: SearchStatus::Cancelled,
        results: Vec::new(),
        from_cache: false,
        error: Some(ResolutionError::Cancelled),
        duration_ms,
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((done * 100) / total).min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::events::event_channel;
    use crate::testing::fixtures::{attack_on_titan, tv_entry};
    use crate::testing::MockCatalog;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.resolver.rate_limit_delay_ms = 0;
        config
    }

    fn service_with(catalog: &Arc<MockCatalog>) -> ResolutionService {
        let catalog: Arc<dyn MetadataCatalog> = catalog.clone();
        ResolutionService::new(&test_config(), Some(catalog))
    }

    #[tokio::test]
    async fn test_search_caches_results() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_results(vec![attack_on_titan()]).await;
        let service = service_with(&catalog);

        let first = service
            .search_by_title("Attack on Titan", MediaType::Tv, None)
            .await;
        assert!(first.is_completed());
        assert!(!first.from_cache);
        assert_eq!(first.results.len(), 1);

        let calls = catalog.call_count().await;
        let second = service
            .search_by_title("  attack ON titan ", MediaType::Tv, None)
            .await;
        assert!(second.from_cache);
        assert_eq!(second.results, first.results);
        assert_eq!(catalog.call_count().await, calls);

        let stats = service.statistics().await;
        assert_eq!(stats.total_searches, 2);
        assert_eq!(stats.cached_results, 1);
        assert_eq!(stats.cache_hit_rate, 0.5);
        assert_eq!(
            service.search_results(first.search_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_search_without_cache_calls_catalog() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_results(vec![attack_on_titan()]).await;
        let service = service_with(&catalog);

        let query = SearchQuery::new("Attack on Titan", MediaType::Tv).without_cache();
        service.search(query.clone(), StrategyKind::Exact).await;
        service.search(query, StrategyKind::Exact).await;

        assert_eq!(catalog.call_count().await, 2);
        assert_eq!(service.cache_stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_hit_rate_counts_cache_lookups_only() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_results(vec![attack_on_titan()]).await;
        let service = service_with(&catalog);

        service
            .search_by_title("Attack on Titan", MediaType::Tv, None)
            .await;
        service
            .search_by_title("Attack on Titan", MediaType::Tv, None)
            .await;
        let query = SearchQuery::new("Attack on Titan", MediaType::Tv).without_cache();
        service.search(query.clone(), StrategyKind::Exact).await;
        service.search(query, StrategyKind::Exact).await;

        let stats = service.statistics().await;
        assert_eq!(stats.total_searches, 4);
        assert_eq!(stats.cached_results, 1);
        // one hit out of two lookups; uncached searches never look up
        assert_eq!(stats.cache_hit_rate, 0.5);
        assert_eq!(service.cache_stats().await.lookups, 2);
    }

    #[tokio::test]
    async fn test_missing_catalog_fails() {
        let service = ResolutionService::new(&test_config(), None);
        let outcome = service
            .search_by_title("Attack on Titan", MediaType::Tv, None)
            .await;

        assert_eq!(outcome.status, SearchStatus::Failed);
        assert_eq!(outcome.error, Some(ResolutionError::CatalogUnavailable));
        assert!(service.active_searches().await.is_empty());
        assert_eq!(service.statistics().await.failed_searches, 1);
    }

    #[tokio::test]
    async fn test_group_auto_match() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_results(vec![attack_on_titan()]).await;
        let service = service_with(&catalog);

        let resolved = service
            .resolve_for_group("g1", "[SubsPlease] Attack on Titan 2013 (1080p)", true)
            .await;
        assert_eq!(resolved.query, "Attack on Titan 2013");

        let Resolution::Matched(found) = &resolved.resolution else {
            panic!("expected a match, got {:?}", resolved.resolution);
        };
        assert_eq!(found.entry.id, 1429);
        assert_eq!(service.match_for_group("g1").await.unwrap().entry.id, 1429);
    }

    #[tokio::test]
    async fn test_group_without_auto_match_offers_candidates() {
        let catalog = Arc::new(MockCatalog::new());
        let results: Vec<_> = (0..8)
            .map(|i| tv_entry(i, &format!("Titan {}", i), "", "2013-01-01"))
            .collect();
        catalog.set_results(results).await;
        let service = service_with(&catalog);

        let resolved = service.resolve_for_group("g1", "Titan", false).await;
        let Resolution::ManualSelectionRequired { candidates } = &resolved.resolution else {
            panic!("expected manual selection, got {:?}", resolved.resolution);
        };
        assert_eq!(candidates.len(), 5);
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(service.match_for_group("g1").await.is_none());
    }

    #[tokio::test]
    async fn test_manual_select_emits_events() {
        let catalog = Arc::new(MockCatalog::new());
        let (events, mut rx) = event_channel(64);
        let service = service_with(&catalog).with_events(events);

        let search_id = Uuid::new_v4();
        let selected = service
            .manual_select(search_id, "g1", attack_on_titan())
            .await;
        assert_eq!(selected.score, 0.95);
        assert_eq!(selected.confidence, ConfidenceLevel::High);
        assert_eq!(selected.criteria, vec!["manual_selection".to_string()]);

        let first = rx.recv().await.unwrap().event;
        assert!(matches!(
            first,
            ResolutionEvent::MatchFound { auto_matched: false, .. }
        ));
        let second = rx.recv().await.unwrap().event;
        assert!(matches!(
            second,
            ResolutionEvent::ManualSelectionCompleted { user_cancelled: false, .. }
        ));
        assert_eq!(service.match_for_group("g1").await.unwrap().score, 0.95);
    }

    #[tokio::test]
    async fn test_failure_reports_retries() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .fail_next(10, || CatalogError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            })
            .await;

        let mut config = test_config();
        config.resolver.retry.enabled = true;
        config.resolver.retry.max_retries = 2;
        config.resolver.retry.initial_backoff_ms = 1;
        let (events, mut rx) = event_channel(64);
        let dyn_catalog: Arc<dyn MetadataCatalog> = catalog.clone();
        let service = ResolutionService::new(&config, Some(dyn_catalog)).with_events(events);

        let query = SearchQuery::new("Bleach", MediaType::Tv);
        let outcome = service.search(query, StrategyKind::Exact).await;
        assert_eq!(outcome.status, SearchStatus::Failed);
        assert_eq!(catalog.call_count().await, 3);

        drop(service);
        let mut failed = None;
        while let Some(envelope) = rx.recv().await {
            if let ResolutionEvent::SearchFailed {
                error_type,
                retry_count,
                max_retries,
                ..
            } = envelope.event
            {
                failed = Some((error_type, retry_count, max_retries));
            }
        }
        assert_eq!(failed, Some(("api_error".to_string(), 2, 2)));
    }

    #[tokio::test]
    async fn test_cancel_unknown_id() {
        let catalog = Arc::new(MockCatalog::new());
        let service = service_with(&catalog);
        assert!(!service.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_dispose_clears_cache() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_results(vec![attack_on_titan()]).await;
        let service = service_with(&catalog);

        service
            .search_by_title("Attack on Titan", MediaType::Tv, None)
            .await;
        assert_eq!(service.cache_stats().await.size, 1);

        service.dispose().await;
        let stats = service.cache_stats().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(4, 4), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
