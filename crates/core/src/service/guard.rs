//! Catalog wrapper applying timeout, retries and cancellation to every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::ActiveSearch;
use crate::catalog::{CatalogEntry, CatalogError, CatalogQuery, MetadataCatalog};
use crate::config::RetryConfig;
use crate::metrics;

/// Wraps the real catalog for the duration of one search.
///
/// Results of each successful call are appended to the search's partial
/// results in the active-search registry, so a cancellation can report them.
pub(crate) struct GuardedCatalog<'a> {
    inner: &'a dyn MetadataCatalog,
    token: &'a CancellationToken,
    retry: &'a RetryConfig,
    timeout: Duration,
    search_id: Uuid,
    active: &'a RwLock<HashMap<Uuid, ActiveSearch>>,
    calls: AtomicU64,
    retries: AtomicU32,
}

impl<'a> GuardedCatalog<'a> {
    pub(crate) fn new(
        inner: &'a dyn MetadataCatalog,
        token: &'a CancellationToken,
        retry: &'a RetryConfig,
        timeout: Duration,
        search_id: Uuid,
        active: &'a RwLock<HashMap<Uuid, ActiveSearch>>,
    ) -> Self {
        Self {
            inner,
            token,
            retry,
            timeout,
            search_id,
            active,
            calls: AtomicU64::new(0),
            retries: AtomicU32::new(0),
        }
    }

    /// Catalog requests issued so far, retries included.
    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Retries performed so far.
    pub(crate) fn retries(&self) -> u32 {
        self.retries.load(Ordering::Relaxed)
    }

    async fn attempt(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CatalogError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.inner.search(query)) => match result {
                Ok(result) => result,
                Err(_) => Err(CatalogError::Timeout(self.timeout.as_millis() as u64)),
            },
        };

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.error_type(),
        };
        metrics::CATALOG_REQUESTS.with_label_values(&[status]).inc();
        result
    }

    async fn record_partial(&self, entries: &[CatalogEntry]) {
        let mut active = self.active.write().await;
        if let Some(search) = active.get_mut(&self.search_id) {
            for entry in entries {
                if !search.partial_results.iter().any(|e| e.id == entry.id) {
                    search.partial_results.push(entry.clone());
                }
            }
        }
    }
}

#[async_trait]
impl MetadataCatalog for GuardedCatalog<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        let max_retries = self.retry.effective_max_retries();
        let mut attempt = 0;

        loop {
            if self.token.is_cancelled() {
                return Err(CatalogError::Cancelled);
            }

            match self.attempt(query).await {
                Ok(entries) => {
                    debug!(
                        catalog = self.inner.name(),
                        query = %query.text,
                        results = entries.len(),
                        "Catalog call succeeded"
                    );
                    self.record_partial(&entries).await;
                    return Ok(entries);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    metrics::CATALOG_RETRIES.inc();

                    let backoff = Duration::from_millis(self.retry.backoff_ms(attempt));
                    warn!(
                        catalog = self.inner.name(),
                        query = %query.text,
                        attempt,
                        max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Catalog call failed, retrying: {}",
                        e
                    );

                    tokio::select! {
                        _ = self.token.cancelled() => return Err(CatalogError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
