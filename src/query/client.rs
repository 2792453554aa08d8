//! Query client: fetch, dedup, invalidate, prefetch.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::api::ApiError;

use super::config::QueryConfig;
use super::entry::{EntryOverview, QueryData, QueryError, QuerySnapshot};
use super::inflight::{FetchSlot, InFlightFetches};
use super::key::{KeyPrefix, QueryKey};
use super::retry::RetryPolicy;
use super::store::QueryStore;

const METRIC_QUERY_HIT_TOTAL: &str = "bacheca_query_hit_total";
const METRIC_QUERY_FETCH_TOTAL: &str = "bacheca_query_fetch_total";
const METRIC_QUERY_JOIN_TOTAL: &str = "bacheca_query_join_total";
const METRIC_QUERY_INVALIDATE_TOTAL: &str = "bacheca_query_invalidate_total";

/// Handle to one query cache.
///
/// An explicit value rather than a process-wide singleton: whoever constructs
/// it decides how far it is shared. Clones are cheap and address the same
/// entries.
#[derive(Clone)]
pub struct QueryClient {
    store: Arc<QueryStore>,
    inflight: InFlightFetches,
    retry: RetryPolicy,
}

impl QueryClient {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            store: Arc::new(QueryStore::new(config)),
            inflight: InFlightFetches::new(),
            retry: config.retry_policy(),
        }
    }

    /// Current snapshot without triggering any fetch.
    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        self.store.snapshot(key)
    }

    /// Return fresh cached data for `key`, fetching it if necessary.
    ///
    /// Concurrent calls for one key perform exactly one underlying request:
    /// the first caller leads, the rest join its result. Fetch failures are
    /// recorded on the entry and returned in the snapshot, never panicked.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QuerySnapshot
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<QueryData, ApiError>>,
    {
        loop {
            if let Some(snapshot) = self.store.fresh_snapshot(key) {
                counter!(METRIC_QUERY_HIT_TOTAL).increment(1);
                return snapshot;
            }

            match self.inflight.acquire(key) {
                FetchSlot::Leader(guard) => {
                    counter!(METRIC_QUERY_FETCH_TOTAL).increment(1);
                    self.store.begin_loading(key);
                    let snapshot = match self.run_with_retry(&fetcher).await {
                        Ok(data) => self.store.complete_success(key, data),
                        Err(error) => {
                            debug!(key = %key, error = %error, "Fetch failed");
                            let shared: QueryError = Arc::new(error);
                            self.store.complete_error(key, shared)
                        }
                    };
                    drop(guard);
                    return snapshot;
                }
                FetchSlot::Joiner(mut receiver) => {
                    counter!(METRIC_QUERY_JOIN_TOTAL).increment(1);
                    let _ = receiver.wait_for(|done| *done).await;
                    if let Some(snapshot) = self.store.settled_snapshot(key) {
                        return snapshot;
                    }
                    // The leader rolled back (failed prefetch) or the entry
                    // was evicted; take another turn.
                }
            }
        }
    }

    /// Warm the cache for `key` without surfacing failures.
    ///
    /// A no-op when the entry is already fresh or being fetched. On failure
    /// the entry rolls back to its prior serveable state.
    pub async fn prefetch<F, Fut>(&self, key: &QueryKey, fetcher: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<QueryData, ApiError>>,
    {
        if self.store.fresh_snapshot(key).is_some() {
            return;
        }
        match self.inflight.acquire(key) {
            FetchSlot::Leader(guard) => {
                counter!(METRIC_QUERY_FETCH_TOTAL).increment(1);
                self.store.begin_loading(key);
                match self.run_with_retry(&fetcher).await {
                    Ok(data) => {
                        self.store.complete_success(key, data);
                    }
                    Err(error) => {
                        debug!(key = %key, error = %error, "Prefetch failed; keeping prior state");
                        self.store.roll_back_loading(key);
                    }
                }
                drop(guard);
            }
            // Someone is already fetching it; nothing to warm.
            FetchSlot::Joiner(_) => {}
        }
    }

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    pub fn invalidate(&self, prefix: &KeyPrefix) -> usize {
        counter!(METRIC_QUERY_INVALIDATE_TOTAL).increment(1);
        self.store.invalidate(prefix)
    }

    /// Per-entry summary for the `cache` shell command.
    pub fn overview(&self) -> Vec<EntryOverview> {
        self.store.overview()
    }

    async fn run_with_retry<F, Fut>(&self, fetcher: &F) -> Result<QueryData, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<QueryData, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(data) => return Ok(data),
                Err(error) => {
                    if !self.retry.should_retry(attempt, &error) {
                        return Err(error);
                    }
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying failed fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
