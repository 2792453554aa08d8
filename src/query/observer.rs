//! Per-consumer presentation state layered over the cache.
//!
//! An observer watches one key at a time and decorates store snapshots with
//! previous-data retention and placeholder data. The store stays the single
//! source of truth for fetched results; the observer only decides what the
//! consumer gets to see while the watched key has nothing to show.

use std::future::Future;
use std::sync::Mutex;

use metrics::counter;
use tracing::debug;

use crate::api::ApiError;

use super::client::QueryClient;
use super::entry::{QueryData, QuerySnapshot, QueryStatus};
use super::key::QueryKey;
use super::lock::mutex_lock;

const SOURCE: &str = "query::observer";

const METRIC_QUERY_DISCARD_TOTAL: &str = "bacheca_query_discard_total";

pub struct QueryObserver {
    client: QueryClient,
    state: Mutex<ObserverState>,
}

struct ObserverState {
    key: Option<QueryKey>,
    /// Bumped on every key change. A refresh that completes under an older
    /// generation was superseded and must not touch presentation state.
    generation: u64,
    /// Last successful payload of a previously watched key.
    previous: Option<QueryData>,
    /// Injected payload served while the first load has nothing else.
    placeholder: Option<QueryData>,
    keep_previous_data: bool,
}

impl QueryObserver {
    pub fn new(client: QueryClient, keep_previous_data: bool) -> Self {
        Self {
            client,
            state: Mutex::new(ObserverState {
                key: None,
                generation: 0,
                previous: None,
                placeholder: None,
                keep_previous_data,
            }),
        }
    }

    /// Serve this payload as placeholder content while a first load is in
    /// flight and nothing else is available.
    pub fn with_placeholder(self, data: QueryData) -> Self {
        {
            let mut state = mutex_lock(&self.state, SOURCE, "with_placeholder");
            state.placeholder = Some(data);
        }
        self
    }

    /// Switch the observer to a new key.
    ///
    /// When retention is on, the old key's last successful payload is kept
    /// and served flagged `is_previous_data` until the new key's fetch lands.
    pub fn set_key(&self, key: QueryKey) {
        let mut state = mutex_lock(&self.state, SOURCE, "set_key");
        if state.key.as_ref() == Some(&key) {
            return;
        }
        if state.keep_previous_data
            && let Some(old) = &state.key
        {
            let old_snapshot = self.client.snapshot(old);
            if old_snapshot.status == QueryStatus::Success
                && let Some(data) = old_snapshot.data
            {
                state.previous = Some(data);
            }
        }
        state.generation = state.generation.wrapping_add(1);
        state.key = Some(key);
    }

    pub fn key(&self) -> Option<QueryKey> {
        mutex_lock(&self.state, SOURCE, "key").key.clone()
    }

    /// What the consumer should render right now, without fetching.
    pub fn snapshot(&self) -> QuerySnapshot {
        let state = mutex_lock(&self.state, SOURCE, "snapshot");
        self.snapshot_locked(&state)
    }

    /// Fetch the watched key (or join the in-flight fetch) and return the
    /// presentation snapshot for whatever key is active afterwards.
    ///
    /// If the key changed while the fetch was running, the result still
    /// lands in the store for its own key, but the presentation state is
    /// left to the newer generation; the discard is counted.
    pub async fn refresh<F, Fut>(&self, fetcher: F) -> QuerySnapshot
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<QueryData, ApiError>>,
    {
        let (key, generation) = {
            let state = mutex_lock(&self.state, SOURCE, "refresh.begin");
            match &state.key {
                Some(key) => (key.clone(), state.generation),
                None => return QuerySnapshot::idle(),
            }
        };

        let settled = self.client.fetch(&key, fetcher).await;

        let mut state = mutex_lock(&self.state, SOURCE, "refresh.complete");
        if state.generation != generation {
            counter!(METRIC_QUERY_DISCARD_TOTAL).increment(1);
            debug!(
                key = %key,
                begun_generation = generation,
                current_generation = state.generation,
                "Discarding superseded fetch result"
            );
            return self.snapshot_locked(&state);
        }
        if settled.status == QueryStatus::Success {
            state.previous = None;
        }
        self.snapshot_locked(&state)
    }

    fn snapshot_locked(&self, state: &ObserverState) -> QuerySnapshot {
        let base = match &state.key {
            Some(key) => self.client.snapshot(key),
            None => QuerySnapshot::idle(),
        };
        if base.data.is_some() {
            return base;
        }
        if let Some(previous) = state.previous.clone() {
            // An error for the new key outranks showing old data as success.
            let status = match base.status {
                QueryStatus::Error => QueryStatus::Error,
                _ => QueryStatus::Success,
            };
            return QuerySnapshot {
                status,
                data: Some(previous),
                error: base.error,
                stale: false,
                is_previous_data: true,
                is_placeholder: false,
            };
        }
        if matches!(base.status, QueryStatus::Idle | QueryStatus::Loading)
            && let Some(placeholder) = state.placeholder.clone()
        {
            return QuerySnapshot {
                status: QueryStatus::Success,
                data: Some(placeholder),
                error: None,
                stale: false,
                is_previous_data: false,
                is_placeholder: true,
            };
        }
        base
    }
}
