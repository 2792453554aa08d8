//! In-flight fetch tracking for request deduplication.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use super::key::QueryKey;

/// Tracks keys that currently have a fetch running.
///
/// The first caller for a key becomes the leader and owns a [`FetchGuard`];
/// later callers get a receiver that resolves once the leader's guard drops.
#[derive(Default, Clone)]
pub(crate) struct InFlightFetches {
    fetches: Arc<DashMap<QueryKey, watch::Receiver<bool>>>,
}

/// Outcome of trying to start a fetch for a key.
pub(crate) enum FetchSlot {
    /// Caller owns the fetch and must settle the store before the guard
    /// drops.
    Leader(FetchGuard),
    /// A fetch is already running; await the receiver and re-read the store.
    Joiner(watch::Receiver<bool>),
}

impl InFlightFetches {
    pub(crate) fn new() -> Self {
        Self {
            fetches: Arc::new(DashMap::new()),
        }
    }

    pub(crate) fn acquire(&self, key: &QueryKey) -> FetchSlot {
        use dashmap::mapref::entry::Entry;

        match self.fetches.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                let (done, receiver) = watch::channel(false);
                vacant.insert(receiver);
                FetchSlot::Leader(FetchGuard {
                    key: key.clone(),
                    fetches: Arc::clone(&self.fetches),
                    done,
                })
            }
            Entry::Occupied(occupied) => FetchSlot::Joiner(occupied.get().clone()),
        }
    }
}

pub(crate) struct FetchGuard {
    key: QueryKey,
    fetches: Arc<DashMap<QueryKey, watch::Receiver<bool>>>,
    done: watch::Sender<bool>,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        // Free the key before waking joiners so a woken caller that still
        // needs a fetch becomes the next leader instead of joining a
        // finished one.
        self.fetches.remove(&self.key);
        let _ = self.done.send(true);
    }
}
