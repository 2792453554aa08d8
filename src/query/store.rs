//! Query cache storage.
//!
//! One LRU-bounded map from `QueryKey` to `QueryEntry`, plus the invalidation
//! epoch that stale-marks results of fetches begun before an invalidation.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use time::OffsetDateTime;
use tracing::debug;

use super::config::QueryConfig;
use super::entry::{EntryOverview, QueryData, QueryEntry, QueryError, QuerySnapshot, QueryStatus};
use super::key::{KeyPrefix, QueryKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "query::store";

/// Shared entry storage behind the query client.
///
/// All methods take `&self`; the LRU map is guarded by a poison-recovering
/// `RwLock` and the epoch is a plain atomic.
pub struct QueryStore {
    entries: RwLock<LruCache<QueryKey, QueryEntry>>,
    /// Bumped on every invalidation. Fetches stamp the epoch they start
    /// under; completing under a later epoch stores the result already stale.
    epoch: AtomicU64,
}

impl QueryStore {
    /// Create an empty store with the configured capacity.
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_slots_non_zero())),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Snapshot of the entry, or an idle snapshot when the key is absent.
    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        rw_write(&self.entries, SOURCE, "snapshot")
            .get(key)
            .map(QueryEntry::snapshot)
            .unwrap_or_else(QuerySnapshot::idle)
    }

    /// Snapshot of a settled, non-stale success, if one exists.
    pub fn fresh_snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let mut entries = rw_write(&self.entries, SOURCE, "fresh_snapshot");
        let entry = entries.get(key)?;
        (entry.status == QueryStatus::Success && !entry.stale).then(|| entry.snapshot())
    }

    /// Snapshot once the entry has settled. `None` while a fetch is still
    /// running or when the key is absent.
    pub fn settled_snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let mut entries = rw_write(&self.entries, SOURCE, "settled_snapshot");
        let entry = entries.get(key)?;
        matches!(entry.status, QueryStatus::Success | QueryStatus::Error)
            .then(|| entry.snapshot())
    }

    // ========================================================================
    // Fetch lifecycle
    // ========================================================================

    /// Record that a fetch for `key` has started.
    ///
    /// Existing data and error stay put so they remain visible during the
    /// refetch; status only regresses to `Loading` when the entry has no data
    /// to show.
    pub fn begin_loading(&self, key: &QueryKey) {
        let epoch = self.epoch();
        let mut entries = rw_write(&self.entries, SOURCE, "begin_loading");
        match entries.get_mut(key) {
            Some(entry) => {
                entry.begun_epoch = epoch;
                if entry.data.is_none() {
                    entry.status = QueryStatus::Loading;
                }
            }
            None => {
                entries.put(key.clone(), QueryEntry::loading(epoch));
            }
        }
    }

    /// Store a successful result and return the resulting snapshot.
    ///
    /// The result lands already stale when an invalidation happened after the
    /// fetch began, so the next consumer refetches instead of trusting it.
    pub fn complete_success(&self, key: &QueryKey, data: QueryData) -> QuerySnapshot {
        let epoch = self.epoch();
        let mut entries = rw_write(&self.entries, SOURCE, "complete_success");
        // Re-insert when the entry was evicted mid-flight.
        let entry = entries.get_or_insert_mut(key.clone(), || QueryEntry::loading(epoch));
        entry.status = QueryStatus::Success;
        entry.data = Some(data);
        entry.error = None;
        entry.stale = entry.begun_epoch != epoch;
        entry.updated_at = Some(OffsetDateTime::now_utc());
        entry.snapshot()
    }

    /// Store a failed result and return the resulting snapshot.
    ///
    /// Earlier data is kept so consumers can keep rendering it next to the
    /// error.
    pub fn complete_error(&self, key: &QueryKey, error: QueryError) -> QuerySnapshot {
        let epoch = self.epoch();
        let mut entries = rw_write(&self.entries, SOURCE, "complete_error");
        let entry = entries.get_or_insert_mut(key.clone(), || QueryEntry::loading(epoch));
        entry.status = QueryStatus::Error;
        entry.error = Some(error);
        entry.updated_at = Some(OffsetDateTime::now_utc());
        entry.snapshot()
    }

    /// Undo `begin_loading` after a fetch whose failure must stay invisible.
    ///
    /// Entries that were serving data never regressed, so they are left
    /// alone. A `Loading` entry falls back to its prior error, or is removed
    /// entirely when the prefetch created it.
    pub fn roll_back_loading(&self, key: &QueryKey) {
        let mut entries = rw_write(&self.entries, SOURCE, "roll_back_loading");
        let remove = match entries.get_mut(key) {
            Some(entry) if entry.status == QueryStatus::Loading => {
                if entry.error.is_some() {
                    entry.status = QueryStatus::Error;
                    false
                } else {
                    true
                }
            }
            _ => false,
        };
        if remove {
            entries.pop(key);
        }
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Mark every entry under `prefix` stale and bump the epoch.
    ///
    /// Returns the number of entries marked. Stale entries keep serving
    /// their data until the next fetch replaces it.
    pub fn invalidate(&self, prefix: &KeyPrefix) -> usize {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate");
        let mut marked = 0;
        for (key, entry) in entries.iter_mut() {
            if key.matches(prefix) {
                entry.stale = true;
                marked += 1;
            }
        }
        debug!(prefix = ?prefix, marked, epoch, "Marked cache entries stale");
        marked
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Per-entry summary, most recently used first.
    pub fn overview(&self) -> Vec<EntryOverview> {
        rw_read(&self.entries, SOURCE, "overview")
            .iter()
            .map(|(key, entry)| EntryOverview {
                key: key.clone(),
                status: entry.status,
                stale: entry.stale,
                items: entry.data.as_ref().map(QueryData::item_count),
                updated_at: entry.updated_at,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
