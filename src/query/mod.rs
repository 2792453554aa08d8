//! Bacheca Query Cache
//!
//! Client-side cache for the posts API:
//!
//! - **Store**: LRU-bounded entries keyed by [`QueryKey`], stale-marked on
//!   invalidation instead of dropped
//! - **Client**: fetch with request deduplication, prefix invalidation,
//!   prefetch, bounded retry
//! - **Observer**: per-consumer presentation on top of the store
//!   (previous-data retention, placeholders, superseded-fetch discard)
//! - **Mutation**: ordered hook lifecycle around write operations
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `bacheca.toml`:
//!
//! ```toml
//! [query]
//! keep_previous_data = true
//! entry_slots = 128
//! # ... see config.rs for all options
//! ```

mod client;
mod config;
mod entry;
mod inflight;
mod key;
mod lock;
mod mutation;
mod observer;
mod retry;
mod store;

pub use client::QueryClient;
pub use config::QueryConfig;
pub use entry::{EntryOverview, QueryData, QueryEntry, QueryError, QuerySnapshot, QueryStatus};
pub use key::{KeyPrefix, QueryKey};
pub use mutation::{Mutation, MutationOutcome, MutationState};
pub use observer::QueryObserver;
pub use retry::RetryPolicy;
pub use store::QueryStore;
