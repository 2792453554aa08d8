//! Cache entry state and observable snapshots.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::api::ApiError;
use crate::domain::posts::{Post, PostPage};
use crate::query::key::QueryKey;

/// Errors are shared between the cache entry and every snapshot handed out.
pub type QueryError = Arc<ApiError>;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No entry exists for the key yet.
    Idle,
    /// A fetch is running and no earlier result is stored.
    Loading,
    /// The last fetch produced data.
    Success,
    /// The last fetch failed.
    Error,
}

/// Payload stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    Posts(Vec<Post>),
    Page(PostPage),
    Post(Post),
}

impl QueryData {
    pub fn as_posts(&self) -> Option<&[Post]> {
        match self {
            Self::Posts(posts) => Some(posts),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&PostPage> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(post) => Some(post),
            _ => None,
        }
    }

    /// Number of posts carried, for the cache overview.
    pub fn item_count(&self) -> usize {
        match self {
            Self::Posts(posts) => posts.len(),
            Self::Page(page) => page.posts.len(),
            Self::Post(_) => 1,
        }
    }
}

/// Monotonic counter bumped on every invalidation.
///
/// Fetches record the epoch they started under; a fetch that completes under
/// a later epoch stores its result already marked stale.
pub type Epoch = u64;

/// One slot in the query store.
///
/// `data` and `error` can coexist: a failed refetch keeps the last good data
/// so consumers can keep rendering it alongside the error.
#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub status: QueryStatus,
    pub data: Option<QueryData>,
    pub error: Option<QueryError>,
    /// Set when the entry needs a refetch. Stale data is still served.
    pub stale: bool,
    /// Epoch observed when the running fetch began.
    pub begun_epoch: Epoch,
    pub updated_at: Option<OffsetDateTime>,
}

impl QueryEntry {
    /// Fresh entry for a fetch that just started.
    pub fn loading(epoch: Epoch) -> Self {
        Self {
            status: QueryStatus::Loading,
            data: None,
            error: None,
            stale: false,
            begun_epoch: epoch,
            updated_at: None,
        }
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            stale: self.stale,
            is_previous_data: false,
            is_placeholder: false,
        }
    }
}

/// Immutable view of an entry at one point in time.
///
/// Snapshots are what views render from. `is_previous_data` and
/// `is_placeholder` are observer-level decorations; the store itself always
/// hands them out unset.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<QueryData>,
    pub error: Option<QueryError>,
    pub stale: bool,
    /// Data belongs to a previously watched key and a fetch for the current
    /// key is still running.
    pub is_previous_data: bool,
    /// Data was injected by the observer rather than fetched.
    pub is_placeholder: bool,
}

impl QuerySnapshot {
    /// Snapshot for a key with no entry.
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            stale: false,
            is_previous_data: false,
            is_placeholder: false,
        }
    }

    /// Settled snapshot wrapping already-fetched data, used by the one-shot
    /// commands that bypass the cache.
    pub fn success(data: QueryData) -> Self {
        Self {
            status: QueryStatus::Success,
            data: Some(data),
            error: None,
            stale: false,
            is_previous_data: false,
            is_placeholder: false,
        }
    }

    /// Whether the content shown is anything other than settled data for the
    /// watched key.
    pub fn is_provisional(&self) -> bool {
        self.is_previous_data
            || self.is_placeholder
            || matches!(self.status, QueryStatus::Idle | QueryStatus::Loading)
    }
}

/// One line of the cache overview.
#[derive(Debug, Clone)]
pub struct EntryOverview {
    pub key: QueryKey,
    pub status: QueryStatus,
    pub stale: bool,
    pub items: Option<usize>,
    pub updated_at: Option<OffsetDateTime>,
}
