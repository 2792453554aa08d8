//! Post wire types, pagination math, and id allocation.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Author id attached to every post created by this client.
pub const DEMO_AUTHOR_ID: i64 = 1;

/// A post as the REST API represents it.
///
/// The wire format is camelCase only for `userId`; the remaining fields are
/// single lowercase words. `body` and `userId` are optional on the wire
/// because seed databases frequently omit them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "userId", default)]
    pub user_id: i64,
}

/// User-authored fields of a post draft.
///
/// The client supplies `id` and `userId` at submission time; a draft only
/// carries what the compose form collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub body: String,
}

impl NewPost {
    /// Build a draft from raw form input, trimming both fields.
    pub fn new(title: &str, body: &str) -> Result<Self, DraftError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        Ok(Self {
            title: title.to_string(),
            body: body.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("title must not be empty")]
    EmptyTitle,
}

/// One page of posts as returned by the API, before link derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    pub items: Vec<Post>,
    /// Value of the `x-total-count` header, or the slice length when the
    /// header was absent.
    pub total_count: u64,
}

/// A page of posts with derived navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPage {
    pub page: u32,
    pub posts: Vec<Post>,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl PostPage {
    /// Derive page links from the page index, the page size used for the
    /// request, and the total-count signal.
    pub fn from_slice(page: u32, page_size: u32, slice: PageSlice) -> Self {
        Self {
            page,
            previous_page: previous_page(page),
            next_page: next_page(page, page_size, slice.total_count),
            posts: slice.items,
        }
    }
}

fn previous_page(page: u32) -> Option<u32> {
    (page > 1).then(|| page - 1)
}

// Strict bound: a final page that exactly exhausts the total must not offer
// a successor, so an exact multiple of the page size never yields an empty
// trailing page.
fn next_page(page: u32, page_size: u32, total_count: u64) -> Option<u32> {
    (u64::from(page) * u64::from(page_size) < total_count).then(|| page + 1)
}

/// Process-local allocator for post ids.
///
/// Seeded from the unix epoch in milliseconds and incremented per
/// allocation, so ids stay numeric for the wire contract while never
/// colliding within a process, even on the same millisecond.
#[derive(Debug)]
pub struct PostIdAllocator {
    next: AtomicI64,
}

impl PostIdAllocator {
    pub fn new() -> Self {
        let seed = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        Self {
            next: AtomicI64::new(seed),
        }
    }

    /// Hand out the next id; strictly increasing per allocator.
    pub fn allocate(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for PostIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
