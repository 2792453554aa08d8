//! Structural cache keys.
//!
//! Defines `QueryKey` for cache slots and `KeyPrefix` for bulk invalidation.

use std::fmt;

/// Identifies one cache slot.
///
/// Keys are structural: two keys built from equal values address the same
/// entry, with equality and hashing derived from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The full post listing.
    Posts,
    /// One page of the post listing.
    PostsPage { page: u32 },
    /// A single post's detail record.
    Post { id: i64 },
}

impl QueryKey {
    /// Whether this key falls under the given invalidation prefix.
    pub fn matches(&self, prefix: &KeyPrefix) -> bool {
        match prefix {
            KeyPrefix::Posts => matches!(self, Self::Posts | Self::PostsPage { .. }),
            KeyPrefix::Post(id) => matches!(self, Self::Post { id: own } if own == id),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posts => write!(f, "posts"),
            Self::PostsPage { page } => write!(f, "posts?page={page}"),
            Self::Post { id } => write!(f, "post/{id}"),
        }
    }
}

/// Selects a key family for bulk operations.
///
/// `Posts` covers the listing and every page of it; detail records are
/// addressed one id at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPrefix {
    Posts,
    Post(i64),
}
