//! Text views over query snapshots.
//!
//! Every renderer is a pure function from a snapshot to a `String`; the shell
//! decides when to print. Each view walks the same three-way state machine:
//! a loading line while nothing is showable, the error on `Error`, the data
//! on `Success`.

pub mod cache;
pub mod compose;
pub mod detail;
pub mod infinite;
pub mod list;
pub mod paginated;

pub use cache::render_cache_overview;
pub use compose::{ComposeForm, render_compose};
pub use detail::render_post_detail;
pub use infinite::render_post_feed;
pub use list::render_post_list;
pub use paginated::render_post_page;

use crate::query::QuerySnapshot;

fn describe_error(snapshot: &QuerySnapshot) -> String {
    snapshot
        .error
        .as_deref()
        .map_or_else(|| String::from("unknown error"), ToString::to_string)
}
