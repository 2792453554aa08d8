//! All loaded pages concatenated into one feed.

use crate::query::{QueryData, QuerySnapshot, QueryStatus};

use super::describe_error;

/// Render the pages loaded so far, in order.
///
/// Pages still loading or failed render as a line in place; a `more` hint is
/// shown while the last settled page links to a successor.
pub fn render_post_feed(pages: &[QuerySnapshot]) -> String {
    if pages.is_empty() {
        return String::from("Loading feed...");
    }

    let mut lines = vec![format!("Feed ({} pages)", pages.len())];
    let mut more = false;
    for snapshot in pages {
        if snapshot.status == QueryStatus::Error {
            lines.push(format!("Could not load more: {}", describe_error(snapshot)));
            more = false;
            continue;
        }
        match snapshot.data.as_ref().and_then(QueryData::as_page) {
            Some(page) => {
                for post in &page.posts {
                    lines.push(format!("{:>4}  {}", post.id, post.title));
                }
                more = page.next_page.is_some();
            }
            None => lines.push(String::from("(loading...)")),
        }
    }
    if more {
        lines.push(String::from("-- more available --"));
    }
    lines.join("\n")
}
