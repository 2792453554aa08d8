//! Full post listing.

use crate::query::{QueryData, QuerySnapshot, QueryStatus};

use super::describe_error;

pub fn render_post_list(snapshot: &QuerySnapshot) -> String {
    if snapshot.status == QueryStatus::Error {
        return format!("Could not load posts: {}", describe_error(snapshot));
    }
    let Some(posts) = snapshot.data.as_ref().and_then(QueryData::as_posts) else {
        return String::from("Loading posts...");
    };

    let mut lines = vec![format!("Posts ({})", posts.len())];
    if snapshot.is_placeholder {
        lines.push(String::from("(placeholder data)"));
    }
    for post in posts {
        lines.push(format!("{:>4}  {}", post.id, post.title));
    }
    lines.join("\n")
}
