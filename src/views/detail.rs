//! Single post detail.

use crate::query::{QueryData, QuerySnapshot, QueryStatus};

use super::describe_error;

pub fn render_post_detail(snapshot: &QuerySnapshot) -> String {
    if snapshot.status == QueryStatus::Error {
        return format!("Could not load post: {}", describe_error(snapshot));
    }
    let Some(post) = snapshot.data.as_ref().and_then(QueryData::as_post) else {
        return String::from("Loading post...");
    };

    let mut lines = vec![
        post.title.clone(),
        format!("#{} by user {}", post.id, post.user_id),
    ];
    if !post.body.is_empty() {
        lines.push(String::new());
        lines.push(post.body.clone());
    }
    lines.join("\n")
}
