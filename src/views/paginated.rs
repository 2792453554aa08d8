//! One page of the listing with a pager line.

use crate::domain::posts::PostPage;
use crate::query::{QueryData, QuerySnapshot, QueryStatus};

use super::describe_error;

pub fn render_post_page(snapshot: &QuerySnapshot) -> String {
    if snapshot.status == QueryStatus::Error {
        return format!("Could not load page: {}", describe_error(snapshot));
    }
    let Some(page) = snapshot.data.as_ref().and_then(QueryData::as_page) else {
        return String::from("Loading page...");
    };

    let mut lines = vec![format!("Page {}", page.page)];
    if snapshot.is_previous_data {
        lines.push(String::from("(previous data)"));
    }
    for post in &page.posts {
        lines.push(format!("{:>4}  {}", post.id, post.title));
    }
    lines.push(pager_line(page));
    lines.join("\n")
}

fn pager_line(page: &PostPage) -> String {
    let prev = page
        .previous_page
        .map_or_else(|| String::from("-"), |n| n.to_string());
    let next = page
        .next_page
        .map_or_else(|| String::from("-"), |n| n.to_string());
    format!("[prev: {prev}] [next: {next}]")
}
