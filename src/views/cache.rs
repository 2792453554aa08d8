//! Cache entry dump for the `cache` shell command.

use time::format_description::well_known::Rfc3339;

use crate::query::{EntryOverview, QueryStatus};

pub fn render_cache_overview(entries: &[EntryOverview]) -> String {
    if entries.is_empty() {
        return String::from("Cache is empty");
    }

    let mut lines = vec![format!("Cache entries ({})", entries.len())];
    for entry in entries {
        lines.push(format!(
            "{:<16}  {:<8}  {:<6}  {:>5}  {}",
            entry.key.to_string(),
            status_word(entry.status),
            if entry.stale { "stale" } else { "fresh" },
            entry
                .items
                .map_or_else(|| String::from("-"), |n| n.to_string()),
            entry
                .updated_at
                .and_then(|at| at.format(&Rfc3339).ok())
                .unwrap_or_else(|| String::from("-")),
        ));
    }
    lines.join("\n")
}

fn status_word(status: QueryStatus) -> &'static str {
    match status {
        QueryStatus::Idle => "idle",
        QueryStatus::Loading => "loading",
        QueryStatus::Success => "success",
        QueryStatus::Error => "error",
    }
}
