//! Compose form state and rendering.

use crate::domain::posts::{DraftError, NewPost};

/// Draft state for the compose screen. Owned by the shell, rendered here.
#[derive(Debug, Clone, Default)]
pub struct ComposeForm {
    pub title: String,
    pub body: String,
    /// A submission is in flight; the form cannot be submitted again.
    pub submitting: bool,
    /// Validation or submission feedback shown under the fields.
    pub error: Option<String>,
}

impl ComposeForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn the current fields into a validated draft.
    pub fn draft(&self) -> Result<NewPost, DraftError> {
        NewPost::new(&self.title, &self.body)
    }
}

pub fn render_compose(form: &ComposeForm) -> String {
    let mut lines = vec![
        String::from("Compose new post"),
        format!("  title: {}", field(&form.title)),
        format!("  body:  {}", field(&form.body)),
    ];
    if let Some(error) = &form.error {
        lines.push(format!("error: {error}"));
    }
    if form.submitting {
        lines.push(String::from("submitting..."));
    } else {
        lines.push(String::from("submit to publish, cancel to discard"));
    }
    lines.join("\n")
}

fn field(value: &str) -> &str {
    if value.is_empty() { "(empty)" } else { value }
}
