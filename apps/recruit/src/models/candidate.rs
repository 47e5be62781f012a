use serde::{Deserialize, Serialize};

/// A person profile returned by people search, used as classifier input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub linkedin_url: String,
    pub title: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub text: Option<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, linkedin_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linkedin_url: linkedin_url.into(),
            title: None,
            highlights: Vec::new(),
            text: None,
        }
    }

    /// Sets the title; blank strings are stored as absent.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = non_blank(title.into());
        self
    }

    pub fn with_highlights(mut self, highlights: Vec<String>) -> Self {
        self.highlights = highlights;
        self
    }

    /// Sets the full profile text; blank strings are stored as absent.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = non_blank(text.into());
        self
    }

    /// Highlights joined the way they are written to CSV and prompts.
    pub fn joined_highlights(&self) -> String {
        self.highlights.join(HIGHLIGHT_SEPARATOR)
    }
}

/// Separator used between highlight snippets everywhere they are flattened.
pub const HIGHLIGHT_SEPARATOR: &str = " | ";

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
