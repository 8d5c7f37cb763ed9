//! Extracted page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Markdown content extracted from a fetched publication page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContent {
    /// Extracted Markdown text
    pub markdown: String,

    /// Extraction metadata
    pub metadata: PageMetadata,
}

/// Metadata produced alongside extracted Markdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMetadata {
    /// Page title, if one could be determined
    pub title: Option<String>,

    /// The URL the content was fetched from
    pub source_url: String,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,

    /// Word count of the extracted Markdown
    pub word_count: usize,
}

impl PageContent {
    /// Create content with metadata derived from the Markdown text.
    pub fn new(markdown: String, title: Option<String>, source_url: &str) -> Self {
        let word_count = markdown.split_whitespace().count();
        Self {
            markdown,
            metadata: PageMetadata {
                title,
                source_url: source_url.to_string(),
                fetched_at: Utc::now(),
                word_count,
            },
        }
    }
}
