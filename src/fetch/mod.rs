// src/fetch/mod.rs

//! Fetching and extraction seams.
//!
//! The engine talks to the origin through the `ContentFetcher` trait and
//! turns raw HTML into Markdown through `ContentExtractor`. Both have one
//! production implementation; tests substitute their own.

mod extract;
mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PageContent, RemoteSummary};

pub use extract::DefaultExtractor;
pub use http::HttpFetcher;

/// Source of raw publication data.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the raw HTML of a publication page.
    async fn fetch_raw_content(&self, url: &str) -> Result<String>;

    /// Fetch and parse the publication listing.
    async fn fetch_publication_summaries(&self) -> Result<Vec<RemoteSummary>>;
}

/// Converts fetched HTML into Markdown page content.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, url: &str, html: &str) -> Result<PageContent>;
}
