//! Shared error type for the scrape pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid novel slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "index page", "chapter 5").
        context: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("Index page has no chapter links (layout change or wrong slug?): {url}")]
    EmptyChapterList { url: String },

    #[error("Failed to write {path}: {source}")]
    Output { path: PathBuf, source: std::io::Error },

    #[error("Failed to serialize scrape result: {source}")]
    Serialize { source: serde_json::Error },
}
