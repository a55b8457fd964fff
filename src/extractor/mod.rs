//! Boundary adapter over the external content-extraction service.
//!
//! The service turns a raw article URL into readable content. Callers only
//! see [`ExtractedContent`] on success and a single [`ExtractionFailure`]
//! type for every kind of failure; there is no retry at this layer.

mod config;
pub mod http_extractor;

pub use config::ExtractorConfig;
pub use http_extractor::HttpExtractor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Structured content returned by the extractor. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub title: Option<String>,
    pub lead_image_url: Option<String>,
    pub date_published: Option<DateTime<Utc>>,
}

/// Why an extraction failed.
#[derive(Debug, Error)]
pub enum ExtractCause {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

/// Any failure to extract `url`, carrying the underlying cause.
#[derive(Debug, Error)]
#[error("extraction failed for {url}: {cause}")]
pub struct ExtractionFailure {
    pub url: String,
    #[source]
    pub cause: ExtractCause,
}

impl ExtractionFailure {
    pub fn new(url: &str, cause: impl Into<ExtractCause>) -> Self {
        Self {
            url: url.to_string(),
            cause: cause.into(),
        }
    }
}

#[async_trait]
pub trait Extractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractionFailure>;
}
