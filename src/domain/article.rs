use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{DistillError, Result};
use crate::domain::{ArticleKey, FeedSummary};

/// Longest description an article may carry, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 240;

/// Image slots of an article. Always strings, empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Images {
    pub featured: String,
    pub banner: String,
    pub favicon: String,
    pub og: String,
}

/// Attachment descriptor (podcast audio, video, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub fingerprint: String,
    pub guid: Option<String>,
    pub link: Option<String>,
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub comment_url: String,
    pub images: Images,
    pub enclosures: Vec<Enclosure>,
    pub publication_date: DateTime<Utc>,
    pub likes: i64,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(feed_id: i64, fingerprint: &str, url: &str, title: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            feed_id,
            fingerprint: fingerprint.trim().to_string(),
            guid: None,
            link: None,
            url: url.trim().to_string(),
            title: title.trim().to_string(),
            description: String::new(),
            content: String::new(),
            comment_url: String::new(),
            images: Images::default(),
            enclosures: Vec::new(),
            publication_date: now,
            likes: 0,
            valid: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> ArticleKey {
        ArticleKey::new(self.feed_id, self.fingerprint.clone())
    }

    /// Check the invariants the store relies on before a record is persisted.
    pub fn validate(&self) -> Result<()> {
        if self.fingerprint.trim().is_empty() {
            return Err(DistillError::Validation("fingerprint is required".into()));
        }
        if self.url.trim().is_empty() {
            return Err(DistillError::Validation("url is required".into()));
        }
        if self.title.trim().is_empty() {
            return Err(DistillError::Validation(format!(
                "title is required ({})",
                self.url
            )));
        }
        let len = self.description.chars().count();
        if len > DESCRIPTION_MAX_CHARS {
            return Err(DistillError::Validation(format!(
                "description is {} characters, limit is {}",
                len, DESCRIPTION_MAX_CHARS
            )));
        }
        Ok(())
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Clip a description to [`DESCRIPTION_MAX_CHARS`] on a character boundary.
pub fn clip_description(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(DESCRIPTION_MAX_CHARS) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// An article loaded together with its feed, shaped for display.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub feed: FeedSummary,
}
