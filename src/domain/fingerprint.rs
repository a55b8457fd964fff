//! Per-feed identity for ingested items.
//!
//! A fingerprint is the best uniqueness signal available for an item. Paired
//! with the owning feed it forms the [`ArticleKey`] the store enforces as
//! unique. Feeds are inconsistent about `guid` and `link`, so selection walks
//! a fixed preference order and falls back to hashing payload fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity signals collected for one feed item.
#[derive(Debug, Clone, Default)]
pub struct IdentitySignals {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub url: Option<String>,
    /// Feed-specific fields (title, description, ...) used when nothing
    /// better is available.
    pub payload: Vec<String>,
}

impl IdentitySignals {
    pub fn fingerprint(&self) -> Option<String> {
        if let Some(guid) = non_blank(self.guid.as_deref()) {
            return Some(format!("guid:{guid}"));
        }
        if let Some(link) = non_blank(self.link.as_deref()) {
            return Some(format!("link:{link}"));
        }
        if let Some(url) = non_blank(self.url.as_deref()) {
            return Some(format!("url:{url}"));
        }

        let fields: Vec<&str> = self
            .payload
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            return None;
        }

        Some(format!("payload:{}", hash_fields(&fields)))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn hash_fields(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.join("\n").as_bytes());
    hex::encode(hasher.finalize())
}

/// Uniqueness key of an article: unique together within the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleKey {
    pub feed_id: i64,
    pub fingerprint: String,
}

impl ArticleKey {
    pub fn new(feed_id: i64, fingerprint: impl Into<String>) -> Self {
        Self {
            feed_id,
            fingerprint: fingerprint.into(),
        }
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.feed_id, self.fingerprint)
    }
}
