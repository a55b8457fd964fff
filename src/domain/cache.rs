use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Enclosure;

/// Resolved, readable content for one URL.
///
/// Entries are created once per URL and never updated; the cache is a
/// memoization table keyed by `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: String,
    pub publication_date: DateTime<Utc>,
    pub comment_url: String,
    pub enclosures: Vec<Enclosure>,
}
