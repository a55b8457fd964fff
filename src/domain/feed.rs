use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parent syndication source of an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    /// Site the feed belongs to.
    pub url: String,
    /// Location of the feed document itself. Unique per store.
    pub feed_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: String,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
}

impl Feed {
    pub fn new(feed_url: String) -> Self {
        Self {
            id: 0,
            url: String::new(),
            feed_url: feed_url.trim().to_string(),
            title: None,
            description: None,
            favicon: String::new(),
            valid: true,
            created_at: Utc::now(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.feed_url)
    }

    pub fn summary(&self) -> FeedSummary {
        FeedSummary {
            id: self.id,
            title: self.display_title().to_string(),
            url: self.url.clone(),
            feed_url: self.feed_url.clone(),
            favicon: self.favicon.clone(),
            valid: self.valid,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedUpdate {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Read-only projection of a feed, attached to articles loaded with their feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSummary {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub feed_url: String,
    pub favicon: String,
    pub valid: bool,
}
