pub mod registry;
pub mod sqlite;

use crate::app::Result;
use crate::domain::{Article, ArticleKey, ArticleView, CacheEntry, Feed, FeedUpdate};

pub use sqlite::SqliteStore;

pub trait Store {
    // Feed operations
    fn add_feed(&self, feed: &Feed) -> Result<i64>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, feed_url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;
    fn update_feed(&self, id: i64, update: &FeedUpdate) -> Result<()>;

    // Article operations
    fn add_article(&self, article: &Article) -> Result<i64>;
    fn add_articles(&self, articles: &[Article]) -> Result<usize>;
    fn get_article(&self, id: i64) -> Result<Option<Article>>;
    fn get_article_by_key(&self, key: &ArticleKey) -> Result<Option<Article>>;
    fn get_articles_by_url(&self, url: &str) -> Result<Vec<Article>>;
    fn get_articles_by_feed(&self, feed_id: i64) -> Result<Vec<Article>>;
    fn get_all_articles(&self) -> Result<Vec<Article>>;
    fn get_article_view(&self, id: i64) -> Result<Option<ArticleView>>;
    fn set_article_valid(&self, id: i64, valid: bool) -> Result<()>;
    fn like_article(&self, id: i64) -> Result<i64>;
    fn count_articles(&self) -> Result<i64>;
}

/// Memoization table of resolved content, keyed by exact URL.
pub trait CacheStore {
    /// Exact-match lookup. URLs are compared byte for byte.
    fn lookup(&self, url: &str) -> Result<Option<CacheEntry>>;

    /// Create an entry, or fail with `DistillError::DuplicateKey` when one
    /// already exists for the URL.
    fn insert(&self, entry: &CacheEntry) -> Result<()>;

    fn count(&self) -> Result<i64>;
}
