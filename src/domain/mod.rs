pub mod article;
pub mod cache;
pub mod feed;
pub mod fingerprint;

pub use article::{clip_description, Article, ArticleView, Enclosure, Images, DESCRIPTION_MAX_CHARS};
pub use cache::CacheEntry;
pub use feed::{Feed, FeedSummary, FeedUpdate};
pub use fingerprint::{ArticleKey, IdentitySignals};
