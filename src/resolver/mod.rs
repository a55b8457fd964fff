//! Content resolution: turn an article into cached, readable content.
//!
//! ```text
//! Article → cache lookup ─hit──────────────────────────────→ CacheEntry
//!                        └miss→ Extractor → overrides → fallbacks → insert
//! ```
//!
//! Resolution is memoized per URL and never revisited: once a URL has an
//! entry, that entry is returned as-is for the lifetime of the cache. The
//! cache's create-or-fail insert is the only concurrency control. Two callers
//! racing on the same URL may both extract, but only one insert wins and the
//! other returns the winner's entry.

mod config;
pub mod overrides;
pub mod parallel;

pub use config::ResolverConfig;
pub use overrides::{ContentFields, OverrideAction, OverrideRule, OverrideTable};
pub use parallel::ParallelResolver;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::DistillError;
use crate::domain::{Article, CacheEntry};
use crate::extractor::{ExtractCause, ExtractedContent, ExtractionFailure, Extractor};
use crate::store::CacheStore;

/// Outcome of a resolution that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(CacheEntry),
    /// Extraction worked but no title could be derived. Permanent for the
    /// URL; nothing is cached.
    Unresolvable { url: String },
}

impl Resolution {
    pub fn entry(&self) -> Option<&CacheEntry> {
        match self {
            Resolution::Resolved(entry) => Some(entry),
            Resolution::Unresolvable { .. } => None,
        }
    }

    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            Resolution::Resolved(entry) => Some(entry),
            Resolution::Unresolvable { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Failures that may succeed on a later attempt.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    ExtractionFailed(#[from] ExtractionFailure),

    #[error("store unavailable while resolving {url}: {source}")]
    StoreUnavailable {
        url: String,
        #[source]
        source: DistillError,
    },
}

impl ResolveError {
    pub fn url(&self) -> &str {
        match self {
            ResolveError::ExtractionFailed(failure) => &failure.url,
            ResolveError::StoreUnavailable { url, .. } => url,
        }
    }

    fn store(url: &str, source: DistillError) -> Self {
        ResolveError::StoreUnavailable {
            url: url.to_string(),
            source,
        }
    }
}

pub struct Resolver {
    cache: Arc<dyn CacheStore + Send + Sync>,
    extractor: Arc<dyn Extractor + Send + Sync>,
    overrides: OverrideTable,
    extract_timeout: Duration,
}

impl Resolver {
    pub fn new(
        cache: Arc<dyn CacheStore + Send + Sync>,
        extractor: Arc<dyn Extractor + Send + Sync>,
    ) -> Self {
        Self {
            cache,
            extractor,
            overrides: OverrideTable::default(),
            extract_timeout: ResolverConfig::default().extract_timeout(),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    /// Resolve readable content for `article`, reusing the cached entry for
    /// its URL when one exists. The article itself is never modified.
    pub async fn resolve(&self, article: &Article) -> Result<Resolution, ResolveError> {
        let url = article.url.as_str();

        if let Some(cached) = self
            .cache
            .lookup(url)
            .map_err(|e| ResolveError::store(url, e))?
        {
            debug!(url, "Cache hit");
            return Ok(Resolution::Resolved(cached));
        }

        let extracted = self.extract(url).await.inspect_err(|e| {
            warn!(url, error = %e.cause, "Extraction failed");
        })?;

        let Some(entry) = self.build_entry(article, extracted) else {
            info!(url, "No usable title, marking unresolvable");
            return Ok(Resolution::Unresolvable {
                url: url.to_string(),
            });
        };

        let entry = self.store_entry(entry)?;
        info!(url, title = %entry.title, "Resolved article content");
        Ok(Resolution::Resolved(entry))
    }

    async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractionFailure> {
        match tokio::time::timeout(self.extract_timeout, self.extractor.extract(url)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionFailure::new(
                url,
                ExtractCause::Timeout(self.extract_timeout),
            )),
        }
    }

    /// Combine extractor output with the article's own fields.
    /// `None` when no title survives the fallback chain.
    fn build_entry(&self, article: &Article, extracted: ExtractedContent) -> Option<CacheEntry> {
        // Extractors may report a missing field as an empty string.
        let title = non_blank(extracted.title);
        let excerpt = non_blank(extracted.excerpt);

        let mut fields = ContentFields {
            content: extracted.content.unwrap_or_default(),
        };
        let applied = self.overrides.apply(article, &mut fields);
        if applied > 0 {
            debug!(url = %article.url, applied, "Applied source overrides");
        }

        let excerpt = excerpt
            .or_else(|| title.clone())
            .unwrap_or_else(|| article.description.clone());
        let title = title.unwrap_or_else(|| article.title.clone());

        if title.trim().is_empty() {
            return None;
        }

        Some(CacheEntry {
            url: article.url.clone(),
            title,
            excerpt,
            content: fields.content,
            image: non_blank(extracted.lead_image_url).unwrap_or_default(),
            publication_date: extracted
                .date_published
                .unwrap_or(article.publication_date),
            comment_url: article.comment_url.clone(),
            enclosures: article.enclosures.clone(),
        })
    }

    /// Insert `entry`; if another resolution got there first, return theirs.
    fn store_entry(&self, entry: CacheEntry) -> Result<CacheEntry, ResolveError> {
        match self.cache.insert(&entry) {
            Ok(()) => Ok(entry),
            Err(DistillError::DuplicateKey(_)) => {
                debug!(url = %entry.url, "Lost insert race, reading back existing entry");
                self.cache
                    .lookup(&entry.url)
                    .map_err(|e| ResolveError::store(&entry.url, e))?
                    .ok_or_else(|| {
                        ResolveError::store(
                            &entry.url,
                            DistillError::CacheEntryNotFound(entry.url.clone()),
                        )
                    })
            }
            Err(e) => Err(ResolveError::store(&entry.url, e)),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}


#[cfg(test)]
mod tests {
    use super::testing::{extracted, ScriptedExtractor};
    use super::*;
    use crate::app::Result;
    use crate::domain::Enclosure;
    use crate::store::SqliteStore;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn article(url: &str, title: &str, description: &str, content: &str) -> Article {
        let mut article = Article::new(1, "guid:1", url, "placeholder");
        article.title = title.into();
        article.description = description.into();
        article.content = content.into();
        article
    }

    fn setup(extractor: ScriptedExtractor) -> (Resolver, Arc<SqliteStore>, Arc<ScriptedExtractor>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let extractor = Arc::new(extractor);
        let resolver = Resolver::new(store.clone(), extractor.clone());
        (resolver, store, extractor)
    }

    #[tokio::test]
    async fn test_scenario_title_fills_excerpt() {
        let (resolver, _, _) = setup(ScriptedExtractor::returning(extracted(
            "Real Title",
            "",
            "Extracted",
        )));
        let article = article("https://example.com/a", "", "Desc", "Body");

        let entry = resolver.resolve(&article).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.title, "Real Title");
        assert_eq!(entry.excerpt, "Real Title");
        assert_eq!(entry.content, "Extracted");
        assert_eq!(entry.url, "https://example.com/a");
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (resolver, store, extractor) = setup(ScriptedExtractor::returning(extracted(
            "Title", "Excerpt", "Content",
        )));
        let article = article("https://example.com/a", "Own title", "", "");

        let first = resolver.resolve(&article).await.unwrap();
        let second = resolver.resolve(&article).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_returns_entry_unchanged() {
        let (resolver, store, extractor) =
            setup(ScriptedExtractor::returning(extracted("New", "", "New body")));
        let cached = CacheEntry {
            url: "https://example.com/a".into(),
            title: "Old".into(),
            excerpt: "Old excerpt".into(),
            content: "Old body".into(),
            image: String::new(),
            publication_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            comment_url: String::new(),
            enclosures: Vec::new(),
        };
        store.insert(&cached).unwrap();

        let resolution = resolver
            .resolve(&article("https://example.com/a", "T", "", ""))
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::Resolved(cached));
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_override_keeps_article_content() {
        let (resolver, _, _) = setup(ScriptedExtractor::returning(extracted(
            "Comic",
            "",
            "<p>Extractor mangled this</p>",
        )));
        let article = article("https://xkcd.com/927/", "Standards", "", "<img src=\"standards.png\">");

        let entry = resolver.resolve(&article).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.content, "<img src=\"standards.png\">");
        assert_eq!(entry.title, "Comic");
    }

    #[tokio::test]
    async fn test_configured_override_table_is_used() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let extractor = Arc::new(ScriptedExtractor::returning(extracted("T", "", "extracted")));
        let resolver = Resolver::new(store, extractor).with_overrides(OverrideTable::new(vec![
            OverrideRule::new("https://comics.example/", OverrideAction::UseArticleContent),
        ]));

        let xkcd = resolver
            .resolve(&article("https://xkcd.com/1/", "T", "", "own"))
            .await
            .unwrap();
        assert_eq!(xkcd.entry().unwrap().content, "extracted");

        let comic = resolver
            .resolve(&article("https://comics.example/1", "T", "", "own"))
            .await
            .unwrap();
        assert_eq!(comic.entry().unwrap().content, "own");
    }

    #[tokio::test]
    async fn test_excerpt_falls_back_to_description() {
        let (resolver, _, _) = setup(ScriptedExtractor::returning(extracted("", "", "Body")));
        let article = article("https://example.com/a", "Own title", "Desc", "");

        let entry = resolver.resolve(&article).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.excerpt, "Desc");
        assert_eq!(entry.title, "Own title");
    }

    #[tokio::test]
    async fn test_blank_extracted_fields_use_fallbacks() {
        let (resolver, _, _) = setup(ScriptedExtractor::returning(ExtractedContent {
            title: Some(String::new()),
            excerpt: Some("  ".into()),
            content: Some("Body".into()),
            lead_image_url: Some(String::new()),
            date_published: None,
        }));
        let article = article("https://example.com/p", "Own title", "Desc", "");

        let entry = resolver.resolve(&article).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.title, "Own title");
        assert_eq!(entry.excerpt, "Desc");
        assert_eq!(entry.content, "Body");
        assert_eq!(entry.image, "");
    }

    #[tokio::test]
    async fn test_missing_title_is_unresolvable() {
        let (resolver, store, _) = setup(ScriptedExtractor::returning(extracted("", "Ex", "Body")));
        let article = article("https://example.com/a", "", "Desc", "");

        let resolution = resolver.resolve(&article).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Unresolvable {
                url: "https://example.com/a".into()
            }
        );
        assert!(store.lookup("https://example.com/a").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_image_and_date_fallbacks() {
        let published = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut content = extracted("T", "E", "C");
        let (resolver, _, _) = setup(ScriptedExtractor::returning(content.clone()));

        let mut own = article("https://example.com/a", "T", "", "");
        own.publication_date = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        own.comment_url = "https://news.example/item?id=1".into();
        own.enclosures = vec![Enclosure {
            url: "https://example.com/a.mp3".into(),
            mime_type: Some("audio/mpeg".into()),
            length: None,
        }];

        let entry = resolver.resolve(&own).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.image, "");
        assert_eq!(entry.publication_date, own.publication_date);
        assert_eq!(entry.comment_url, own.comment_url);
        assert_eq!(entry.enclosures, own.enclosures);

        content.lead_image_url = Some("https://example.com/lead.png".into());
        content.date_published = Some(published);
        let (resolver, _, _) = setup(ScriptedExtractor::returning(content));
        let entry = resolver.resolve(&own).await.unwrap().into_entry().unwrap();
        assert_eq!(entry.image, "https://example.com/lead.png");
        assert_eq!(entry.publication_date, published);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_surfaced() {
        let (resolver, store, _) = setup(ScriptedExtractor::failing());
        let article = article("https://example.com/a", "Title", "", "Body");

        let err = resolver.resolve(&article).await.unwrap_err();
        assert!(matches!(err, ResolveError::ExtractionFailed(_)));
        assert_eq!(err.url(), "https://example.com/a");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_slow_extractor_times_out() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let extractor = Arc::new(
            ScriptedExtractor::returning(extracted("T", "", "C"))
                .with_delay(Duration::from_millis(500)),
        );
        let resolver =
            Resolver::new(store, extractor).with_extract_timeout(Duration::from_millis(20));

        let err = resolver
            .resolve(&article("https://example.com/a", "T", "", ""))
            .await
            .unwrap_err();
        match err {
            ResolveError::ExtractionFailed(failure) => {
                assert!(matches!(failure.cause, ExtractCause::Timeout(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolves_share_one_entry() {
        let (resolver, store, extractor) = setup(
            ScriptedExtractor::returning(extracted("Title", "Excerpt", "Body"))
                .with_delay(Duration::from_millis(20)),
        );
        let resolver = Arc::new(resolver);
        let article = article("https://example.com/race", "Own", "", "");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                let article = article.clone();
                tokio::spawn(async move { resolver.resolve(&article).await })
            })
            .collect();

        let mut entries = Vec::new();
        for handle in handles {
            let resolution = handle.await.unwrap().unwrap();
            entries.push(resolution.into_entry().unwrap());
        }

        assert!(entries.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.count().unwrap(), 1);
        assert!(extractor.calls() >= 1);
    }

    /// Reports a miss on the first lookup, as if a concurrent resolver
    /// inserted right after it.
    struct LateWinnerCache {
        inner: SqliteStore,
        missed: AtomicBool,
    }

    impl CacheStore for LateWinnerCache {
        fn lookup(&self, url: &str) -> Result<Option<CacheEntry>> {
            if !self.missed.swap(true, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.lookup(url)
        }

        fn insert(&self, entry: &CacheEntry) -> Result<()> {
            self.inner.insert(entry)
        }

        fn count(&self) -> Result<i64> {
            self.inner.count()
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_returns_winner() {
        let winner = CacheEntry {
            url: "https://example.com/a".into(),
            title: "Winner".into(),
            excerpt: "W".into(),
            content: "Winner body".into(),
            image: String::new(),
            publication_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            comment_url: String::new(),
            enclosures: Vec::new(),
        };
        let inner = SqliteStore::in_memory().unwrap();
        inner.insert(&winner).unwrap();
        let cache = Arc::new(LateWinnerCache {
            inner,
            missed: AtomicBool::new(false),
        });
        let extractor = Arc::new(ScriptedExtractor::returning(extracted("Loser", "", "Loser body")));
        let resolver = Resolver::new(cache.clone(), extractor.clone());

        let resolution = resolver
            .resolve(&article("https://example.com/a", "T", "", ""))
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Resolved(winner));
        assert_eq!(extractor.calls(), 1);
        assert_eq!(cache.count().unwrap(), 1);
    }

    struct UnavailableCache;

    impl CacheStore for UnavailableCache {
        fn lookup(&self, _url: &str) -> Result<Option<CacheEntry>> {
            Err(DistillError::Io(std::io::Error::other("disk detached")))
        }

        fn insert(&self, _entry: &CacheEntry) -> Result<()> {
            Err(DistillError::Io(std::io::Error::other("disk detached")))
        }

        fn count(&self) -> Result<i64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let extractor = Arc::new(ScriptedExtractor::returning(extracted("T", "", "C")));
        let resolver = Resolver::new(Arc::new(UnavailableCache), extractor.clone());

        let err = resolver
            .resolve(&article("https://example.com/a", "T", "", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::StoreUnavailable { .. }));
        assert_eq!(extractor.calls(), 0);
    }

    /// Misses every lookup and rejects inserts with `insert_error`.
    struct BrokenInsertCache {
        insert_error: fn(&str) -> DistillError,
        inner: SqliteStore,
    }

    impl CacheStore for BrokenInsertCache {
        fn lookup(&self, _url: &str) -> Result<Option<CacheEntry>> {
            Ok(None)
        }

        fn insert(&self, entry: &CacheEntry) -> Result<()> {
            Err((self.insert_error)(&entry.url))
        }

        fn count(&self) -> Result<i64> {
            self.inner.count()
        }
    }

    async fn resolve_with_broken_insert(
        insert_error: fn(&str) -> DistillError,
    ) -> (ResolveError, Arc<BrokenInsertCache>, usize) {
        let cache = Arc::new(BrokenInsertCache {
            insert_error,
            inner: SqliteStore::in_memory().unwrap(),
        });
        let extractor = Arc::new(ScriptedExtractor::returning(extracted("T", "", "C")));
        let resolver = Resolver::new(cache.clone(), extractor.clone());

        let err = resolver
            .resolve(&article("https://example.com/a", "T", "", ""))
            .await
            .unwrap_err();
        (err, cache, extractor.calls())
    }

    #[tokio::test]
    async fn test_insert_failure_is_store_unavailable() {
        let (err, cache, calls) = resolve_with_broken_insert(|_| {
            DistillError::Io(std::io::Error::other("disk full"))
        })
        .await;

        assert_eq!(calls, 1);
        assert_eq!(err.url(), "https://example.com/a");
        match err {
            ResolveError::StoreUnavailable { source, .. } => {
                assert!(matches!(source, DistillError::Io(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cache.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_without_winner_is_store_unavailable() {
        let (err, cache, _) =
            resolve_with_broken_insert(|url| DistillError::DuplicateKey(url.to_string())).await;

        match err {
            ResolveError::StoreUnavailable { source, .. } => {
                assert!(matches!(source, DistillError::CacheEntryNotFound(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cache.count().unwrap(), 0);
    }
}
