use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::domain::Article;
use crate::resolver::{Resolution, ResolveError, Resolver};

pub const DEFAULT_WORKERS: usize = 10;

/// Resolves batches of articles with a bounded number in flight.
pub struct ParallelResolver {
    resolver: Arc<Resolver>,
    semaphore: Arc<Semaphore>,
}

impl ParallelResolver {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self::with_workers(resolver, DEFAULT_WORKERS)
    }

    pub fn with_workers(resolver: Arc<Resolver>, workers: usize) -> Self {
        Self {
            resolver,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn resolve_all(
        &self,
        articles: Vec<Article>,
    ) -> Vec<(i64, Result<Resolution, ResolveError>)> {
        let mut handles = Vec::new();

        for article in articles {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                tracing::error!("Resolver semaphore closed");
                break;
            };
            let resolver = self.resolver.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = resolver.resolve(&article).await;
                (article.id, result)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::testing::{extracted, ScriptedExtractor};
    use crate::store::{CacheStore, SqliteStore};
    use std::time::Duration;

    fn articles(urls: &[&str]) -> Vec<Article> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| {
                let mut article = Article::new(1, &format!("guid:{i}"), url, "Title");
                article.id = i as i64 + 1;
                article
            })
            .collect()
    }

    #[tokio::test]
    async fn test_resolve_all_reports_each_article() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let extractor = Arc::new(
            ScriptedExtractor::returning(extracted("T", "E", "C"))
                .with_delay(Duration::from_millis(5)),
        );
        let resolver = Arc::new(Resolver::new(store.clone(), extractor));
        let parallel = ParallelResolver::with_workers(resolver, 2);

        let results = parallel
            .resolve_all(articles(&[
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3",
            ]))
            .await;

        let ids: Vec<i64> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(results.iter().all(|(_, r)| matches!(r, Ok(res) if res.is_resolved())));
        assert_eq!(store.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_resolve_all_with_duplicate_urls() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let extractor = Arc::new(ScriptedExtractor::returning(extracted("T", "E", "C")));
        let resolver = Arc::new(Resolver::new(store.clone(), extractor));
        let parallel = ParallelResolver::new(resolver);

        let results = parallel
            .resolve_all(articles(&["https://example.com/same", "https://example.com/same"]))
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_failures_per_article() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let resolver = Arc::new(Resolver::new(store, Arc::new(ScriptedExtractor::failing())));
        let parallel = ParallelResolver::with_workers(resolver, 0);

        let results = parallel
            .resolve_all(articles(&["https://example.com/1"]))
            .await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].1, Err(ResolveError::ExtractionFailed(_))));
    }
}
