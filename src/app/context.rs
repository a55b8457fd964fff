use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{DistillError, Result};
use crate::config::Config;
use crate::extractor::{Extractor, HttpExtractor};
use crate::normalizer::Normalizer;
use crate::resolver::{ParallelResolver, Resolver};
use crate::store::sqlite::SqliteStore;

/// Everything a command needs, built once at startup and passed by reference.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub resolver: Arc<Resolver>,
    pub parallel_resolver: ParallelResolver,
    pub normalizer: Normalizer,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = match config.database.path {
            Some(ref p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        store.set_busy_timeout(config.database.busy_timeout())?;
        tracing::info!(path = %db_path.display(), "Opened database");

        let extractor = Arc::new(HttpExtractor::new(&config.extractor)?);
        Ok(Self::with_parts(store, extractor, config))
    }

    pub fn in_memory(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let extractor = Arc::new(HttpExtractor::new(&config.extractor)?);
        Ok(Self::with_parts(store, extractor, config))
    }

    /// Wire a context around an existing store and extractor.
    pub fn with_parts(
        store: Arc<SqliteStore>,
        extractor: Arc<dyn Extractor + Send + Sync>,
        config: &Config,
    ) -> Self {
        let resolver = Arc::new(
            Resolver::new(store.clone(), extractor)
                .with_overrides(config.overrides.clone())
                .with_extract_timeout(config.resolver.extract_timeout()),
        );
        let parallel_resolver =
            ParallelResolver::with_workers(resolver.clone(), config.resolver.workers);

        Self {
            store,
            resolver,
            parallel_resolver,
            normalizer: Normalizer::new(),
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| DistillError::Config("Could not find data directory".into()))?;
        let distill_dir = data_dir.join("distill");
        std::fs::create_dir_all(&distill_dir)?;
        Ok(distill_dir.join("distill.db"))
    }
}
