use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resolver::parallel::DEFAULT_WORKERS;

/// Configuration for content resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum resolutions in flight for batch runs (default: 10)
    pub workers: usize,

    /// Upper bound on a single extractor call in seconds (default: 45)
    pub extract_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            extract_timeout_secs: 45,
        }
    }
}

impl ResolverConfig {
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}
