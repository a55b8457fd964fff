//! Configuration management for Distill.
//!
//! Configuration is read from `~/.config/distill/config.toml` at startup, or
//! from the path given with `--config`. If the default file doesn't exist, a
//! default configuration with comments is created. A few environment
//! variables take precedence over the file so deployments can inject the
//! database location and extractor credentials.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extractor::ExtractorConfig;
use crate::resolver::{OverrideTable, ResolverConfig};

pub const ENV_DATABASE_PATH: &str = "DISTILL_DATABASE_PATH";
pub const ENV_EXTRACTOR_ENDPOINT: &str = "DISTILL_EXTRACTOR_ENDPOINT";
pub const ENV_EXTRACTOR_API_KEY: &str = "DISTILL_EXTRACTOR_API_KEY";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub extractor: ExtractorConfig,
    pub resolver: ResolverConfig,
    pub overrides: OverrideTable,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override file values with `DISTILL_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DATABASE_PATH) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(endpoint) = get(ENV_EXTRACTOR_ENDPOINT) {
            self.extractor.endpoint = endpoint;
        }
        if let Some(key) = get(ENV_EXTRACTOR_API_KEY) {
            self.extractor.api_key = Some(key);
        }
        self
    }

    /// Get the default config file path: `~/.config/distill/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("distill").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        format!(
            r##"# Distill Configuration
#
# Environment variables override the values below:
#   {ENV_DATABASE_PATH}, {ENV_EXTRACTOR_ENDPOINT}, {ENV_EXTRACTOR_API_KEY}

[database]
# SQLite database file (default: <data dir>/distill/distill.db)
# path = "/var/lib/distill/distill.db"

# How long to wait on a locked database, in milliseconds
busy_timeout_ms = 5000

[extractor]
# Base URL of the parser service; requests go to <endpoint>/parser?url=...
endpoint = "https://mercury.postlight.com"

# API key sent as the x-api-key header
# api_key = ""

# Request timeout in seconds
timeout_secs = 30

[resolver]
# Maximum concurrent resolutions for resolve-all
workers = 10

# Upper bound on a single extraction, in seconds
extract_timeout_secs = 45

# Sources whose extracted content is replaced by the article's own content.
# Rules match by URL prefix and apply in order.
[[overrides]]
prefix = "https://xkcd"
action = "use_article_content"
"##
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{OverrideAction, OverrideRule};
    use std::collections::HashMap;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.resolver.workers, 10);
        assert_eq!(config.overrides, OverrideTable::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[extractor]
endpoint = "http://localhost:3000"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.extractor.endpoint, "http://localhost:3000");
        assert_eq!(config.extractor.timeout_secs, 30);
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_custom_overrides_replace_defaults() {
        let content = r##"
[[overrides]]
prefix = "https://comics.example/"
action = "use_article_content"
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(
            config.overrides.rules(),
            &[OverrideRule::new(
                "https://comics.example/",
                OverrideAction::UseArticleContent
            )]
        );
    }

    #[test]
    fn test_unknown_override_action_is_rejected() {
        let content = r##"
[[overrides]]
prefix = "https://example.com"
action = "delete_everything"
"##;
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DATABASE_PATH, "/tmp/distill.db"),
            (ENV_EXTRACTOR_API_KEY, "secret"),
            (ENV_EXTRACTOR_ENDPOINT, "  "),
        ]
        .into_iter()
        .collect();

        let config = Config::default().apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/distill.db")));
        assert_eq!(config.extractor.api_key.as_deref(), Some("secret"));
        // Blank values are ignored.
        assert_eq!(config.extractor.endpoint, ExtractorConfig::default().endpoint);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[resolver]\nworkers = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.resolver.workers, 3);

        let missing = Config::load_from(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
