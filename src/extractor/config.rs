use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the extraction service client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Base URL of the parser service; requests go to `{endpoint}/parser`
    pub endpoint: String,

    /// API key sent as `x-api-key` (default: none)
    pub api_key: Option<String>,

    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// User agent string to use
    pub user_agent: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://mercury.postlight.com".to_string(),
            api_key: None,
            timeout_secs: 30,
            user_agent: concat!("distill/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the parser endpoint
    pub fn parser_url(&self) -> String {
        format!("{}/parser", self.endpoint.trim_end_matches('/'))
    }
}
