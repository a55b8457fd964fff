use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::app::Result;
use crate::extractor::{
    ExtractCause, ExtractedContent, ExtractionFailure, Extractor, ExtractorConfig,
};

/// Client for a Mercury-style parser API (`GET /parser?url=...`).
pub struct HttpExtractor {
    client: Client,
    parser_url: String,
    api_key: Option<String>,
}

impl HttpExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            parser_url: config.parser_url(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ParserResponse {
    content: Option<String>,
    excerpt: Option<String>,
    title: Option<String>,
    lead_image_url: Option<String>,
    date_published: Option<String>,
    #[serde(default)]
    error: bool,
    messages: Option<serde_json::Value>,
}

impl ParserResponse {
    fn into_content(self) -> ExtractedContent {
        ExtractedContent {
            content: present(self.content),
            excerpt: present(self.excerpt),
            title: present(self.title),
            lead_image_url: present(self.lead_image_url),
            date_published: self.date_published.as_deref().and_then(parse_published),
        }
    }
}

/// Blank strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_published(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        });

    if parsed.is_none() {
        debug!(date = s, "Ignoring unparseable publication date");
    }
    parsed
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, url: &str) -> std::result::Result<ExtractedContent, ExtractionFailure> {
        let mut request = self.client.get(&self.parser_url).query(&[("url", url)]);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExtractionFailure::new(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractionFailure::new(
                url,
                ExtractCause::Status {
                    status: status.as_u16(),
                    message,
                },
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ExtractionFailure::new(url, e))?;
        let payload: ParserResponse =
            serde_json::from_slice(&body).map_err(|e| ExtractionFailure::new(url, e))?;

        if payload.error {
            let message = payload
                .messages
                .map(|m| match m {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "parser reported an error".to_string());
            return Err(ExtractionFailure::new(url, ExtractCause::Other(message)));
        }

        Ok(payload.into_content())
    }
}
