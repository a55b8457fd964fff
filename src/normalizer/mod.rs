use chrono::Utc;
use feed_rs::model::Entry;
use feed_rs::parser;
use html_escape::decode_html_entities;
use tracing::warn;
use url::Url;

use crate::app::{DistillError, Result};
use crate::domain::{clip_description, Article, Enclosure, IdentitySignals};

#[derive(Debug, Clone)]
pub struct FeedMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Site the feed describes.
    pub link: Option<String>,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS, Atom or JSON Feed document into article records for
    /// `feed_id`. Entries without a usable URL, title or identity are skipped.
    pub fn normalize(&self, feed_id: i64, body: &[u8]) -> Result<(FeedMeta, Vec<Article>)> {
        // feed-rs would otherwise invent an id from link and title for items
        // without a guid, which changes whenever the title is edited.
        let feed = parser::Builder::new()
            .id_generator(|_, _, _| String::new())
            .build()
            .parse(body)
            .map_err(|e| DistillError::FeedParse(e.to_string()))?;

        let meta = FeedMeta {
            title: feed.title.map(|t| decode(&t.content)),
            description: feed.description.map(|d| decode(&d.content)),
            link: feed.links.first().map(|l| l.href.clone()),
        };

        let articles = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::to_article(feed_id, entry))
            .collect();

        Ok((meta, articles))
    }

    fn to_article(feed_id: i64, entry: Entry) -> Option<Article> {
        let guid = Some(entry.id.trim().to_string()).filter(|id| !id.is_empty());
        let link = entry.links.first().map(|l| l.href.trim().to_string());

        // The guid doubles as the article URL when it is a permalink.
        let url = link
            .clone()
            .or_else(|| guid.clone())
            .filter(|candidate| Url::parse(candidate).is_ok());
        let Some(url) = url else {
            warn!(guid = ?guid, "Skipping entry without a valid URL");
            return None;
        };

        let title = entry
            .title
            .map(|t| decode(&t.content))
            .unwrap_or_default();
        if title.is_empty() {
            warn!(%url, "Skipping entry without a title");
            return None;
        }

        let summary = entry
            .summary
            .map(|s| decode(&s.content))
            .unwrap_or_default();

        let signals = IdentitySignals {
            guid: guid.clone(),
            link: link.clone(),
            url: Some(url.clone()),
            payload: vec![title.clone(), summary.clone()],
        };
        let fingerprint = signals.fingerprint()?;

        let mut article = Article::new(feed_id, &fingerprint, &url, &title);
        article.guid = guid;
        article.link = link;
        article.description = clip_description(&summary);
        article.content = entry
            .content
            .and_then(|c| c.body)
            .map(|b| decode(&b))
            .unwrap_or_default();
        if let Some(published) = entry.published.or(entry.updated) {
            article.publication_date = published.with_timezone(&Utc);
        }

        for media in &entry.media {
            if article.images.featured.is_empty() {
                if let Some(thumbnail) = media.thumbnails.first() {
                    article.images.featured = thumbnail.image.uri.clone();
                }
            }
            for item in &media.content {
                let Some(ref media_url) = item.url else {
                    continue;
                };
                article.enclosures.push(Enclosure {
                    url: media_url.to_string(),
                    mime_type: item.content_type.as_ref().map(|m| m.to_string()),
                    length: item.size,
                });
            }
        }

        Some(article)
    }
}

fn decode(text: &str) -> String {
    decode_html_entities(text).trim().to_string()
}
