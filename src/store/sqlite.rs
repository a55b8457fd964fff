use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::app::{DistillError, Result};
use crate::domain::{
    Article, ArticleKey, ArticleView, CacheEntry, Enclosure, Feed, FeedUpdate, Images,
};
use crate::store::{registry, CacheStore, Store};

const FEED_COLUMNS: &str = "id, url, feed_url, title, description, favicon, valid, created_at";

const ARTICLE_COLUMNS: &str = "id, feed_id, fingerprint, guid, link, url, title, description, \
     content, comment_url, image_featured, image_banner, image_favicon, image_og, enclosures, \
     publication_date, likes, valid, created_at, updated_at";

const INSERT_ARTICLE: &str = "INTO articles (feed_id, fingerprint, guid, link, url, title, \
     description, content, comment_url, image_featured, image_banner, image_favicon, image_og, \
     enclosures, publication_date, likes, valid, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)";

const CACHE_COLUMNS: &str =
    "url, title, excerpt, content, image, publication_date, comment_url, enclosures";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// How long a statement waits on a locked database file before failing.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn()?.busy_timeout(timeout)?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        registry::migrations().to_latest(&mut conn)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            DistillError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        Ok(row
            .get::<_, String>(idx)
            .ok()
            .and_then(|s| Self::parse_datetime(&s))
            .unwrap_or_else(Utc::now))
    }

    /// Cache rows are immutable, so an unreadable date is an error rather
    /// than a substitute value.
    fn stored_datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn enclosures_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<Enclosure>> {
        let raw: String = row.get(idx)?;
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            url: row.get(1)?,
            feed_url: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            favicon: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            valid: row.get::<_, i32>(6)? != 0,
            created_at: Self::datetime_at(row, 7)?,
        })
    }

    fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
        Ok(Article {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            fingerprint: row.get(2)?,
            guid: row.get(3)?,
            link: row.get(4)?,
            url: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
            content: row.get(8)?,
            comment_url: row.get(9)?,
            images: Images {
                featured: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
                banner: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                favicon: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
                og: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
            },
            enclosures: Self::enclosures_at(row, 14)?,
            publication_date: Self::datetime_at(row, 15)?,
            likes: row.get(16)?,
            valid: row.get::<_, i32>(17)? != 0,
            created_at: Self::datetime_at(row, 18)?,
            updated_at: Self::datetime_at(row, 19)?,
        })
    }

    fn cache_entry_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
        Ok(CacheEntry {
            url: row.get(0)?,
            title: row.get(1)?,
            excerpt: row.get(2)?,
            content: row.get(3)?,
            image: row.get(4)?,
            publication_date: Self::stored_datetime_at(row, 5)?,
            comment_url: row.get(6)?,
            enclosures: Self::enclosures_at(row, 7)?,
        })
    }

    fn query_articles(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Article>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles {filter}
             ORDER BY publication_date DESC, id DESC"
        ))?;

        let articles = stmt
            .query_map(args, Self::article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    fn insert_article(conn: &Connection, verb: &str, article: &Article) -> Result<usize> {
        let enclosures = serde_json::to_string(&article.enclosures)?;
        let inserted = conn.execute(
            &format!("{verb} {INSERT_ARTICLE}"),
            params![
                article.feed_id,
                article.fingerprint,
                article.guid,
                article.link,
                article.url,
                article.title,
                article.description,
                article.content,
                article.comment_url,
                article.images.featured,
                article.images.banner,
                article.images.favicon,
                article.images.og,
                enclosures,
                article.publication_date.to_rfc3339(),
                article.likes,
                article.valid as i32,
                article.created_at.to_rfc3339(),
                article.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted)
    }
}

/// Map a UNIQUE / PRIMARY KEY violation to `DuplicateKey`.
fn duplicate_key(err: rusqlite::Error, key: impl Into<String>) -> DistillError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            DistillError::DuplicateKey(key.into())
        }
        _ => DistillError::Database(err),
    }
}

impl Store for SqliteStore {
    fn add_feed(&self, feed: &Feed) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (url, feed_url, title, description, favicon, valid, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                feed.url,
                feed.feed_url,
                feed.title,
                feed.description,
                feed.favicon,
                feed.valid as i32,
                feed.created_at.to_rfc3339()
            ],
        )
        .map_err(|e| duplicate_key(e, feed.feed_url.clone()))?;

        Ok(conn.last_insert_rowid())
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(feed)
    }

    fn get_feed_by_url(&self, feed_url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE feed_url = ?1"),
                params![feed_url],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(feed)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY title, feed_url"
        ))?;

        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn update_feed(&self, id: i64, update: &FeedUpdate) -> Result<()> {
        let conn = self.conn()?;

        if let Some(ref url) = update.url {
            conn.execute("UPDATE feeds SET url = ?1 WHERE id = ?2", params![url, id])?;
        }
        if let Some(ref title) = update.title {
            conn.execute(
                "UPDATE feeds SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
        }
        if let Some(ref description) = update.description {
            conn.execute(
                "UPDATE feeds SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
        }

        Ok(())
    }

    fn add_article(&self, article: &Article) -> Result<i64> {
        article.validate()?;
        let conn = self.conn()?;

        Self::insert_article(&conn, "INSERT", article).map_err(|e| match e {
            DistillError::Database(err) => duplicate_key(err, article.key().to_string()),
            other => other,
        })?;

        Ok(conn.last_insert_rowid())
    }

    fn add_articles(&self, articles: &[Article]) -> Result<usize> {
        for article in articles {
            article.validate()?;
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut count = 0;

        for article in articles {
            count += Self::insert_article(&tx, "INSERT OR IGNORE", article)?;
        }

        tx.commit()?;
        Ok(count)
    }

    fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let conn = self.conn()?;
        let article = conn
            .query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
                params![id],
                Self::article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn get_article_by_key(&self, key: &ArticleKey) -> Result<Option<Article>> {
        let conn = self.conn()?;
        let article = conn
            .query_row(
                &format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles WHERE feed_id = ?1 AND fingerprint = ?2"
                ),
                params![key.feed_id, key.fingerprint],
                Self::article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn get_articles_by_url(&self, url: &str) -> Result<Vec<Article>> {
        self.query_articles("WHERE url = ?1", &[&url])
    }

    fn get_articles_by_feed(&self, feed_id: i64) -> Result<Vec<Article>> {
        self.query_articles("WHERE feed_id = ?1", &[&feed_id])
    }

    fn get_all_articles(&self) -> Result<Vec<Article>> {
        self.query_articles("", &[])
    }

    fn get_article_view(&self, id: i64) -> Result<Option<ArticleView>> {
        let Some(article) = self.get_article(id)? else {
            return Ok(None);
        };
        let feed = self
            .get_feed(article.feed_id)?
            .ok_or_else(|| DistillError::FeedNotFound(article.feed_id.to_string()))?;

        Ok(Some(ArticleView {
            feed: feed.summary(),
            article,
        }))
    }

    fn set_article_valid(&self, id: i64, valid: bool) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE articles SET valid = ?1, updated_at = ?2 WHERE id = ?3",
            params![valid as i32, Utc::now().to_rfc3339(), id],
        )?;

        if updated == 0 {
            return Err(DistillError::ArticleNotFound(id.to_string()));
        }
        Ok(())
    }

    fn like_article(&self, id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let likes = conn
            .query_row(
                "UPDATE articles SET likes = likes + 1, updated_at = ?1 WHERE id = ?2
                 RETURNING likes",
                params![Utc::now().to_rfc3339(), id],
                |row| row.get(0),
            )
            .optional()?;

        likes.ok_or_else(|| DistillError::ArticleNotFound(id.to_string()))
    }

    fn count_articles(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl CacheStore for SqliteStore {
    fn lookup(&self, url: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!("SELECT {CACHE_COLUMNS} FROM cache WHERE url = ?1"),
                params![url],
                Self::cache_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn insert(&self, entry: &CacheEntry) -> Result<()> {
        let enclosures = serde_json::to_string(&entry.enclosures)?;
        let conn = self.conn()?;

        // Plain INSERT: the primary key on url makes this create-or-fail.
        conn.execute(
            &format!(
                "INSERT INTO cache ({CACHE_COLUMNS}, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                entry.url,
                entry.title,
                entry.excerpt,
                entry.content,
                entry.image,
                entry.publication_date.to_rfc3339(),
                entry.comment_url,
                enclosures,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| duplicate_key(e, entry.url.clone()))?;

        Ok(())
    }

    fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
        Ok(count)
    }
}
