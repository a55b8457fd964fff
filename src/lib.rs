//! # Distill
//!
//! Content resolution and caching for syndicated articles.
//!
//! ## Architecture
//!
//! Articles come in through feed documents and are resolved to readable
//! content on demand:
//!
//! ```text
//! Normalizer → Store → Resolver → Extractor
//!                ↑                   │
//!                └──── CacheStore ←──┘
//! ```
//!
//! A resolved URL is extracted at most once. Later requests for the same
//! URL are served from the content cache, and concurrent requests that race
//! on the first extraction all end up with the entry that was stored first.
//!
//! ## Quick Start
//!
//! ```bash
//! # Load a feed document
//! distill ingest https://example.com/feed.xml ./feed.xml
//!
//! # List stored articles
//! distill articles
//!
//! # Resolve one article, or every valid article
//! distill resolve 42
//! distill resolve-all
//!
//! # Read back the cached content for a URL
//! distill show https://example.com/posts/1
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, extractor, resolver, normalizer.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `ingest <feed-url> <path>` - Load a feed document
/// - `articles [--feed ID]` - List stored articles
/// - `resolve <id>` - Resolve one article's content
/// - `resolve-all` - Resolve every valid article concurrently
/// - `show <url>` - Print a cached entry
pub mod cli;

/// Configuration loaded from `~/.config/distill/config.toml`, with
/// `DISTILL_*` environment overrides.
pub mod config;

/// Core domain models.
///
/// - [`Article`](domain::Article): A feed entry with its identity fingerprint
/// - [`Feed`](domain::Feed): Feed metadata
/// - [`CacheEntry`](domain::CacheEntry): Resolved content keyed by URL
pub mod domain;

/// Readable-content extraction.
///
/// - [`Extractor`](extractor::Extractor): Async trait for extraction
/// - [`HttpExtractor`](extractor::HttpExtractor): Client for a parser service
pub mod extractor;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into [`Article`](domain::Article) records.
pub mod normalizer;

/// Cache-first content resolution.
///
/// - [`Resolver`](resolver::Resolver): Resolves one article
/// - [`ParallelResolver`](resolver::ParallelResolver): Concurrent resolution with semaphore
/// - [`OverrideTable`](resolver::OverrideTable): Per-source content overrides
pub mod resolver;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Feed and article storage
/// - [`CacheStore`](store::CacheStore): Create-or-fail content cache
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of both
pub mod store;
