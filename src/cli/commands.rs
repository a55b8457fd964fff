use std::path::Path;

use anyhow::Context;

use crate::app::{AppContext, DistillError};
use crate::domain::{Article, CacheEntry, Feed, FeedUpdate};
use crate::resolver::Resolution;
use crate::store::{CacheStore, Store};

/// Load a local feed document and store its articles under `feed_url`.
pub async fn ingest(ctx: &AppContext, feed_url: &str, path: &Path) -> anyhow::Result<()> {
    let body = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let feed_id = match ctx.store.get_feed_by_url(feed_url)? {
        Some(feed) => feed.id,
        None => {
            let id = ctx.store.add_feed(&Feed::new(feed_url.to_string()))?;
            println!("Added feed: {}", feed_url);
            id
        }
    };

    let (meta, articles) = ctx.normalizer.normalize(feed_id, &body)?;

    let update = FeedUpdate {
        url: meta.link,
        title: meta.title.clone(),
        description: meta.description,
    };
    ctx.store.update_feed(feed_id, &update)?;

    let parsed = articles.len();
    let mut fresh = Vec::new();
    for article in articles {
        if ctx.store.get_article_by_key(&article.key())?.is_none() {
            fresh.push(article);
        }
    }

    let count = ctx.store.add_articles(&fresh)?;
    tracing::info!(feed_id, parsed, new = count, "Ingested feed");

    if let Some(title) = meta.title {
        println!("Feed title: {}", title);
    }
    for article in &fresh {
        println!("  + {}", article.display_title());
    }
    println!(
        "Stored {} new articles ({} already known)",
        count,
        parsed - count
    );
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> anyhow::Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let articles = ctx.store.get_articles_by_feed(feed.id)?;
        println!(
            "[{}] {} ({} articles)\n  {}",
            feed.id,
            feed.display_title(),
            articles.len(),
            feed.feed_url
        );
    }

    Ok(())
}

fn articles_for(ctx: &AppContext, feed: Option<i64>) -> anyhow::Result<Vec<Article>> {
    let articles = match feed {
        Some(feed_id) => {
            ctx.store
                .get_feed(feed_id)?
                .ok_or_else(|| DistillError::FeedNotFound(feed_id.to_string()))?;
            ctx.store.get_articles_by_feed(feed_id)?
        }
        None => ctx.store.get_all_articles()?,
    };
    Ok(articles)
}

pub fn list_articles(ctx: &AppContext, feed: Option<i64>, json: bool) -> anyhow::Result<()> {
    let articles = articles_for(ctx, feed)?;

    if json {
        let mut views = Vec::with_capacity(articles.len());
        for article in &articles {
            if let Some(view) = ctx.store.get_article_view(article.id)? {
                views.push(view);
            }
        }
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles");
        return Ok(());
    }

    for article in articles {
        let marker = if article.valid { " " } else { "x" };
        let date = article.publication_date.format("%Y-%m-%d");
        println!(
            "{} {:>5} {} {}",
            marker,
            article.id,
            date,
            article.display_title()
        );
    }

    Ok(())
}

pub async fn resolve(ctx: &AppContext, id: i64, json: bool) -> anyhow::Result<()> {
    let article = ctx
        .store
        .get_article(id)?
        .ok_or_else(|| DistillError::ArticleNotFound(id.to_string()))?;

    match ctx.resolver.resolve(&article).await? {
        Resolution::Resolved(entry) => print_entry(&entry, json)?,
        Resolution::Unresolvable { url } => println!("No readable content for {}", url),
    }

    Ok(())
}

pub async fn resolve_all(ctx: &AppContext, feed: Option<i64>) -> anyhow::Result<()> {
    let articles: Vec<Article> = articles_for(ctx, feed)?
        .into_iter()
        .filter(|a| a.valid)
        .collect();

    if articles.is_empty() {
        println!("No articles to resolve");
        return Ok(());
    }

    println!("Resolving {} articles...", articles.len());

    let results = ctx.parallel_resolver.resolve_all(articles).await;

    let mut resolved = 0;
    let mut unresolvable = 0;
    let mut errors = 0;

    for (article_id, result) in results {
        match result {
            Ok(Resolution::Resolved(_)) => resolved += 1,
            Ok(Resolution::Unresolvable { url }) => {
                unresolvable += 1;
                println!("  no readable content: [{}] {}", article_id, url);
            }
            Err(e) => {
                errors += 1;
                eprintln!("  Error resolving [{}]: {}", article_id, e);
            }
        }
    }

    println!(
        "Resolve complete: {} resolved, {} unresolvable, {} errors",
        resolved, unresolvable, errors
    );
    Ok(())
}

pub fn show(ctx: &AppContext, url: &str, json: bool) -> anyhow::Result<()> {
    match ctx.store.lookup(url)? {
        Some(entry) => print_entry(&entry, json)?,
        None => println!("Not cached: {}", url),
    }

    if !json {
        for article in ctx.store.get_articles_by_url(url)? {
            println!("  Article [{}] in feed {}", article.id, article.feed_id);
        }
    }
    Ok(())
}

pub fn set_valid(ctx: &AppContext, id: i64, valid: bool) -> anyhow::Result<()> {
    ctx.store.set_article_valid(id, valid)?;
    println!(
        "Article {} marked {}",
        id,
        if valid { "valid" } else { "invalid" }
    );
    Ok(())
}

pub fn like(ctx: &AppContext, id: i64) -> anyhow::Result<()> {
    let likes = ctx.store.like_article(id)?;
    println!("Article {} now has {} likes", id, likes);
    Ok(())
}

pub fn stats(ctx: &AppContext) -> anyhow::Result<()> {
    let feeds = ctx.store.get_all_feeds()?.len();
    let articles = ctx.store.count_articles()?;
    let cached = CacheStore::count(ctx.store.as_ref())?;

    println!("Feeds:          {}", feeds);
    println!("Articles:       {}", articles);
    println!("Cached content: {}", cached);
    Ok(())
}

fn print_entry(entry: &CacheEntry, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    println!("{}", entry.title);
    println!("  {}", entry.url);
    println!("  Published: {}", entry.publication_date.format("%Y-%m-%d %H:%M"));
    if !entry.image.is_empty() {
        println!("  Image: {}", entry.image);
    }
    if !entry.comment_url.is_empty() {
        println!("  Comments: {}", entry.comment_url);
    }
    for enclosure in &entry.enclosures {
        println!("  Enclosure: {}", enclosure.url);
    }
    println!("\n{}\n", entry.excerpt);
    println!("({} characters of content)", entry.content.chars().count());
    Ok(())
}
