use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use distill::app::AppContext;
use distill::cli::{commands, Cli, Commands};
use distill::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .apply_env();
    if let Some(workers) = cli.workers {
        config.resolver.workers = workers;
    }

    let ctx = AppContext::new(&config)?;

    match cli.command {
        Commands::Ingest { feed_url, path } => {
            commands::ingest(&ctx, &feed_url, &path).await?;
        }
        Commands::Feeds => commands::list_feeds(&ctx)?,
        Commands::Articles { feed, json } => commands::list_articles(&ctx, feed, json)?,
        Commands::Resolve { id, json } => commands::resolve(&ctx, id, json).await?,
        Commands::ResolveAll { feed } => commands::resolve_all(&ctx, feed).await?,
        Commands::Show { url, json } => commands::show(&ctx, &url, json)?,
        Commands::SetValid { id, valid } => commands::set_valid(&ctx, id, valid)?,
        Commands::Like { id } => commands::like(&ctx, id)?,
        Commands::Stats => commands::stats(&ctx)?,
    }

    Ok(())
}
