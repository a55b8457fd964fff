pub mod commands;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "distill")]
#[command(about = "Resolve syndicated articles into readable content", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/distill/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of parallel resolutions for resolve-all (overrides config)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load articles from a local feed document
    Ingest {
        /// URL the feed is published at
        feed_url: String,
        /// Path to the RSS/Atom/JSON Feed document
        path: PathBuf,
    },
    /// List feeds
    Feeds,
    /// List articles
    Articles {
        /// Only articles of this feed
        #[arg(long)]
        feed: Option<i64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Resolve readable content for one article
    Resolve {
        /// Article id
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Resolve every valid article
    ResolveAll {
        /// Only articles of this feed
        #[arg(long)]
        feed: Option<i64>,
    },
    /// Show the cached content for a URL
    Show {
        url: String,
        #[arg(long)]
        json: bool,
    },
    /// Mark an article valid or invalid
    SetValid {
        id: i64,
        #[arg(action = ArgAction::Set)]
        valid: bool,
    },
    /// Like an article
    Like { id: i64 },
    /// Show store counters
    Stats,
}
