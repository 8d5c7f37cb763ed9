// src/bin/cli.rs

//! Command line interface for the content access engine.

use clap::{Parser, Subcommand};
use serde::Serialize;

use si_engine::engine::ContentAccessEngine;
use si_engine::error::Result;
use si_engine::models::{EngineConfig, PublicationType};
use si_engine::search::{SearchFilters, SearchHit};

#[derive(Parser)]
#[command(name = "si-engine")]
#[command(about = "Search and fetch Skolinspektionen publications", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "engine.toml")]
    config: String,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search indexed publications
    Search {
        /// Query text; empty lists the filtered set by date
        #[arg(default_value = "")]
        query: String,

        /// Filter by municipality
        #[arg(long)]
        kommun: Option<String>,

        /// Filter by publication type (e.g. quality-review, press-release)
        #[arg(long = "type")]
        kind: Option<String>,

        /// Filter by publication year
        #[arg(long)]
        year: Option<i32>,

        /// Filter by inspection theme
        #[arg(long)]
        theme: Option<String>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Fetch a publication page as Markdown
    Get {
        /// Publication URL (site-relative or absolute)
        url: String,
    },

    /// Scrape the listing and apply the delta to the index
    Refresh,

    /// Show cache counters and tier sizes
    Stats,

    /// Show engine health
    Health,

    /// Remove expired cache entries
    Sweep,
}

#[derive(Serialize)]
struct SearchResultRow<'a> {
    score: f64,
    relevance: &'static str,
    #[serde(flatten)]
    record: &'a si_engine::models::PublicationRecord,
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::load_or_default(&cli.config);
    let engine = ContentAccessEngine::new(config)?;
    engine.load_state().await?;

    match cli.command {
        Commands::Search {
            query,
            kommun,
            kind,
            year,
            theme,
            limit,
        } => {
            let filters = SearchFilters {
                kommun,
                kind: kind.as_deref().map(PublicationType::from_slug),
                year,
                theme,
            };
            let mut hits = engine.search(&query, &filters);
            if let Some(limit) = limit {
                hits.truncate(limit);
            }
            print_hits(&hits)?;
        }
        Commands::Get { url } => {
            let content = engine.get_content(&url).await?;
            println!("{}", content.markdown);
            log::info!(
                "Fetched {} ({} words)",
                content.metadata.source_url,
                content.metadata.word_count
            );
        }
        Commands::Refresh => {
            let report = engine.refresh_index().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Stats => {
            let stats = engine.cache_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Health => {
            let health = engine.health_check().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Sweep => {
            let removed = engine.sweep_cache().await;
            println!("Removed {removed} expired cache entries");
        }
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit]) -> Result<()> {
    let rows: Vec<SearchResultRow> = hits
        .iter()
        .map(|hit| SearchResultRow {
            score: hit.score,
            relevance: hit.relevance_label(),
            record: &hit.record,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
