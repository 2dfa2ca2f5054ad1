//! Search & Rank (wkmp-sr) - command-line runner
//!
//! Runs one search session over a JSON-lines capture of candidate files and
//! prints the ranked, filtered view.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use wkmp_common::events::EventBus;
use wkmp_sr::ingest::JsonLinesSource;
use wkmp_sr::services::InMemoryDownloadManager;
use wkmp_sr::view::tier;
use wkmp_sr::{SearchConfig, SearchEngine};

/// Command-line arguments for wkmp-sr
#[derive(Parser, Debug)]
#[command(name = "wkmp-sr")]
#[command(about = "Search & Rank runner for WKMP")]
#[command(version)]
struct Args {
    /// Query text, e.g. "Daft Punk - One More Time flac 320+"
    query: String,

    /// JSON-lines file of candidate results
    #[arg(short, long, env = "WKMP_SR_CANDIDATES")]
    candidates: PathBuf,

    /// Requested bitrate floor (kbps); defaults to the configured filter
    #[arg(long)]
    min_bitrate: Option<u32>,

    /// Upper bound of the preferred bitrate range (kbps)
    #[arg(long)]
    max_bitrate: Option<u32>,

    /// Compare against folder names instead of file names
    #[arg(long)]
    album: bool,

    /// Preset to apply before searching
    #[arg(long)]
    preset: Option<String>,

    /// Config file (overrides WKMP_SR_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum rows to print
    #[arg(long, default_value_t = 25)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before loading config so its lines are kept.
    // RUST_LOG wins over the config file level.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter_layer, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| log_filter("info")));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SearchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if !from_env {
        filter_handle
            .reload(log_filter(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!(candidates = %args.candidates.display(), "Starting WKMP Search & Rank");

    let event_bus = Arc::new(EventBus::new(config.event_capacity));
    let downloads = Arc::new(InMemoryDownloadManager::new(Some(Arc::clone(&event_bus))));
    let source = Arc::new(JsonLinesSource::new(args.candidates.clone()));
    let mut engine = SearchEngine::new(config, source, downloads, event_bus);

    if let Some(preset) = &args.preset {
        engine
            .apply_preset(preset)
            .with_context(|| format!("Failed to apply preset {}", preset))?;
    }

    let min_bitrate = args.min_bitrate.unwrap_or(engine.filter().min_bitrate);
    let max_bitrate = args.max_bitrate.unwrap_or(engine.filter().max_bitrate);
    engine
        .start_search(&args.query, min_bitrate, max_bitrate, args.album)
        .context("Failed to start search")?;
    engine.run_until_idle().await;

    println!(
        "{:<4} {:>8} {:>6} {:>7} {:>5}  {}",
        "TIER", "RANK", "FORMAT", "KBPS", "QUEUE", "FILE"
    );
    for record in engine.results().take(args.limit) {
        println!(
            "{:<4} {:>8.3} {:>6} {:>7} {:>5}  {}",
            tier(record.percentile),
            record.rank,
            record.format,
            record.bitrate,
            record.queue_depth,
            record.filename
        );
    }
    println!();
    println!("{}", engine.status_text());

    Ok(())
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("wkmp_sr={level},wkmp_common={level}"))
}
