//! Episodic - Edit Aggregation and Episodic Memory Pipeline
//!
//! Command line entry point: replay recorded host events through the
//! pipeline and browse the resulting episode store.

use anyhow::{anyhow, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use episodic_core::{
    host, EpisodePipeline, EpisodeRecord, FileEpisodeStore, InMemoryEpisodeStore, PipelineConfig,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "episodic")]
#[command(about = "Aggregate edit events into episodic memory records", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (overrides EPISODIC_CONFIG env var and default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay JSON Lines host events through the pipeline
    Replay {
        /// Event file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Episode store directory
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Keep episodes in memory instead of writing them
        #[arg(long)]
        dry_run: bool,

        /// Override the debounce window (milliseconds)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// List stored episodes for one day
    List {
        /// Day to list (YYYY-MM-DD, defaults to today UTC)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Episode store directory
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List days that have stored episodes
    Days {
        /// Episode store directory
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
}

async fn open_input(input: Option<PathBuf>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    Ok(match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open event file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    })
}

async fn run_replay(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    store: Option<PathBuf>,
    dry_run: bool,
    debounce_ms: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(dir) = store {
        config.store_dir = Some(dir);
    }
    if let Some(ms) = debounce_ms {
        config.debounce = Duration::from_millis(ms);
    }
    config.validate()?;

    let pipeline = if dry_run {
        info!("Dry run: episodes are kept in memory");
        EpisodePipeline::new(config, Arc::new(InMemoryEpisodeStore::new()))
    } else {
        EpisodePipeline::from_config(config).await
    };

    let reader = open_input(input).await?;
    let summary = host::replay(&pipeline, reader).await?;
    debug!("Hot resources at end of input: {:?}", pipeline.hot_resources());

    let statistics = pipeline.statistics();
    let queue = pipeline.shutdown().await;

    let report = json!({
        "replay": summary,
        "queue": queue,
        "statistics": statistics.snapshot(10),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn store_dir(config: &PipelineConfig, store: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    store
        .or_else(|| config.store_dir.clone())
        .ok_or_else(|| anyhow!("No episode store configured (use --store or EPISODIC_STORE_DIR)"))
}

fn print_record(record: &EpisodeRecord) {
    println!(
        "{}  {:<12}  {:.2}  {}",
        record.timestamp.format("%H:%M:%S"),
        record.change_kind,
        record.importance,
        record.summary
    );
}

async fn run_list(
    config: PipelineConfig,
    date: Option<NaiveDate>,
    store: Option<PathBuf>,
    as_json: bool,
) -> anyhow::Result<()> {
    let store = FileEpisodeStore::open_existing(store_dir(&config, store)?).await?;
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let records = store.list_day(date).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No episodes for {}", date);
        return Ok(());
    }

    println!("Episodes for {} ({}):", date, records.len());
    for record in &records {
        print_record(record);
    }
    Ok(())
}

async fn run_days(config: PipelineConfig, store: Option<PathBuf>) -> anyhow::Result<()> {
    let store = FileEpisodeStore::open_existing(store_dir(&config, store)?).await?;
    let days = store.list_days().await?;

    if days.is_empty() {
        println!("No episodes in {}", store.root().display());
    }
    for day in days {
        println!("{}", day);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = if cli.verbose && level < Level::DEBUG {
        Level::DEBUG
    } else {
        level
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "episodic={0},episodic_core={0}",
            level.as_str().to_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Episodic v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            input,
            store,
            dry_run,
            debounce_ms,
        } => run_replay(config, input, store, dry_run, debounce_ms).await,
        Commands::List { date, store, json } => run_list(config, date, store, json).await,
        Commands::Days { store } => run_days(config, store).await,
    }
}
