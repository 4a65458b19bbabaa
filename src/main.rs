//! crawlstream: resumable streaming over Common Crawl style datasets

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use crawlstream::config::{Config, LogFormat};
use crawlstream::stream::RunMode;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use commands::RunOptions;

#[derive(Parser)]
#[command(name = "crawlstream")]
#[command(about = "Resumable streaming over Common Crawl style datasets")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "crawlstream.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Dataset location and resume options shared by `stream` and `extract`
#[derive(Args)]
struct RunArgs {
    /// Host serving the dataset (overrides config)
    #[arg(long)]
    hostname: Option<String>,

    /// Path of the segment list on that host (overrides config)
    #[arg(long)]
    index_path: Option<String>,

    /// Segment to start from
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    segment_offset: i64,

    /// Records to skip in the first segment
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    record_offset: i64,

    /// Stop after this many outputs
    #[arg(short, long)]
    limit: Option<u64>,

    /// Checkpoint file to resume from and save progress to
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream records of every segment
    Stream {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Extract URLs from WAT metadata records
    Extract {
        #[command(flatten)]
        run: RunArgs,

        /// URLs to skip, counted from the first streamed record
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        entry_offset: i64,
    },

    /// Show a saved checkpoint
    Checkpoint {
        /// Checkpoint file path
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Stream { run } => {
            let options = resolve(&mut config, RunMode::Records, run, 0)?;
            commands::stream_records(config, options).await
        }
        Commands::Extract { run, entry_offset } => {
            let options = resolve(&mut config, RunMode::Items, run, entry_offset)?;
            commands::extract_items(config, options).await
        }
        Commands::Checkpoint { path } => commands::show_checkpoint(path),
    }
}

fn init_logging(config: &Config, verbose: u8) -> Result<()> {
    let level = config.logging.effective_level(verbose);

    // Logs go to stderr so stdout carries only data
    match config.logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .json()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn resolve(config: &mut Config, mode: RunMode, run: RunArgs, entry_offset: i64) -> Result<RunOptions> {
    if let Some(hostname) = run.hostname {
        config.dataset.hostname = hostname;
    }
    if let Some(index_path) = run.index_path {
        config.dataset.index_path = index_path;
    }
    config.validate()?;

    info!(
        "Dataset: https://{}{}",
        config.dataset.hostname, config.dataset.index_path
    );
    RunOptions::resolve(
        config,
        mode,
        run.checkpoint,
        run.segment_offset,
        run.record_offset,
        entry_offset,
        run.limit,
    )
}
