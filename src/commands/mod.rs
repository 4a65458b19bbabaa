//! Subcommand implementations

mod checkpoint;
mod extract;
mod stream;

pub use checkpoint::show_checkpoint;
pub use extract::extract_items;
pub use stream::stream_records;

use anyhow::{Context, Result};
use crawlstream::{
    config::Config,
    stream::{Checkpoint, DatasetStreamer, RunMode},
    transport::{HttpTransport, Transport},
    types::{clamp_offset, ResumePoint},
    warc::{TracingParseLog, WarcParser},
    wat::WatRecordFactory,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolved settings for one `stream` or `extract` run
pub struct RunOptions {
    pub hostname: String,
    pub index_path: String,
    pub resume: ResumePoint,
    pub mode: RunMode,
    pub limit: Option<u64>,
    pub checkpoint_path: Option<PathBuf>,
    pub checkpoint_interval: u64,
}

impl RunOptions {
    /// Combine command line offsets with config and an existing checkpoint.
    ///
    /// A checkpoint file that already exists wins over the offsets given on
    /// the command line. It must have been written by a run of the same `mode`.
    pub fn resolve(
        config: &Config,
        mode: RunMode,
        checkpoint: Option<PathBuf>,
        segment_offset: i64,
        record_offset: i64,
        entry_offset: i64,
        limit: Option<u64>,
    ) -> Result<Self> {
        let hostname = config.dataset.hostname.clone();
        let index_path = config.dataset.index_path.clone();
        let checkpoint_path = checkpoint.or_else(|| config.checkpoint.path.clone());

        let mut resume = ResumePoint::new(
            clamp_offset(segment_offset),
            clamp_offset(record_offset),
            clamp_offset(entry_offset),
        );
        if let Some(ref path) = checkpoint_path {
            if let Some(saved) = Checkpoint::load_optional(path)
                .with_context(|| format!("Failed to load checkpoint {}", path.display()))?
            {
                saved.ensure_dataset(&hostname, &index_path)?;
                saved.ensure_mode(mode)?;
                info!(
                    "Resuming from checkpoint {}: segment {}, record {}, entry {}",
                    path.display(),
                    saved.resume.segment_offset,
                    saved.resume.record_offset,
                    saved.resume.entry_offset
                );
                resume = saved.resume;
            }
        }

        Ok(Self {
            hostname,
            index_path,
            resume,
            mode,
            limit,
            checkpoint_path,
            checkpoint_interval: config.checkpoint.interval,
        })
    }
}

/// Build the record streamer described by `config`
pub fn build_streamer(config: &Config, cancel: CancellationToken) -> Result<DatasetStreamer<WarcParser>> {
    let transport = HttpTransport::new(config.fetch.to_transport_config())
        .context("Failed to create HTTP client")?;
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let parser = WarcParser::new().with_factory(WatRecordFactory::provider(&config.dataset.hostname));
    Ok(DatasetStreamer::new(transport, parser)
        .with_index_decompressor(config.dataset.index_decompressor())
        .with_parse_log(Arc::new(TracingParseLog))
        .with_cancellation(cancel))
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current record");
            token.cancel();
        }
    });
    cancel
}

/// Checkpoint kept in step with the output
struct CheckpointWriter {
    checkpoint: Checkpoint,
    path: Option<PathBuf>,
    interval: u64,
    unsaved: u64,
}

impl CheckpointWriter {
    fn new(options: &RunOptions) -> Self {
        Self {
            checkpoint: Checkpoint::new(&options.hostname, &options.index_path, options.resume)
                .with_mode(options.mode),
            path: options.checkpoint_path.clone(),
            interval: options.checkpoint_interval.max(1),
            unsaved: 0,
        }
    }

    fn checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.checkpoint
    }

    /// Count one output. Returns true when a save is due.
    fn advance(&mut self) -> bool {
        self.unsaved += 1;
        self.unsaved >= self.interval
    }

    fn save(&mut self) -> Result<()> {
        if let Some(ref path) = self.path {
            self.checkpoint
                .save(path)
                .with_context(|| format!("Failed to save checkpoint {}", path.display()))?;
        }
        self.unsaved = 0;
        Ok(())
    }

    fn resume_point(&self) -> ResumePoint {
        self.checkpoint.resume
    }
}

/// Stdout closed by the reader, e.g. `crawlstream extract | head`
fn is_broken_pipe(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::BrokenPipe
}
