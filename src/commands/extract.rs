use anyhow::{Context, Result};
use crawlstream::{config::Config, stream::{ItemExtractor, StreamError}, wat::WatUrlExtraction};
use std::io::{self, BufWriter, Write};
use tracing::{info, warn};

use super::{build_streamer, cancel_on_ctrl_c, is_broken_pipe, CheckpointWriter, RunOptions};

/// Print one `{entry}: {url}` line per URL found in WAT metadata records
pub async fn extract_items(config: Config, options: RunOptions) -> Result<()> {
    let streamer = build_streamer(&config, cancel_on_ctrl_c())?;
    let extractor = ItemExtractor::new(streamer, WatUrlExtraction::new());

    tokio::task::spawn_blocking(move || -> Result<()> {
        let run = options.resume;
        let mut items = extractor
            .extract_from(&options.hostname, &options.index_path, &run)
            .context("Failed to open dataset")?;

        let mut checkpoint = CheckpointWriter::new(&options);
        let mut out = BufWriter::new(io::stdout().lock());
        let mut emitted = 0u64;
        let mut failure = None;

        for result in items.by_ref() {
            let item = match result {
                Ok(item) => item,
                Err(StreamError::Cancelled) => {
                    warn!("Extraction cancelled");
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            match writeln!(out, "{}", item) {
                Ok(()) => {}
                Err(e) if is_broken_pipe(&e) => break,
                Err(e) => return Err(e.into()),
            }

            checkpoint.checkpoint_mut().item_emitted(&run, &item);
            if checkpoint.advance() {
                out.flush().ok();
                checkpoint.save()?;
            }

            emitted += 1;
            if options.limit.is_some_and(|limit| emitted >= limit) {
                break;
            }
        }

        out.flush().ok();
        checkpoint.save()?;

        let resume = checkpoint.resume_point();
        info!(
            "Extracted {} items ({} produced, skipped ones included)",
            emitted,
            items.items_seen()
        );
        info!(
            "Resume with --segment-offset {} --record-offset {} --entry-offset {}",
            resume.segment_offset, resume.record_offset, resume.entry_offset
        );

        match failure {
            Some(e) => Err(anyhow::Error::new(e).context("Extraction stopped")),
            None => Ok(()),
        }
    })
    .await
    .context("Extraction task panicked")?
}
