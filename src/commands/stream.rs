use anyhow::{Context, Result};
use crawlstream::{config::Config, stream::StreamError};
use std::io::{self, BufWriter, Write};
use tracing::{info, warn};

use super::{build_streamer, cancel_on_ctrl_c, is_broken_pipe, CheckpointWriter, RunOptions};

/// Print one line per record: segment, record, WARC type and target URI
pub async fn stream_records(config: Config, options: RunOptions) -> Result<()> {
    let streamer = build_streamer(&config, cancel_on_ctrl_c())?;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let records = streamer
            .stream_from(&options.hostname, &options.index_path, &options.resume)
            .context("Failed to open dataset")?;

        let mut checkpoint = CheckpointWriter::new(&options);
        let mut out = BufWriter::new(io::stdout().lock());
        let mut emitted = 0u64;
        let mut failure = None;

        for result in records {
            let record = match result {
                Ok(record) => record,
                Err(StreamError::Cancelled) => {
                    warn!("Streaming cancelled");
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            let written = writeln!(
                out,
                "{}\t{}\t{}\t{}",
                record.segment.index,
                record.record.index,
                record.record.value.kind(),
                record.record.value.target_uri().unwrap_or("-")
            );
            match written {
                Ok(()) => {}
                Err(e) if is_broken_pipe(&e) => break,
                Err(e) => return Err(e.into()),
            }

            checkpoint.checkpoint_mut().record_emitted(&record);
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
            "Streamed {} records; resume with --segment-offset {} --record-offset {}",
            emitted, resume.segment_offset, resume.record_offset
        );

        match failure {
            Some(e) => Err(anyhow::Error::new(e).context("Streaming stopped")),
            None => Ok(()),
        }
    })
    .await
    .context("Streaming task panicked")?
}
