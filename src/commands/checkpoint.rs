use anyhow::{Context, Result};
use crawlstream::stream::{Checkpoint, RunMode};
use std::path::PathBuf;

pub fn show_checkpoint(checkpoint_path: PathBuf) -> Result<()> {
    if !checkpoint_path.exists() {
        anyhow::bail!("Checkpoint file not found: {}", checkpoint_path.display());
    }

    let checkpoint = Checkpoint::load(&checkpoint_path)
        .with_context(|| format!("Failed to load checkpoint {}", checkpoint_path.display()))?;
    let resume = checkpoint.resume;

    println!("\nCheckpoint Status");
    println!("=================");
    println!("Dataset:        https://{}{}", checkpoint.hostname, checkpoint.index_path);
    println!("Mode:           {}", checkpoint.mode);
    println!("Segment offset: {}", resume.segment_offset);
    println!("Record offset:  {}", resume.record_offset);
    if checkpoint.mode == RunMode::Items {
        println!("Entry offset:   {}", resume.entry_offset);
    }
    println!("Emitted:        {}", checkpoint.emitted);
    println!("Timestamp:      {}", checkpoint.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));

    println!("\nTo resume, run:");
    match checkpoint.mode {
        RunMode::Records => println!(
            "  crawlstream stream --checkpoint {}",
            checkpoint_path.display()
        ),
        RunMode::Items => println!(
            "  crawlstream extract --checkpoint {}",
            checkpoint_path.display()
        ),
    }

    Ok(())
}
