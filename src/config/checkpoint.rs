//! Checkpoint configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress checkpointing for long runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Default checkpoint file, used when no `--checkpoint` flag is given
    pub path: Option<PathBuf>,
    /// Save a checkpoint every N emitted records or items
    pub interval: u64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: None,
            interval: 1000,
        }
    }
}
