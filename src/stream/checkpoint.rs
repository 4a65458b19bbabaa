//! Resume checkpoints persisted as JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::types::{ExtractedItem, ResumePoint, SegmentRecord};

/// Errors reading or writing a checkpoint file
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checkpoint is for {found}, not {expected}")]
    DatasetMismatch { expected: String, found: String },

    #[error("Checkpoint tracks {found}, not {expected}")]
    ModeMismatch { expected: RunMode, found: RunMode },
}

/// Which sequence a checkpoint tracks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Records,
    Items,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Records => write!(f, "records"),
            RunMode::Items => write!(f, "items"),
        }
    }
}

/// Where a run stopped, and which dataset it was reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub hostname: String,
    pub index_path: String,
    /// Offsets that continue right after the last reported position
    pub resume: ResumePoint,
    #[serde(default)]
    pub mode: RunMode,
    /// Records or items reported by the run that wrote this checkpoint
    pub emitted: u64,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a checkpoint at `resume`
    pub fn new(hostname: impl Into<String>, index_path: impl Into<String>, resume: ResumePoint) -> Self {
        Self {
            hostname: hostname.into(),
            index_path: index_path.into(),
            resume,
            mode: RunMode::default(),
            emitted: 0,
            timestamp: Utc::now(),
        }
    }

    /// Set which sequence this checkpoint tracks
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Move past a reported record
    pub fn record_emitted<R>(&mut self, record: &SegmentRecord<R>) {
        self.resume = ResumePoint::after_record(record);
        self.mode = RunMode::Records;
        self.emitted += 1;
        self.timestamp = Utc::now();
    }

    /// Move past a reported item.
    ///
    /// `run` holds the segment and record offsets the item stream was opened with.
    pub fn item_emitted(&mut self, run: &ResumePoint, item: &ExtractedItem) {
        self.resume = run.after_item(item);
        self.mode = RunMode::Items;
        self.emitted += 1;
        self.timestamp = Utc::now();
    }

    /// Fail unless this checkpoint was written for the given dataset
    pub fn ensure_dataset(&self, hostname: &str, index_path: &str) -> Result<(), CheckpointError> {
        if self.hostname.eq_ignore_ascii_case(hostname) && self.index_path == index_path {
            Ok(())
        } else {
            Err(CheckpointError::DatasetMismatch {
                expected: format!("{}{}", hostname, index_path),
                found: format!("{}{}", self.hostname, self.index_path),
            })
        }
    }

    /// Fail unless this checkpoint tracks the given sequence.
    ///
    /// Item positions only make sense relative to the offsets of the run
    /// that produced them, so the two kinds are never interchangeable.
    pub fn ensure_mode(&self, mode: RunMode) -> Result<(), CheckpointError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(CheckpointError::ModeMismatch {
                expected: mode,
                found: self.mode,
            })
        }
    }

    /// Save checkpoint to file
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(self)?;
        // Atomic replace
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!("Saved checkpoint to {}", path.display());
        Ok(())
    }

    /// Load checkpoint from file
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let json = std::fs::read_to_string(path)?;
        let checkpoint = serde_json::from_str(&json)?;
        Ok(checkpoint)
    }

    /// Load a checkpoint if `path` exists
    pub fn load_optional(path: &Path) -> Result<Option<Self>, CheckpointError> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexedValue;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");

        let mut checkpoint = Checkpoint::new("data.commoncrawl.org", "/wat.paths.gz", ResumePoint::default());
        checkpoint.record_emitted(&SegmentRecord::new(
            IndexedValue::new(4, "https://data.commoncrawl.org/s4".to_string()),
            IndexedValue::new(17, ()),
        ));
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.resume, ResumePoint::new(4, 18, 0));
        assert_eq!(loaded.emitted, 1);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_item_emitted_keeps_run_offsets() {
        let run = ResumePoint::new(2, 5, 0);
        let mut checkpoint = Checkpoint::new("h", "/i", run);
        checkpoint.item_emitted(&run, &ExtractedItem::new(0, "x"));
        checkpoint.item_emitted(&run, &ExtractedItem::new(1, "y"));
        assert_eq!(checkpoint.resume, ResumePoint::new(2, 5, 2));
        assert_eq!(checkpoint.emitted, 2);
        assert_eq!(checkpoint.mode, RunMode::Items);
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = TempDir::new().unwrap();
        assert!(Checkpoint::load_optional(&dir.path().join("none.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_mode_mismatch() {
        let run = ResumePoint::new(3, 7, 0);
        let mut checkpoint = Checkpoint::new("h", "/i", run).with_mode(RunMode::Items);
        assert!(checkpoint.ensure_mode(RunMode::Items).is_ok());

        checkpoint.item_emitted(&run, &ExtractedItem::new(499, "x"));
        let err = checkpoint.ensure_mode(RunMode::Records).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::ModeMismatch {
                expected: RunMode::Records,
                found: RunMode::Items
            }
        ));
        assert_eq!(err.to_string(), "Checkpoint tracks items, not records");
    }

    #[test]
    fn test_dataset_mismatch() {
        let checkpoint = Checkpoint::new("Data.Example.org", "/a.paths.gz", ResumePoint::default());
        assert!(checkpoint.ensure_dataset("data.example.org", "/a.paths.gz").is_ok());
        assert!(matches!(
            checkpoint.ensure_dataset("data.example.org", "/b.paths.gz"),
            Err(CheckpointError::DatasetMismatch { .. })
        ));
    }
}
