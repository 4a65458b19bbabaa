//! Dataset location configuration

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::compression::{Compression, Decompressor};

/// Where the segment list lives and how it is encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Host serving both the segment list and the segments
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Absolute path of the segment list on that host
    #[serde(default = "default_index_path")]
    pub index_path: String,
    /// Compression of the segment list. Detected from `index_path` when unset.
    #[serde(default)]
    pub index_compression: Option<Compression>,
}

fn default_hostname() -> String {
    "data.commoncrawl.org".to_string()
}

fn default_index_path() -> String {
    "/crawl-data/CC-MAIN-2021-43/wat.paths.gz".to_string()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            index_path: default_index_path(),
            index_compression: None,
        }
    }
}

impl DatasetConfig {
    /// Codec for the segment list
    pub fn index_decompressor(&self) -> Arc<dyn Decompressor> {
        self.index_compression
            .unwrap_or_else(|| Compression::detect(&self.index_path))
            .decompressor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_compression_detected_from_path() {
        let config = DatasetConfig::default();
        assert_eq!(config.index_compression, None);
        assert_eq!(Compression::detect(&config.index_path), Compression::Gzip);

        let plain = DatasetConfig {
            index_path: "/lists/segments.txt".to_string(),
            ..DatasetConfig::default()
        };
        assert_eq!(Compression::detect(&plain.index_path), Compression::None);
    }
}
