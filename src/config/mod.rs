//! Configuration for crawlstream

mod checkpoint;
mod dataset;
mod fetch;
mod logging;

pub use checkpoint::CheckpointConfig;
pub use dataset::DatasetConfig;
pub use fetch::FetchConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for every request made by the transport
pub const DEFAULT_USER_AGENT: &str = "crawlstream/0.1 (+https://commoncrawl.org/)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dataset location
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// HTTP fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Progress checkpointing
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Every problem is collected and reported in a single error.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Dataset validation
        let hostname = self.dataset.hostname.trim();
        if hostname.is_empty() {
            errors.push("dataset hostname must not be empty".to_string());
        } else if hostname.contains("://") || hostname.contains('/') {
            errors.push(format!(
                "dataset hostname must be a bare host name, got '{}'",
                self.dataset.hostname
            ));
        }
        if !self.dataset.index_path.starts_with('/') {
            errors.push(format!(
                "dataset index_path must start with '/', got '{}'",
                self.dataset.index_path
            ));
        }

        // Fetch validation
        if self.fetch.user_agent.trim().is_empty() {
            errors.push("fetch user_agent must not be empty".to_string());
        }
        if self.fetch.connect_timeout_secs == 0 {
            errors.push("fetch connect_timeout_secs must be positive".to_string());
        }
        if self.fetch.timeout_secs == Some(0) {
            errors.push("fetch timeout_secs must be positive when set".to_string());
        }
        if self.fetch.max_redirects > 50 {
            errors.push("fetch max_redirects must be <= 50".to_string());
        }

        // Checkpoint validation
        if self.checkpoint.interval == 0 {
            errors.push("checkpoint interval must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
