//! Logging configuration

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log severity level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level for a `-v` count, or `None` to keep the configured level
    pub fn from_verbosity(verbose: u8) -> Option<Self> {
        match verbose {
            0 => None,
            1 => Some(Self::Debug),
            _ => Some(Self::Trace),
        }
    }

    pub fn as_tracing(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Logging configuration. Output always goes to stderr.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Effective level once the command line verbosity is applied
    pub fn effective_level(&self, verbose: u8) -> Level {
        LogLevel::from_verbosity(verbose)
            .unwrap_or(self.level)
            .as_tracing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_overrides_configured_level() {
        let config = LoggingConfig {
            format: LogFormat::Text,
            level: LogLevel::Warn,
        };
        assert_eq!(config.effective_level(0), Level::WARN);
        assert_eq!(config.effective_level(1), Level::DEBUG);
        assert_eq!(config.effective_level(4), Level::TRACE);
    }
}
