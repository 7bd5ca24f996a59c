//! Structured logging.

use crate::config::DupmeterConfig;

/// Output format for process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for terminals.
    #[default]
    Pretty,
    /// Newline-delimited JSON for log shippers.
    Json,
}

impl LogFormat {
    /// Parses a format string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset.
    pub default_directives: String,
}

impl LoggingConfig {
    /// Builds logging configuration from runtime config.
    #[must_use]
    pub fn from_config(config: &DupmeterConfig, verbose: bool) -> Self {
        Self {
            format: config.log_format,
            default_directives: if verbose { "debug" } else { "info" }.to_string(),
        }
    }
}
