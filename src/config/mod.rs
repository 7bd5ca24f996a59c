//! Configuration management.
//!
//! Configuration is resolved in layers, lowest precedence first:
//!
//! 1. Built-in defaults ([`DupmeterConfig::default`])
//! 2. A TOML config file (`--config`, `DUPMETER_CONFIG_PATH`, or the
//!    platform config directory)
//! 3. `DUPMETER_*` environment variables
//! 4. Command-line flags
//!
//! # Example config file
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! database_path = "/var/lib/dupmeter/dupmeter.db"
//!
//! [observability]
//! log_format = "json"
//! metrics_enabled = true
//! metrics_port = 9090
//! ```

use serde::Deserialize;
use std::path::PathBuf;

use crate::observability::LogFormat;

/// Runtime configuration for the deduplication service.
#[derive(Debug, Clone)]
pub struct DupmeterConfig {
    /// Host address the HTTP server binds.
    pub host: String,
    /// Port the HTTP server binds.
    pub port: u16,
    /// Path of the `SQLite` database file.
    pub database_path: PathBuf,
    /// Output format for logs.
    pub log_format: LogFormat,
    /// Whether the Prometheus exporter is started.
    pub metrics_enabled: bool,
    /// Port the Prometheus exporter binds.
    pub metrics_port: u16,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// HTTP bind host.
    pub host: Option<String>,
    /// HTTP bind port.
    pub port: Option<u16>,
    /// Database file path.
    pub database_path: Option<String>,
    /// Observability settings.
    pub observability: Option<ConfigFileObservability>,
}

/// Observability section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileObservability {
    /// Log output format, `"pretty"` or `"json"`.
    pub log_format: Option<String>,
    /// Whether the Prometheus exporter is started.
    pub metrics_enabled: Option<bool>,
    /// Port the Prometheus exporter binds.
    pub metrics_port: Option<u16>,
}

impl Default for DupmeterConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("dupmeter.db"),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl DupmeterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("failed to read config file: {e}")))?;

        let file: ConfigFile = toml::from_str(&contents)
            .map_err(|e| crate::Error::Config(format!("failed to parse config file: {e}")))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/dupmeter/` on macOS)
    /// 2. XDG config dir (`~/.config/dupmeter/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        // Check platform-specific config dir first
        let platform_config = base_dirs.config_dir().join("dupmeter").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/dupmeter/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("dupmeter")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `DupmeterConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(database_path) = file.database_path {
            config.database_path = PathBuf::from(database_path);
        }
        if let Some(observability) = file.observability {
            if let Some(format) = observability.log_format {
                config.log_format = LogFormat::parse(&format);
            }
            if let Some(v) = observability.metrics_enabled {
                config.metrics_enabled = v;
            }
            if let Some(v) = observability.metrics_port {
                config.metrics_port = v;
            }
        }

        config
    }

    /// Applies `DUPMETER_*` environment variable overrides.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `DUPMETER_HOST` | `host` |
    /// | `DUPMETER_PORT` | `port` |
    /// | `DUPMETER_DATABASE_PATH` | `database_path` |
    /// | `DUPMETER_LOG_FORMAT` | `log_format` |
    /// | `DUPMETER_METRICS_ENABLED` | `metrics_enabled` |
    /// | `DUPMETER_METRICS_PORT` | `metrics_port` |
    #[must_use]
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("DUPMETER_HOST") {
            self.host = host;
        }
        if let Some(port) = parse_port_env("DUPMETER_PORT") {
            self.port = port;
        }
        if let Some(path) = std::env::var_os("DUPMETER_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(format) = std::env::var("DUPMETER_LOG_FORMAT") {
            self.log_format = LogFormat::parse(&format);
        }
        if let Some(enabled) = parse_bool_env("DUPMETER_METRICS_ENABLED") {
            self.metrics_enabled = enabled;
        }
        if let Some(port) = parse_port_env("DUPMETER_METRICS_PORT") {
            self.metrics_port = port;
        }
        self
    }

    /// Sets the HTTP bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the HTTP bind port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the database file path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}

fn parse_bool_env(var: &str) -> Option<bool> {
    std::env::var(var)
        .ok()
        .and_then(|value| match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn parse_port_env(var: &str) -> Option<u16> {
    std::env::var(var).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DupmeterConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("dupmeter.db"));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.metrics_enabled);
        assert_eq!(config.metrics_port, 9090);
    }

    #[test]
    fn test_from_config_file_full() {
        let file: ConfigFile = toml::from_str(
            r#"
            host = "0.0.0.0"
            port = 9000
            database_path = "/tmp/dedup.db"

            [observability]
            log_format = "json"
            metrics_enabled = true
            metrics_port = 9100
            "#,
        )
        .unwrap();

        let config = DupmeterConfig::from_config_file(file);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/dedup.db"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.metrics_enabled);
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_from_config_file_partial() {
        let file: ConfigFile = toml::from_str("port = 3000").unwrap();

        let config = DupmeterConfig::from_config_file(file);
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.database_path, PathBuf::from("dupmeter.db"));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_unrecognized_log_format_falls_back_to_pretty() {
        let file: ConfigFile = toml::from_str(
            r#"
            [observability]
            log_format = "xml"
            "#,
        )
        .unwrap();

        let config = DupmeterConfig::from_config_file(file);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "host = \"10.0.0.1\"\nport = 8888\n").unwrap();

        let config = DupmeterConfig::load_from_file(&path).unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 8888);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = DupmeterConfig::load_from_file(std::path::Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        let result = DupmeterConfig::load_from_file(&path);
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_builders() {
        let config = DupmeterConfig::new()
            .with_host("0.0.0.0")
            .with_port(8081)
            .with_database_path("/tmp/other.db");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
    }
}
