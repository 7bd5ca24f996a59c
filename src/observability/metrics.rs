//! Prometheus metrics exporter.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::DupmeterConfig;
use crate::{Error, Result};

/// Metrics exporter configuration.
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Whether the exporter is started.
    pub enabled: bool,
    /// Address the scrape endpoint binds.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from runtime config.
    #[must_use]
    pub fn from_config(config: &DupmeterConfig) -> Self {
        Self {
            enabled: config.metrics_enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.metrics_port),
        }
    }
}

/// Installs the Prometheus metrics recorder and HTTP listener.
///
/// Does nothing when the exporter is disabled. The listener serves the
/// standard `/metrics` scrape path.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed, typically because
/// another recorder is already registered or the listener port is taken.
pub fn install_prometheus(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| Error::Config(format!("failed to install metrics exporter: {e}")))
}
