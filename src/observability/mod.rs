//! Observability and telemetry.
//!
//! Wires structured logging (`tracing` with pretty or JSON output) and an
//! optional Prometheus scrape endpoint. Initialization happens once per
//! process; a second call fails instead of silently replacing the global
//! subscriber.

mod logging;
mod metrics;

pub use logging::{LogFormat, LoggingConfig};
pub use metrics::{MetricsConfig, install_prometheus};

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::DupmeterConfig;
use crate::{Error, Result};

/// Options for process initialization.
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    /// Whether verbose output was requested via CLI.
    pub verbose: bool,
    /// Whether to expose metrics via HTTP listener.
    pub metrics_expose: bool,
}

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Initializes logging and metrics for the process.
///
/// The log filter honors `RUST_LOG` when set; otherwise it defaults to
/// `info`, or `debug` when verbose output is requested. The metrics
/// listener only starts for long-running commands that ask for it.
///
/// # Errors
///
/// Returns an error if observability has already been initialized or if
/// the metrics exporter fails to install.
pub fn init(config: &DupmeterConfig, options: InitOptions) -> Result<()> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::Config(
            "observability already initialized".to_string(),
        ));
    }

    let logging = LoggingConfig::from_config(config, options.verbose);
    if options.metrics_expose {
        install_prometheus(&MetricsConfig::from_config(config))?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.default_directives));

    // Initialize logging based on format
    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
    }

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::Config("failed to mark observability initialized".to_string()))?;

    Ok(())
}

/// Helper to convert init errors.
#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::Config(e.to_string())
}
