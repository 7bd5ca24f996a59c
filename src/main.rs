//! Binary entry point for dupmeter.
//!
//! This binary provides the CLI interface for the dupmeter deduplication
//! service.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use dupmeter::config::DupmeterConfig;
use dupmeter::http::{self, AppState};
use dupmeter::observability::{self, InitOptions};
use dupmeter::storage::DedupStore;
use dupmeter::{DedupService, SqliteDedupStore};

/// Dupmeter - an HTTP service that counts duplicate JSON submissions.
#[derive(Parser)]
#[command(name = "dupmeter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service.
    Serve {
        /// Host address to bind.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind.
        #[arg(short, long)]
        port: Option<u16>,

        /// Path of the SQLite database file.
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print store statistics.
    Stats {
        /// Path of the SQLite database file.
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show status.
    Status,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before reading configuration so DUPMETER_* overrides apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    if let Err(e) = observability::init(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the selected command.
async fn run_command(cli: Cli, config: DupmeterConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            database,
        } => cmd_serve(config, host, port, database).await,

        Commands::Stats { database } => cmd_stats(config, database),

        Commands::Status => cmd_status(&config),
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> Result<DupmeterConfig, Box<dyn std::error::Error>> {
    // If a path is provided, load from that file
    if let Some(config_path) = path {
        let config = DupmeterConfig::load_from_file(std::path::Path::new(config_path))?;
        return Ok(config.apply_env_overrides());
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var("DUPMETER_CONFIG_PATH") {
        if !config_path.trim().is_empty() {
            let config = DupmeterConfig::load_from_file(std::path::Path::new(&config_path))?;
            return Ok(config.apply_env_overrides());
        }
    }

    // Otherwise, load from default location
    Ok(DupmeterConfig::load_default().apply_env_overrides())
}

/// Serve command.
async fn cmd_serve(
    mut config: DupmeterConfig,
    host: Option<String>,
    port: Option<u16>,
    database: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(database) = database {
        config = config.with_database_path(database);
    }

    let store = SqliteDedupStore::new(&config.database_path)?;
    let service = DedupService::new(Arc::new(store));
    let state = AppState::new(service);

    http::serve(state, &config.host, config.port).await?;

    Ok(())
}

/// Stats command.
fn cmd_stats(
    config: DupmeterConfig,
    database: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = database.unwrap_or(config.database_path);
    let store = SqliteDedupStore::new(path)?;
    let stats = store.statistics()?;

    println!("Total submissions:     {}", stats.total_submissions);
    println!("Duplicate submissions: {}", stats.duplicate_submissions);
    println!("Duplicate rate:        {:.2}%", stats.duplicate_rate());

    Ok(())
}

/// Status command.
fn cmd_status(config: &DupmeterConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Dupmeter Status");
    println!("===============");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let db_status = if config.database_path.exists() {
        "Available"
    } else {
        "Not initialized"
    };
    println!("Database: {db_status}");
    println!("  Path: {}", config.database_path.display());

    if config.database_path.exists() {
        let store = SqliteDedupStore::new(&config.database_path)?;
        println!("  Entries: {}", store.count()?);
    }

    println!();
    println!("HTTP Bind: {}:{}", config.host, config.port);

    Ok(())
}
