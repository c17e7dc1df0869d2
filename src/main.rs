//! Listwatch main entry point
//!
//! This is the command-line interface for the Listwatch listing watcher.

use clap::Parser;
use listwatch::config::{load_config_with_hash, Config};
use listwatch::output::Narrator;
use listwatch::{Query, RunController, RunOutcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Configuration file looked up beside the executable
const CONFIG_FILE_NAME: &str = "listwatch.toml";

/// Listwatch: crawls a search listing and reports what is new since last time
///
/// Every run stores a timestamped snapshot of all listed items and compares it
/// with the previous snapshot of the same search.
#[derive(Parser, Debug)]
#[command(name = "listwatch")]
#[command(version = "1.0.0")]
#[command(about = "Reports new listings since the previous run", long_about = None)]
struct Cli {
    /// Search term; defaults to the configured default query
    #[arg(value_name = "QUERY")]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging();

    let base_dir = executable_dir()?;
    let config = load_configuration(&base_dir)?;

    let query = match cli.query.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => Query::new(term),
        _ => Query::new(&config.search.default_query),
    };

    let data_dir = config.storage.resolve_data_dir(&base_dir);
    tracing::info!("Snapshots are stored in {}", data_dir.display());

    let controller = RunController::from_config(config, data_dir)?;
    let mut narrator = Narrator::stdout();

    match controller.run(&query, &mut narrator).await {
        Ok(RunOutcome::Completed(report)) => {
            tracing::info!(
                "Snapshot {} written with {} new record(s)",
                report.snapshot.file_name(),
                report.new_records.len()
            );
            Ok(())
        }
        Ok(RunOutcome::Empty { stop }) => {
            tracing::warn!("Nothing to save: {}", stop);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber
///
/// Diagnostics go to stderr so they never mix with the report on stdout.
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("listwatch=info,warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Directory containing the running executable
fn executable_dir() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Loads `listwatch.toml` beside the executable, or the defaults when absent
fn load_configuration(base_dir: &std::path::Path) -> Result<Config, Box<dyn std::error::Error>> {
    let path = base_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(Config::default());
    }

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(&path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}
