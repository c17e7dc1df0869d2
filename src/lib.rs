//! Listwatch: a snapshot-and-diff watcher for paginated search listings
//!
//! This crate crawls every page of a search-result listing, extracts the listed
//! items, stores them as a timestamped snapshot and reports which items were not
//! present in the previous snapshot for the same query.

pub mod config;
pub mod crawler;
pub mod diff;
pub mod output;
pub mod query;
pub mod record;
pub mod runner;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Listwatch operations
#[derive(Debug, Error)]
pub enum ListwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Selector error: {0}")]
    Selector(#[from] crawler::SelectorError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search query is empty")]
    EmptyQuery,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid header in config: {0}")]
    InvalidHeader(String),
}

/// Result type alias for Listwatch operations
pub type Result<T> = std::result::Result<T, ListwatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use query::Query;
pub use record::{dedup, Record};
pub use runner::{RunController, RunOutcome, RunReport};
