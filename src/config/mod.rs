//! Configuration module for Listwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All settings have defaults, so a configuration file is optional.
//!
//! # Example
//!
//! ```no_run
//! use listwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("listwatch.toml")).unwrap();
//! println!("Keeping {} snapshots per query", config.storage.keep);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, HeaderConfig, SearchConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
