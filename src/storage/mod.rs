//! Storage module for persisting snapshots
//!
//! Snapshots are flat JSON files in one data directory, named
//! `<query stem>_<YYYYMMDD>_<HHMMSS>.json`. Each may have a paired `.txt` run log
//! with the same base name. This module handles:
//! - Writing and reading snapshots
//! - Finding the previous snapshot of a query
//! - Retention (keeping the newest N snapshots per query)
//! - Listing and purging queries
//! - Reading back the latest comparison without crawling

mod results;
mod retention;
mod snapshot;

pub use results::{LatestResults, SnapshotSummary};
pub use retention::RetentionReport;
pub use snapshot::{SnapshotId, SnapshotStore};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid snapshot file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Cannot name a snapshot after query '{0}'")]
    InvalidName(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path of the file or directory the error is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } => Some(path),
            Self::InvalidName(_) => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
