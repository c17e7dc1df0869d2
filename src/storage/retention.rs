//! Retention of snapshots per query

use crate::query::Query;
use crate::storage::{SnapshotId, SnapshotStore, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Outcome of a retention pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    /// Snapshots kept, newest first
    pub kept: Vec<PathBuf>,
    /// Files deleted, including paired logs
    pub deleted: Vec<PathBuf>,
    /// Files that could not be deleted, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl SnapshotStore {
    /// Keeps the `keep` most recently modified snapshots of `query` and deletes the rest
    ///
    /// Each deleted snapshot takes its `.txt` log with it. Snapshots of other
    /// queries are never touched, even when one stem is a prefix of another. A
    /// file that cannot be deleted is recorded in the report and skipped.
    pub fn retain(&self, query: &Query, keep: usize) -> StorageResult<RetentionReport> {
        let mut snapshots: Vec<(SystemTime, SnapshotId)> = self
            .list(query)?
            .into_iter()
            .map(|id| (modified(id.path()), id))
            .collect();

        // Newest first; the embedded timestamp breaks mtime ties
        snapshots.sort_by(|(a_time, a), (b_time, b)| {
            b_time
                .cmp(a_time)
                .then_with(|| b.taken_at().cmp(&a.taken_at()))
                .then_with(|| b.file_name().cmp(&a.file_name()))
        });

        let mut report = RetentionReport::default();
        for (index, (_, id)) in snapshots.into_iter().enumerate() {
            if index < keep {
                report.kept.push(id.path().to_path_buf());
                continue;
            }

            remove(id.path(), &mut report);
            let log = id.log_path();
            if log.exists() {
                remove(&log, &mut report);
            }
        }

        tracing::debug!(
            "Retention for '{}': kept {}, deleted {}, failed {}",
            query,
            report.kept.len(),
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn remove(path: &Path, report: &mut RetentionReport) {
    match fs::remove_file(path) {
        Ok(()) => report.deleted.push(path.to_path_buf()),
        Err(e) => {
            tracing::warn!("Failed to delete {}: {}", path.display(), e);
            report.failed.push((path.to_path_buf(), e.to_string()));
        }
    }
}
