//! Latest stored comparison of a query, read back without crawling

use crate::diff::diff;
use crate::query::Query;
use crate::record::{dedup, Record};
use crate::storage::{SnapshotId, SnapshotStore, StorageResult};

/// A stored snapshot and its number of unique records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub count: usize,
}

/// The newest snapshot of a query compared with the one before it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestResults {
    pub current: SnapshotSummary,
    /// None when the query has a single snapshot or the older one is unreadable
    pub previous: Option<SnapshotSummary>,
    /// Records of `current` not present in `previous`, in snapshot order
    pub new_records: Vec<Record>,
}

impl SnapshotStore {
    /// Compares the two newest snapshots of `query`
    ///
    /// Returns None when the query has no snapshot. Snapshots are ordered by the
    /// timestamp in their names, as for [`SnapshotStore::find_previous`]. An
    /// unreadable newest snapshot is an error; an unreadable older one is treated
    /// as missing, so every record counts as new.
    pub fn latest_results(&self, query: &Query) -> StorageResult<Option<LatestResults>> {
        let mut snapshots = self.list(query)?;

        let current_id = match snapshots.pop() {
            Some(id) => id,
            None => return Ok(None),
        };
        let current = dedup(self.load(&current_id)?);

        let previous = match snapshots.pop() {
            Some(id) => match self.load(&id) {
                Ok(records) => Some((id, dedup(records))),
                Err(e) => {
                    tracing::warn!("{}; treating every record as new", e);
                    None
                }
            },
            None => None,
        };

        let new_records = diff(&current, previous.as_ref().map(|(_, records)| records.as_slice()));

        Ok(Some(LatestResults {
            current: SnapshotSummary {
                id: current_id,
                count: current.len(),
            },
            previous: previous.map(|(id, records)| SnapshotSummary {
                id,
                count: records.len(),
            }),
            new_records,
        }))
    }
}
