//! Snapshot files
//!
//! A snapshot is identified by its file name, which embeds the query stem and the
//! local time it was taken. The timestamp is parsed from the fixed-width suffix of
//! the name, so stems that themselves contain digits or `_20` are matched exactly.

use crate::query::Query;
use crate::record::Record;
use crate::storage::{StorageError, StorageResult};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const SNAPSHOT_EXTENSION: &str = "json";
const LOG_EXTENSION: &str = "txt";

/// Width of the `YYYYMMDD_HHMMSS` suffix
const STAMP_LEN: usize = 15;

/// Format of the timestamp embedded in snapshot file names
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Identifies one snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId {
    path: PathBuf,
    stem: String,
    taken_at: NaiveDateTime,
}

impl SnapshotId {
    /// Builds the id of a snapshot of `query` taken at `taken_at` in `dir`
    pub fn new(dir: &Path, query: &Query, taken_at: NaiveDateTime) -> Self {
        let stem = query.file_stem();
        let file_name = format!(
            "{}_{}.{}",
            stem,
            taken_at.format(STAMP_FORMAT),
            SNAPSHOT_EXTENSION
        );
        Self {
            path: dir.join(file_name),
            stem,
            // File names have second resolution
            taken_at: truncate_to_seconds(taken_at),
        }
    }

    /// Parses a snapshot path
    ///
    /// Returns None unless the file name is `<stem>_<YYYYMMDD>_<HHMMSS>.json` with a
    /// non-empty stem and a valid date and time.
    pub fn parse(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let base = name.strip_suffix(".json")?;

        let split = base.len().checked_sub(STAMP_LEN)?;
        if !base.is_char_boundary(split) {
            return None;
        }
        let (head, stamp) = base.split_at(split);
        let stem = head.strip_suffix('_')?;
        if stem.is_empty() {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            stem: stem.to_string(),
            taken_at: parse_stamp(stamp)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Query stem the snapshot belongs to
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Local time embedded in the file name
    pub fn taken_at(&self) -> NaiveDateTime {
        self.taken_at
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path of the run log paired with this snapshot
    pub fn log_path(&self) -> PathBuf {
        self.path.with_extension(LOG_EXTENSION)
    }

    pub fn belongs_to(&self, query: &Query) -> bool {
        self.stem == query.file_stem()
    }
}

/// Parses `YYYYMMDD_HHMMSS` strictly: fixed width, digits only
fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    let bytes = stamp.as_bytes();
    if bytes.len() != STAMP_LEN || bytes[8] != b'_' {
        return None;
    }
    if !bytes[..8].iter().chain(&bytes[9..]).all(u8::is_ascii_digit) {
        return None;
    }

    let num = |range: std::ops::Range<usize>| stamp[range].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(num(0..4)? as i32, num(4..6)?, num(6..8)?)?;
    date.and_hms_opt(num(9..11)?, num(11..13)?, num(13..15)?)
}

fn truncate_to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

/// Flat-file snapshot store rooted at one data directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `records` as the snapshot of `query` taken now
    ///
    /// Two saves of the same query within one second write the same file; the
    /// later one wins.
    pub fn save(&self, records: &[Record], query: &Query) -> StorageResult<SnapshotId> {
        self.save_at(records, query, Local::now().naive_local())
    }

    /// Writes `records` as the snapshot of `query` taken at `taken_at`
    ///
    /// A blank query is rejected: its file could never be found again by
    /// lookup or retention.
    pub fn save_at(
        &self,
        records: &[Record],
        query: &Query,
        taken_at: NaiveDateTime,
    ) -> StorageResult<SnapshotId> {
        if query.is_empty() {
            return Err(StorageError::InvalidName(query.term().to_string()));
        }

        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let id = SnapshotId::new(&self.dir, query, taken_at);
        let json = to_pretty_json(records).map_err(|source| StorageError::Json {
            path: id.path().to_path_buf(),
            source,
        })?;

        fs::write(id.path(), json).map_err(|e| StorageError::io(id.path(), e))?;
        tracing::debug!("Wrote {} records to {}", records.len(), id.path().display());

        Ok(id)
    }

    /// Reads the records of a snapshot
    pub fn load(&self, id: &SnapshotId) -> StorageResult<Vec<Record>> {
        let content = fs::read_to_string(id.path()).map_err(|e| StorageError::io(id.path(), e))?;
        serde_json::from_str(&content).map_err(|source| StorageError::Json {
            path: id.path().to_path_buf(),
            source,
        })
    }

    /// Lists every snapshot in the data directory, oldest first
    ///
    /// A missing data directory holds no snapshots. Files whose names do not
    /// follow the snapshot pattern are ignored.
    pub fn list_all(&self) -> StorageResult<Vec<SnapshotId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            if let Some(id) = SnapshotId::parse(&entry.path()) {
                snapshots.push(id);
            }
        }

        snapshots.sort_by(|a, b| {
            a.taken_at
                .cmp(&b.taken_at)
                .then_with(|| a.file_name().cmp(&b.file_name()))
        });
        Ok(snapshots)
    }

    /// Lists the snapshots of one query, oldest first
    pub fn list(&self, query: &Query) -> StorageResult<Vec<SnapshotId>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|id| id.belongs_to(query))
            .collect())
    }

    /// Finds the most recent snapshot of `query` other than `excluding`
    pub fn find_previous(
        &self,
        query: &Query,
        excluding: &SnapshotId,
    ) -> StorageResult<Option<SnapshotId>> {
        Ok(self
            .list(query)?
            .into_iter()
            .filter(|id| id.path() != excluding.path())
            .last())
    }

    /// Every distinct query with at least one snapshot, alphabetically
    pub fn known_queries(&self) -> StorageResult<Vec<String>> {
        let queries: BTreeSet<String> = self
            .list_all()?
            .iter()
            .map(|id| Query::from_file_stem(id.stem()).term().to_string())
            .collect();
        Ok(queries.into_iter().collect())
    }

    /// Deletes every snapshot of `query` together with its run log
    ///
    /// Returns the deleted paths; empty when the query had no snapshots.
    pub fn purge(&self, query: &Query) -> StorageResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();

        for id in self.list(query)? {
            fs::remove_file(id.path()).map_err(|e| StorageError::io(id.path(), e))?;
            deleted.push(id.path().to_path_buf());

            let log = id.log_path();
            if log.exists() {
                fs::remove_file(&log).map_err(|e| StorageError::io(&log, e))?;
                deleted.push(log);
            }
        }

        tracing::info!("Purged {} file(s) for query '{}'", deleted.len(), query);
        Ok(deleted)
    }
}

/// Serializes with four-space indentation; non-ASCII text is written as-is
fn to_pretty_json(records: &[Record]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;
    Ok(out)
}
