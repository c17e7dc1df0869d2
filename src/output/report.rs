//! Comparison report
//!
//! The report is everything a run narrates after its snapshot is saved, so it is
//! what ends up in the snapshot's `.txt` log.

use super::{Marker, Narrator};
use crate::diff::Status;
use crate::record::Record;
use crate::storage::{LatestResults, SnapshotId};
use chrono::NaiveDateTime;
use std::io::Write;

const SEPARATOR: &str = "____________________________________";

/// Formats a snapshot timestamp as `dd/mm/yyyy, HH:MM:SS`
pub fn format_snapshot_date(taken_at: NaiveDateTime) -> String {
    taken_at.format("%d/%m/%Y, %H:%M:%S").to_string()
}

/// Narrates which snapshot the current one is compared against
///
/// `previous` carries the snapshot and its record count after deduplication.
pub fn report_previous_snapshot<W: Write>(
    narrator: &mut Narrator<W>,
    current: (&SnapshotId, usize),
    previous: Option<(&SnapshotId, usize)>,
) {
    let (current_id, current_count) = current;
    narrator.say(
        Marker::File,
        format!(
            "Current snapshot: '{}' ({}, {} records)",
            current_id.file_name(),
            format_snapshot_date(current_id.taken_at()),
            current_count
        ),
    );

    match previous {
        Some((id, count)) => {
            narrator.say(
                Marker::File,
                format!(
                    "Previous snapshot found: '{}' ({})",
                    id.file_name(),
                    format_snapshot_date(id.taken_at())
                ),
            );
            narrator.say(
                Marker::Count,
                format!("{} unique records in the previous snapshot.", count),
            );
            narrator.blank();
            narrator.say(
                Marker::Search,
                "Comparing current records with the previous snapshot...",
            );
            narrator.blank();
        }
        None => {
            narrator.say(
                Marker::New,
                "No previous snapshot to compare against. Every record is new.",
            );
            narrator.blank();
        }
    }
}

/// Narrates one line per current record with its status
pub fn report_classification<W: Write>(narrator: &mut Narrator<W>, classified: &[(&Record, Status)]) {
    for (record, status) in classified {
        match status {
            Status::New => narrator.say(
                Marker::New,
                format!("{} - $ {} - NEW LISTING", record.title, record.price),
            ),
            Status::Existing => narrator.say(
                Marker::Seen,
                format!("{} - $ {} - seen before", record.title, record.price),
            ),
        }
    }
}

/// Narrates the summary block listing every new record with its link
pub fn report_new_records<W: Write>(narrator: &mut Narrator<W>, new_records: &[Record]) {
    narrator.blank();
    narrator.say(Marker::Plain, SEPARATOR);
    narrator.blank();

    if new_records.is_empty() {
        narrator.say(Marker::Success, "No new records since the previous snapshot.");
    } else {
        narrator.say(
            Marker::New,
            format!("{} new record(s) found:", new_records.len()),
        );
        narrator.blank();
        for record in new_records {
            narrator.say(Marker::Plain, format!("{} - $ {}", record.title, record.price));
            narrator.say(Marker::Plain, &record.link);
            narrator.blank();
        }
    }

    narrator.say(Marker::Plain, SEPARATOR);
}

/// Narrates a stored comparison read back with [`crate::storage::SnapshotStore::latest_results`]
pub fn report_latest_results<W: Write>(narrator: &mut Narrator<W>, results: &LatestResults) {
    narrator.say(
        Marker::File,
        format!(
            "Current results: {} ({} records)",
            format_snapshot_date(results.current.id.taken_at()),
            results.current.count
        ),
    );

    match &results.previous {
        Some(previous) => narrator.say(
            Marker::File,
            format!(
                "Previous results: {} ({} records)",
                format_snapshot_date(previous.id.taken_at()),
                previous.count
            ),
        ),
        None => narrator.say(Marker::New, "No previous results to compare against."),
    }

    report_new_records(narrator, &results.new_records);
}
