//! Output module for narrating a run
//!
//! This module handles:
//! - The two-sink narrator that mirrors console output into a run log
//! - Formatting the comparison report and the new-records summary

mod narrator;
mod report;

pub use narrator::{Marker, Narrator};
pub use report::{
    format_snapshot_date, report_classification, report_latest_results, report_new_records,
    report_previous_snapshot,
};
