//! Run controller
//!
//! One run crawls a query, saves the snapshot, compares it with the previous
//! snapshot of the same query, reports what is new and applies retention.

use crate::config::Config;
use crate::crawler::{FetchClient, PageExtractor, PageSource, Paginator};
use crate::diff::{self, Status};
use crate::output::{
    report_classification, report_new_records, report_previous_snapshot, Marker, Narrator,
};
use crate::query::Query;
use crate::record::{dedup, Record};
use crate::state::StopReason;
use crate::storage::{SnapshotId, SnapshotStore};
use crate::{ListwatchError, Result};
use std::io::Write;
use std::path::PathBuf;

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Snapshot written by this run
    pub snapshot: SnapshotId,
    /// Snapshot the run was compared against, if one could be read
    pub previous: Option<SnapshotId>,
    /// Unique records in this run's snapshot
    pub total: usize,
    /// Records not present in the previous snapshot, in crawl order
    pub new_records: Vec<Record>,
    pub stop: StopReason,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The crawl found nothing; no snapshot was written
    Empty { stop: StopReason },
    Completed(RunReport),
}

/// Wires crawling, storage, diffing and reporting into one run
pub struct RunController<S: PageSource> {
    config: Config,
    source: S,
    extractor: PageExtractor,
    store: SnapshotStore,
}

impl RunController<FetchClient> {
    /// Creates a controller that fetches over HTTP
    pub fn from_config(config: Config, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let source = FetchClient::new(&config)?;
        Self::new(config, source, data_dir)
    }
}

impl<S: PageSource> RunController<S> {
    pub fn new(config: Config, source: S, data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            config,
            source,
            extractor: PageExtractor::new()?,
            store: SnapshotStore::new(data_dir),
        })
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Performs one complete run for `query`
    ///
    /// A blank query is rejected before anything is fetched. After that, only a
    /// failure to write the snapshot aborts the run. Everything narrated after the
    /// snapshot is saved is mirrored into its `.txt` log.
    pub async fn run<W: Write>(
        &self,
        query: &Query,
        narrator: &mut Narrator<W>,
    ) -> Result<RunOutcome> {
        if query.is_empty() {
            narrator.say(Marker::Error, "Search query is empty.");
            return Err(ListwatchError::EmptyQuery);
        }

        narrator.say(Marker::Search, format!("Searching listings for '{}'...", query));

        let crawl = Paginator::new(
            &self.source,
            &self.extractor,
            &self.config.search.base_url,
        )
        .with_legacy_offset(self.config.search.legacy_offset_pagination)
        .crawl(query, narrator)
        .await;

        let records = dedup(crawl.records);
        if records.is_empty() {
            narrator.say(
                Marker::Error,
                "No records found after crawling every page. Nothing was saved.",
            );
            return Ok(RunOutcome::Empty { stop: crawl.stop });
        }

        let snapshot = self.store.save(&records, query)?;
        narrator.say(
            Marker::Success,
            format!("Data saved to '{}'", snapshot.path().display()),
        );

        if let Err(e) = narrator.mirror_to(&snapshot.log_path()) {
            tracing::warn!(
                "Could not create run log {}: {}",
                snapshot.log_path().display(),
                e
            );
            narrator.say(Marker::Warning, "Run log could not be created.");
        }

        let previous = self.load_previous(query, &snapshot, narrator);

        report_previous_snapshot(
            narrator,
            (&snapshot, records.len()),
            previous.as_ref().map(|(id, records)| (id, records.len())),
        );

        let classified = diff::classify(
            &records,
            previous.as_ref().map(|(_, records)| records.as_slice()),
        );
        report_classification(narrator, &classified);

        let new_records: Vec<Record> = classified
            .iter()
            .filter(|(_, status)| *status == Status::New)
            .map(|(record, _)| (*record).clone())
            .collect();
        report_new_records(narrator, &new_records);

        self.apply_retention(query, narrator);
        narrator.stop_mirroring();

        tracing::info!(
            "Run for '{}' finished: {} records, {} new",
            query,
            records.len(),
            new_records.len()
        );

        Ok(RunOutcome::Completed(RunReport {
            snapshot,
            previous: previous.map(|(id, _)| id),
            total: records.len(),
            new_records,
            stop: crawl.stop,
        }))
    }

    /// Finds and reads the previous snapshot; any failure means "no previous"
    fn load_previous<W: Write>(
        &self,
        query: &Query,
        current: &SnapshotId,
        narrator: &mut Narrator<W>,
    ) -> Option<(SnapshotId, Vec<Record>)> {
        let id = match self.store.find_previous(query, current) {
            Ok(id) => id?,
            Err(e) => {
                tracing::warn!("Could not list previous snapshots: {}", e);
                narrator.say(Marker::Warning, "Previous snapshots could not be listed.");
                return None;
            }
        };

        match self.store.load(&id) {
            Ok(records) => Some((id, dedup(records))),
            Err(e) => {
                tracing::warn!("{}", e);
                narrator.say(
                    Marker::Warning,
                    format!(
                        "Previous snapshot '{}' could not be read; treating every record as new.",
                        id.file_name()
                    ),
                );
                None
            }
        }
    }

    fn apply_retention<W: Write>(&self, query: &Query, narrator: &mut Narrator<W>) {
        let report = match self.store.retain(query, self.config.storage.keep) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Retention for '{}' skipped: {}", query, e);
                narrator.say(
                    Marker::Warning,
                    format!("Old snapshots could not be cleaned up: {}", e),
                );
                return;
            }
        };

        for path in &report.deleted {
            narrator.say(Marker::Delete, format!("Deleted old file: {}", path.display()));
        }
        for (path, reason) in &report.failed {
            narrator.say(
                Marker::Warning,
                format!("Could not delete {}: {}", path.display(), reason),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, FetchFailure, PageBody};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    /// Answers every URL with the same body, or fails every fetch
    struct FixedSource(Option<String>);

    #[async_trait]
    impl PageSource for FixedSource {
        async fn fetch(&self, url: &str) -> std::result::Result<PageBody, FetchFailure> {
            match &self.0 {
                Some(body) => Ok(PageBody {
                    url: url.to_string(),
                    final_url: url.to_string(),
                    status_code: 200,
                    body: body.clone(),
                }),
                None => Err(FetchFailure {
                    url: url.to_string(),
                    attempts: 3,
                    last: FetchError::Timeout,
                }),
            }
        }
    }

    fn listing(items: &[(&str, &str)]) -> String {
        items
            .iter()
            .enumerate()
            .map(|(i, (title, price))| {
                format!(
                    r#"<li class="ui-search-layout__item"><a href="https://example.com/{}">{}</a><span class="andes-money-amount__fraction">{}</span></li>"#,
                    i, title, price
                )
            })
            .collect()
    }

    fn controller(dir: &TempDir, body: Option<String>) -> RunController<FixedSource> {
        RunController::new(Config::default(), FixedSource(body), dir.path().join("data")).unwrap()
    }

    fn old_snapshot(store: &SnapshotStore, query: &Query, day: u32, records: &[Record]) -> SnapshotId {
        let taken_at = NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        store.save_at(records, query, taken_at).unwrap()
    }

    fn completed(outcome: RunOutcome) -> RunReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            other => panic!("expected a completed run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_crawl_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&dir, None);
        let mut narrator = Narrator::new(Vec::new());

        let outcome = controller.run(&Query::new("hilux"), &mut narrator).await.unwrap();

        assert_eq!(outcome, RunOutcome::Empty { stop: StopReason::FetchFailed });
        assert!(controller.store().list_all().unwrap().is_empty());
        let out = String::from_utf8(narrator.into_console()).unwrap();
        assert!(out.contains("❌ No records found"));
    }

    #[tokio::test]
    async fn test_first_run_reports_everything_new() {
        let dir = TempDir::new().unwrap();
        let body = listing(&[("Hilux SRV", "100"), ("Hilux SR", "90")]);
        let controller = controller(&dir, Some(body));
        let mut narrator = Narrator::new(Vec::new());

        let report = completed(
            controller
                .run(&Query::new("hilux"), &mut narrator)
                .await
                .unwrap(),
        );

        assert_eq!(report.total, 2);
        assert_eq!(report.new_records.len(), 2);
        assert_eq!(report.previous, None);
        assert_eq!(report.stop, StopReason::NoNextPage);
        assert!(report.snapshot.path().exists());

        let log = fs::read_to_string(report.snapshot.log_path()).unwrap();
        assert!(log.contains("🆕 Hilux SRV - $ 100 - NEW LISTING"));
        assert!(log.contains("https://example.com/1"));
        // Crawl progress precedes the log file
        assert!(!log.contains("Search URL"));
        assert!(String::from_utf8(narrator.into_console())
            .unwrap()
            .contains("Search URL"));
    }

    #[tokio::test]
    async fn test_only_changed_prices_are_new() {
        let dir = TempDir::new().unwrap();
        let query = Query::new("hilux");
        let body = listing(&[("Hilux SRV", "100"), ("Hilux SRV", "120"), ("Hilux SR", "90")]);
        let controller = controller(&dir, Some(body));
        let previous = old_snapshot(
            controller.store(),
            &query,
            1,
            &[
                Record::new("Hilux SRV", "100", "https://example.com/a"),
                Record::new("Hilux SR", "90", "https://example.com/b"),
            ],
        );

        let mut narrator = Narrator::new(Vec::new());
        let report = completed(controller.run(&query, &mut narrator).await.unwrap());

        assert_eq!(report.previous, Some(previous));
        assert_eq!(report.new_records.len(), 1);
        assert_eq!(report.new_records[0].price, "120");

        let log = fs::read_to_string(report.snapshot.log_path()).unwrap();
        assert!(log.contains("🔁 Hilux SR - $ 90 - seen before"));
        assert!(log.contains("Previous snapshot found: 'hilux_20200101_100000.json' (01/01/2020, 10:00:00)"));
    }

    #[tokio::test]
    async fn test_unreadable_previous_means_all_new() {
        let dir = TempDir::new().unwrap();
        let query = Query::new("hilux");
        let controller = controller(&dir, Some(listing(&[("Hilux SRV", "100")])));
        let broken = old_snapshot(controller.store(), &query, 1, &[]);
        fs::write(broken.path(), "{ not a list").unwrap();

        let mut narrator = Narrator::new(Vec::new());
        let report = completed(controller.run(&query, &mut narrator).await.unwrap());

        assert_eq!(report.previous, None);
        assert_eq!(report.new_records.len(), 1);
        let out = String::from_utf8(narrator.into_console()).unwrap();
        assert!(out.contains("⚠️ Previous snapshot 'hilux_20200101_100000.json' could not be read"));
    }

    #[tokio::test]
    async fn test_retention_after_run() {
        let dir = TempDir::new().unwrap();
        let query = Query::new("hilux");
        let records = vec![Record::new("Hilux SRV", "100", "https://example.com/0")];
        let controller = controller(&dir, Some(listing(&[("Hilux SRV", "100")])));

        let oldest = old_snapshot(controller.store(), &query, 1, &records);
        fs::write(oldest.log_path(), "old log").unwrap();
        old_snapshot(controller.store(), &query, 2, &records);
        old_snapshot(controller.store(), &query, 3, &records);
        let other = old_snapshot(controller.store(), &Query::new("corolla"), 1, &records);

        let mut narrator = Narrator::new(Vec::new());
        let report = completed(controller.run(&query, &mut narrator).await.unwrap());

        assert!(report.new_records.is_empty());
        assert_eq!(controller.store().list(&query).unwrap().len(), 3);
        assert!(!oldest.path().exists());
        assert!(!oldest.log_path().exists());
        assert!(other.path().exists());

        let log = fs::read_to_string(report.snapshot.log_path()).unwrap();
        assert!(log.contains("🗑️ Deleted old file"));
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&dir, Some(listing(&[("Hilux SRV", "100")])));
        let mut narrator = Narrator::new(Vec::new());

        let result = controller.run(&Query::new("   "), &mut narrator).await;

        assert!(matches!(result, Err(ListwatchError::EmptyQuery)));
        assert!(!dir.path().join("data").exists());
        let out = String::from_utf8(narrator.into_console()).unwrap();
        assert!(out.contains("❌ Search query is empty."));
        assert!(!out.contains("Search URL"));
    }

    #[test]
    fn test_retention_failure_is_narrated() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("data");
        fs::write(&not_a_dir, "").unwrap();
        let controller =
            RunController::new(Config::default(), FixedSource(None), &not_a_dir).unwrap();
        let mut narrator = Narrator::new(Vec::new());

        controller.apply_retention(&Query::new("hilux"), &mut narrator);

        let out = String::from_utf8(narrator.into_console()).unwrap();
        assert!(out.contains("⚠️ Old snapshots could not be cleaned up"));
    }
}
