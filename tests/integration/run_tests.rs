//! Full run cycles against a mock listing site

use listwatch::config::{Config, FetchConfig, SearchConfig, StorageConfig};
use listwatch::output::Narrator;
use listwatch::state::StopReason;
use listwatch::{Query, RunController, RunOutcome, RunReport};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIRST_PAGE: &str = "/toyota-hilux";
const SECOND_PAGE: &str = "/toyota-hilux_Desde_49_NoIndex_True";

/// Creates a test configuration pointing at the mock server, with no pacing
fn create_test_config(base_url: &str, keep: usize) -> Config {
    Config {
        search: SearchConfig {
            base_url: base_url.to_string(),
            ..SearchConfig::default()
        },
        fetch: FetchConfig::without_delays(),
        storage: StorageConfig {
            keep,
            ..StorageConfig::default()
        },
        ..Config::default()
    }
}

/// Renders a result page with the given (title, price, link) items
fn result_page(items: &[(&str, &str, &str)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><section><ol class=\"ui-search-layout\">");
    for (title, price, link) in items {
        html.push_str(&format!(
            r#"<li class="ui-search-layout__item">
                 <div class="poly-card">
                   <a href="{link}" class="poly-component__title">{title}</a>
                   <span class="andes-money-amount">
                     <span class="andes-money-amount__currency-symbol">$</span>
                     <span class="andes-money-amount__fraction">{price}</span>
                   </span>
                 </div>
               </li>"#
        ));
    }
    html.push_str("</ol></section>");
    if let Some(href) = next {
        html.push_str(&format!(
            r#"<nav><ul class="ui-search-andes-pagination andes-pagination">
                 <li class="andes-pagination__button andes-pagination__button--next">
                   <a href="{href}" title="Siguiente">Siguiente</a>
                 </li>
               </ul></nav>"#
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Mounts the two-page listing: the second page repeats one record of the first
async fn mount_two_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(FIRST_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(
            &[
                ("Toyota Hilux 2.8 Srx", "45.000.000", "https://articulo.example.com/MLA-1"),
                ("Toyota Hilux 2.4 Dx", "38.500.000", "https://articulo.example.com/MLA-2"),
            ],
            Some(SECOND_PAGE),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SECOND_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(
            &[("Toyota Hilux 2.4 Dx", "38.500.000", "https://articulo.example.com/MLA-2")],
            None,
        )))
        .mount(server)
        .await;
}

async fn run_once(controller: &RunController<listwatch::crawler::FetchClient>) -> RunReport {
    let mut narrator = Narrator::new(Vec::new());
    match controller
        .run(&Query::new("Toyota Hilux"), &mut narrator)
        .await
        .expect("Run failed")
    {
        RunOutcome::Completed(report) => report,
        other => panic!("Expected a completed run, got {:?}", other),
    }
}

/// Waits long enough for the next snapshot to get a different file name
async fn next_second() {
    tokio::time::sleep(Duration::from_millis(1_100)).await;
}

fn snapshot_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".json"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_two_page_crawl_first_run() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let controller =
        RunController::from_config(create_test_config(&server.uri(), 3), &data_dir).unwrap();

    let report = run_once(&controller).await;

    assert_eq!(report.total, 2);
    assert_eq!(report.new_records.len(), 2);
    assert_eq!(report.previous, None);
    assert_eq!(report.stop, StopReason::NoNextPage);
    assert_eq!(report.new_records[0].price, "45000000");

    // Snapshot written with the on-disk field names
    let content = fs::read_to_string(report.snapshot.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["titulo"], "Toyota Hilux 2.8 Srx");
    assert_eq!(items[0]["precio"], "45000000");
    assert_eq!(items[0]["enlace"], "https://articulo.example.com/MLA-1");
    assert!(report
        .snapshot
        .file_name()
        .starts_with("Toyota_Hilux_"));

    // Run log mirrors the report
    let log = fs::read_to_string(report.snapshot.log_path()).unwrap();
    assert!(log.contains("🆕 Toyota Hilux 2.8 Srx - $ 45000000 - NEW LISTING"));
    assert!(log.contains("🆕 Toyota Hilux 2.4 Dx - $ 38500000 - NEW LISTING"));
    assert!(log.contains("https://articulo.example.com/MLA-2"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_second_run_finds_nothing_new() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let controller =
        RunController::from_config(create_test_config(&server.uri(), 3), dir.path()).unwrap();

    let first = run_once(&controller).await;
    next_second().await;
    let second = run_once(&controller).await;

    assert_ne!(first.snapshot, second.snapshot);
    assert_eq!(second.previous, Some(first.snapshot.clone()));
    assert!(second.new_records.is_empty());

    let log = fs::read_to_string(second.snapshot.log_path()).unwrap();
    assert!(log.contains("seen before"));
    assert!(log.contains("No new records since the previous snapshot."));
}

#[tokio::test]
async fn test_retention_across_runs() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let controller =
        RunController::from_config(create_test_config(&server.uri(), 2), dir.path()).unwrap();

    // A different query sharing the stem prefix must survive
    let unrelated = dir.path().join("Toyota_Hilux_Srv_20200101_000000.json");
    fs::write(&unrelated, "[]").unwrap();

    let first = run_once(&controller).await;
    next_second().await;
    let second = run_once(&controller).await;
    next_second().await;
    let third = run_once(&controller).await;

    assert!(!first.snapshot.path().exists());
    assert!(!first.snapshot.log_path().exists());
    assert!(second.snapshot.path().exists());
    assert!(third.snapshot.path().exists());
    assert!(third.snapshot.log_path().exists());
    assert!(unrelated.exists());

    assert_eq!(snapshot_files(dir.path()).len(), 3);
}

#[tokio::test]
async fn test_blocked_first_page_saves_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FIRST_PAGE))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/gz/account-verification/captcha", server.uri()).as_str()),
        )
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gz/account-verification/captcha"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>verify</html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let controller =
        RunController::from_config(create_test_config(&server.uri(), 3), &data_dir).unwrap();

    let mut narrator = Narrator::new(Vec::new());
    let outcome = controller
        .run(&Query::new("Toyota Hilux"), &mut narrator)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Empty {
            stop: StopReason::FetchFailed
        }
    );
    assert!(snapshot_files(&data_dir).is_empty());
}

#[tokio::test]
async fn test_known_queries_and_purge() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let controller =
        RunController::from_config(create_test_config(&server.uri(), 3), dir.path()).unwrap();

    let report = run_once(&controller).await;
    let store = controller.store();

    assert_eq!(store.known_queries().unwrap(), vec!["Toyota Hilux".to_string()]);

    let results = store
        .latest_results(&Query::new("Toyota Hilux"))
        .unwrap()
        .expect("Stored results");
    assert_eq!(results.current.id, report.snapshot);
    assert_eq!(results.current.count, 2);
    assert_eq!(results.previous, None);
    assert_eq!(results.new_records, report.new_records);

    let deleted = store.purge(&Query::new("Toyota Hilux")).unwrap();
    assert_eq!(deleted.len(), 2);
    assert!(!report.snapshot.path().exists());
    assert!(!report.snapshot.log_path().exists());
    assert!(store.known_queries().unwrap().is_empty());
}
