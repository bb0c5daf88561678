//! Run loop over page sources: retries, skips, fatal errors and cleanup.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use partscout::config::Config;
use partscout::error::{Result, ScrapeError};
use partscout::export::Accumulator;
use partscout::scrapers::{LocatorChain, PageSource, Pipeline, RunOptions, SnapshotSource};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn pipeline() -> Pipeline {
    Pipeline::from_config(&Config::default()).unwrap()
}

fn quick(retries: u32, session_per_url: bool) -> RunOptions {
    RunOptions {
        retries,
        retry_delay: Duration::ZERO,
        inter_page_delay: Duration::ZERO,
        session_per_url,
    }
}

/// Serves one fixture, failing the first `failures` fetches of every URL
/// with `error`.
struct ScriptedSource {
    html: String,
    failures: u32,
    error: fn(&str) -> ScrapeError,
    fetches: u32,
    failed_so_far: u32,
    resets: u32,
    closed: bool,
}

impl ScriptedSource {
    fn new(failures: u32, error: fn(&str) -> ScrapeError) -> Self {
        Self {
            html: std::fs::read_to_string(fixture_path("product_b.html")).unwrap(),
            failures,
            error,
            fetches: 0,
            failed_so_far: 0,
            resets: 0,
            closed: false,
        }
    }
}

fn navigation(url: &str) -> ScrapeError {
    ScrapeError::Navigation {
        url: url.to_string(),
        reason: "net::ERR_CONNECTION_RESET".to_string(),
    }
}

fn error_page(url: &str) -> ScrapeError {
    ScrapeError::ErrorPage {
        url: url.to_string(),
        reason: "error page (Service Unavailable)".to_string(),
    }
}

fn session_lost(_url: &str) -> ScrapeError {
    ScrapeError::SessionInit("browser exited".to_string())
}

#[async_trait(?Send)]
impl PageSource for ScriptedSource {
    async fn fetch(&mut self, url: &str, _ready: &LocatorChain) -> Result<String> {
        self.fetches += 1;
        if self.failed_so_far < self.failures {
            self.failed_so_far += 1;
            return Err((self.error)(url));
        }
        self.failed_so_far = 0;
        Ok(self.html.clone())
    }

    async fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://shop.test/p{}", i)).collect()
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let mut source = ScriptedSource::new(2, navigation);
    let mut table = Accumulator::seeded();

    let report = pipeline()
        .run(&mut source, &urls(1), &quick(2, false), &mut table, None)
        .await
        .unwrap();

    assert_eq!(source.fetches, 3);
    assert_eq!(report.succeeded, 1);
    assert!(report.failed.is_empty());
    assert_eq!(table.len(), 1);
    assert!(source.closed);
}

#[tokio::test]
async fn error_pages_are_retried_like_load_failures() {
    let mut source = ScriptedSource::new(1, error_page);
    let mut table = Accumulator::seeded();

    let report = pipeline()
        .run(&mut source, &urls(1), &quick(1, false), &mut table, None)
        .await
        .unwrap();

    assert_eq!(source.fetches, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn pages_failing_every_attempt_are_skipped() {
    let mut source = ScriptedSource::new(3, navigation);
    let mut table = Accumulator::seeded();

    let report = pipeline()
        .run(&mut source, &urls(2), &quick(1, false), &mut table, None)
        .await
        .unwrap();

    // p0 fails twice (given up), p1 fails once then loads.
    assert_eq!(report.attempted, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "https://shop.test/p0");
    assert_eq!(report.succeeded, 1);
    assert_eq!(table.len(), 1);
    assert!(source.closed);
}

#[tokio::test]
async fn session_failure_stops_the_run_and_closes() {
    let mut source = ScriptedSource::new(1, session_lost);
    let mut table = Accumulator::seeded();

    let result = pipeline()
        .run(&mut source, &urls(3), &quick(5, false), &mut table, None)
        .await;

    assert!(matches!(result, Err(ScrapeError::SessionInit(_))));
    assert_eq!(source.fetches, 1);
    assert!(source.closed);
    assert!(table.is_empty());
}

#[tokio::test]
async fn session_per_url_resets_between_pages() {
    let mut source = ScriptedSource::new(0, navigation);
    let mut table = Accumulator::seeded();

    pipeline()
        .run(&mut source, &urls(3), &quick(0, true), &mut table, None)
        .await
        .unwrap();

    assert_eq!(source.resets, 2);
    assert_eq!(table.len(), 3);
}

#[tokio::test]
async fn schema_drift_is_padded_across_pages() {
    let mut source = SnapshotSource::new();
    source.insert("https://shop.test/a", fixture_path("product_a.html"));
    source.insert("https://shop.test/b", fixture_path("product_b.html"));
    let urls = vec!["https://shop.test/a".to_string(), "https://shop.test/b".to_string()];

    let mut table = Accumulator::seeded();
    let report = pipeline()
        .run(&mut source, &urls, &quick(0, false), &mut table, None)
        .await
        .unwrap();

    assert_eq!(report.rows, 3);
    assert_eq!(table.len(), 3);
    assert_eq!(table.column("Weight").unwrap(), ["0.03 kg", "0.03 kg", ""]);
    assert_eq!(
        table.column("Material").unwrap(),
        ["Bearing steel", "Bearing steel", "Chromium steel"]
    );
    assert_eq!(table.column("weight").unwrap(), ["", "", ""]);
    assert_eq!(
        table.column("product_image_url").unwrap(),
        [
            "https://shop.test/images/series/6200ZZ.jpg",
            "https://shop.test/images/series/6200ZZ.jpg",
            ""
        ]
    );
    assert_eq!(
        table.column("page_url").unwrap(),
        ["https://shop.test/a", "https://shop.test/a", "https://shop.test/b"]
    );
    table.check_consistent().unwrap();
    for name in table.columns() {
        assert_eq!(table.column(name).unwrap().len(), table.len(), "{}", name);
    }
}

#[tokio::test]
async fn part_pages_supply_their_own_prices() {
    let dir = tempfile::tempdir().unwrap();
    let product = dir.path().join("product.html");
    std::fs::write(
        &product,
        r#"<html><head><script type="application/ld+json">
            {"offers":{"lowPrice":100000,"highPrice":200000,"priceCurrency":"VND"}}
          </script></head><body>
          <table class="PartNumberColumn_tableBase__DK2Le">
            <thead><tr><th>Part Number</th><th>Inner Dia. d</th></tr></thead>
            <tbody>
              <tr class="PartNumberColumn_dataRow__DK2Le"><td>6200ZZ</td><td>10</td></tr>
              <tr class="PartNumberColumn_dataRow__DK2Le"><td>6201ZZ</td><td>12</td></tr>
            </tbody>
          </table>
        </body></html>"#,
    )
    .unwrap();
    let part = dir.path().join("part.html");
    std::fs::write(
        &part,
        r#"<html><head><script type="application/ld+json">
            {"offers":{"lowPrice":150000,"highPrice":150000,"priceCurrency":"VND"}}
          </script></head><body></body></html>"#,
    )
    .unwrap();

    let mut source = SnapshotSource::new();
    source.insert("https://shop.test/a", &product);
    source.insert("https://shop.test/a?partNumber=6200ZZ", &part);
    let urls = vec!["https://shop.test/a".to_string()];

    let mut table = Accumulator::seeded();
    let report = pipeline()
        .with_part_prices("partNumber")
        .run(&mut source, &urls, &quick(0, false), &mut table, None)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.part_prices, 1);
    assert!(report.failed.is_empty());
    assert_eq!(table.column("part_number").unwrap(), ["6200ZZ", "6201ZZ"]);
    assert_eq!(table.column("price").unwrap(), ["150000 VND", "100000-200000 VND"]);
}

#[tokio::test]
async fn part_prices_are_off_by_default() {
    let mut source = ScriptedSource::new(0, navigation);
    let mut table = Accumulator::seeded();

    let report = pipeline()
        .run(&mut source, &urls(1), &quick(0, false), &mut table, None)
        .await
        .unwrap();

    assert_eq!(source.fetches, 1);
    assert_eq!(report.part_prices, 0);
}
