use crate::common::{hits, page, shared, test_config, url};
use chrono::Utc;
use crawl_ledger::crawler::{run_retrieval, scrape, Phase};
use crawl_ledger::extractor::DiscoveryMethod;
use crawl_ledger::ledger::{DiscoveredLink, Ledger, LedgerStore, LinkStatus, LinkType};
use crawl_ledger::records::{RecordExtractor, TextChunks};
use crawl_ledger::state::FetchState;
use crawl_ledger::storage::{
    ContentSink, FsContentStore, ManifestEntry, RetrievedPage, StorageError, StorageResult,
};
use crawl_ledger::url::{resolve_site_id, CanonicalUrl};
use crawl_ledger::CrawlError;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Keeps retrieved pages in memory
#[derive(Default)]
struct MemorySink {
    pages: Mutex<Vec<RetrievedPage>>,
    finished: Mutex<bool>,
}

impl MemorySink {
    fn stored(&self) -> Vec<(usize, String)> {
        let mut pages: Vec<_> = self
            .pages
            .lock()
            .unwrap()
            .iter()
            .map(|p| (p.crawl_index, p.url.to_string()))
            .collect();
        pages.sort();
        pages
    }
}

impl ContentSink for MemorySink {
    fn store(&self, page: &RetrievedPage) -> StorageResult<()> {
        self.pages.lock().unwrap().push(page.clone());
        Ok(())
    }

    fn finish(&self) -> StorageResult<()> {
        *self.finished.lock().unwrap() = true;
        Ok(())
    }
}

/// Rejects every page
struct FullDisk;

impl ContentSink for FullDisk {
    fn store(&self, _page: &RetrievedPage) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "no space left on device",
        )))
    }
}

/// Returns the first chunk of each page, and fails on the specials page
struct FirstChunk;

impl RecordExtractor for FirstChunk {
    fn extract(&self, url: &CanonicalUrl, mut chunks: TextChunks<'_>) -> anyhow::Result<Vec<Value>> {
        if url.as_str().ends_with("/specials") {
            anyhow::bail!("rate limited by model provider");
        }
        Ok(chunks.next().map(|c| json!({ "text": c })).into_iter().collect())
    }
}

/// Panics on the specials page, like a model client that falls over
struct Unstable;

impl RecordExtractor for Unstable {
    fn extract(&self, url: &CanonicalUrl, mut chunks: TextChunks<'_>) -> anyhow::Result<Vec<Value>> {
        if url.as_str().ends_with("/specials") {
            panic!("model client fell over");
        }
        Ok(chunks.next().map(|c| json!({ "text": c })).into_iter().collect())
    }
}

/// Serves five pages and builds a ledger listing them, with `/menu` and
/// `/beans` marked keep and the rest pending or skip
async fn curated_site() -> (MockServer, Ledger) {
    let server = MockServer::start().await;
    for route in ["/", "/menu", "/cart", "/beans", "/account"] {
        page(&server, route, &format!("<main><h1>{}</h1></main>", route)).await;
    }

    let seed = url(&server, "/");
    let mut ledger = Ledger::new(resolve_site_id(&server.uri()), seed.clone(), Utc::now());
    ledger.record(DiscoveredLink::new(
        seed.clone(),
        seed.clone(),
        DiscoveryMethod::Seed,
        LinkType::Internal,
    ));
    for route in ["/menu", "/cart", "/beans", "/account"] {
        ledger.record(DiscoveredLink::new(
            url(&server, route),
            seed.clone(),
            DiscoveryMethod::Anchor,
            LinkType::Internal,
        ));
    }
    ledger
        .set_status(&url(&server, "/menu"), LinkStatus::Keep, None)
        .unwrap();
    ledger
        .set_status(&url(&server, "/beans"), LinkStatus::Keep, None)
        .unwrap();
    ledger
        .set_status(&url(&server, "/cart"), LinkStatus::Skip, None)
        .unwrap();

    (server, ledger)
}

#[tokio::test]
async fn test_scrape_retrieves_only_kept_entries() {
    let (server, ledger) = curated_site().await;
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 100, 3));
    let sink = Arc::new(MemorySink::default());

    let report = run_retrieval(
        config,
        &ledger,
        &[LinkStatus::Keep],
        sink.clone(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.requested, 2);
    assert_eq!(report.retrieved, 2);
    assert!(report.failed.is_empty());
    assert_eq!(
        sink.stored(),
        vec![
            (0, url(&server, "/menu").to_string()),
            (1, url(&server, "/beans").to_string()),
        ]
    );
    assert!(*sink.finished.lock().unwrap());

    for route in ["/", "/cart", "/account"] {
        assert_eq!(hits(&server, route).await, 0, "{} should not be fetched", route);
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_scrape_with_several_statuses() {
    let (server, ledger) = curated_site().await;
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 100, 2));
    let sink = Arc::new(MemorySink::default());

    let report = run_retrieval(
        config,
        &ledger,
        &[LinkStatus::Keep, LinkStatus::Pending],
        sink.clone(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.retrieved, 4);
    assert_eq!(hits(&server, "/cart").await, 0);
}

#[tokio::test]
async fn test_scrape_with_nothing_approved() {
    let server = MockServer::start().await;
    let seed = url(&server, "/");
    let ledger = Ledger::new("empty.test", seed, Utc::now());
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::default());

    let report = run_retrieval(
        shared(test_config(dir.path(), 100, 2)),
        &ledger,
        &[LinkStatus::Keep],
        sink.clone(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.requested, 0);
    assert_eq!(report.retrieved, 0);
    assert!(*sink.finished.lock().unwrap());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scrape_through_ledger_store_and_files() {
    let (server, ledger) = curated_site().await;
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 100, 2));
    LedgerStore::new(dir.path().join("ledgers"))
        .save(&ledger)
        .unwrap();

    // Any URL on the site names its ledger
    let report = scrape(config, &server.uri(), &[LinkStatus::Keep], None)
        .await
        .unwrap();
    assert_eq!(report.retrieved, 2);

    let store = FsContentStore::new(&dir.path().join("content"), ledger.site_id()).unwrap();
    let manifest: Vec<ManifestEntry> =
        serde_json::from_str(&std::fs::read_to_string(store.manifest_path()).unwrap()).unwrap();
    let urls: Vec<_> = manifest.iter().map(|e| e.url.clone()).collect();
    assert_eq!(
        urls,
        vec![url(&server, "/menu").to_string(), url(&server, "/beans").to_string()]
    );

    let body = std::fs::read_to_string(store.site_dir().join(&manifest[1].file)).unwrap();
    assert_eq!(body, "<main><h1>/beans</h1></main>");
}

#[tokio::test]
async fn test_scrape_without_ledger() {
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 100, 2));

    let result = scrape(config, "nowhere.test", &[LinkStatus::Keep], None).await;
    assert!(matches!(result, Err(CrawlError::NoLedger(site)) if site == "nowhere.test"));
}

#[tokio::test]
async fn test_failed_pages_are_reported_not_stored() {
    let server = MockServer::start().await;
    page(&server, "/menu", "<p>menu</p>").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let seed = url(&server, "/menu");
    let mut ledger = Ledger::new(resolve_site_id(&server.uri()), seed.clone(), Utc::now());
    for route in ["/menu", "/gone"] {
        ledger.record(DiscoveredLink::new(
            url(&server, route),
            seed.clone(),
            DiscoveryMethod::Anchor,
            LinkType::Internal,
        ));
        ledger
            .set_status(&url(&server, route), LinkStatus::Keep, None)
            .unwrap();
    }

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::default());
    let report = run_retrieval(
        shared(test_config(dir.path(), 100, 2)),
        &ledger,
        &[LinkStatus::Keep],
        sink.clone(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.retrieved, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].outcome, FetchState::ClientError);
    assert_eq!(sink.stored().len(), 1);
}

#[tokio::test]
async fn test_sink_failure_aborts_scrape() {
    let (_server, ledger) = curated_site().await;
    let dir = TempDir::new().unwrap();

    let result = run_retrieval(
        shared(test_config(dir.path(), 100, 1)),
        &ledger,
        &[LinkStatus::Keep],
        Arc::new(FullDisk),
        None,
    )
    .await;

    match result {
        Err(CrawlError::Fatal {
            site_id,
            phase,
            message,
            ..
        }) => {
            assert_eq!(site_id, ledger.site_id());
            assert_eq!(phase, Phase::Scrape);
            assert!(message.contains("no space left"));
        }
        other => panic!("expected a fatal error, got {:?}", other.map(|r| r.retrieved)),
    }
}

#[tokio::test]
async fn test_record_extraction_is_best_effort() {
    let server = MockServer::start().await;
    page(&server, "/menu", "<nav>Home</nav><p>Flat white 3.50</p>").await;
    page(&server, "/specials", "<p>Pumpkin latte</p>").await;

    let seed = url(&server, "/menu");
    let mut ledger = Ledger::new(resolve_site_id(&server.uri()), seed.clone(), Utc::now());
    for route in ["/menu", "/specials"] {
        ledger.record(DiscoveredLink::new(
            url(&server, route),
            seed.clone(),
            DiscoveryMethod::Anchor,
            LinkType::Internal,
        ));
        ledger
            .set_status(&url(&server, route), LinkStatus::Keep, None)
            .unwrap();
    }

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::default());
    let report = run_retrieval(
        shared(test_config(dir.path(), 100, 2)),
        &ledger,
        &[LinkStatus::Keep],
        sink.clone(),
        Some(Arc::new(FirstChunk) as Arc<dyn RecordExtractor>),
    )
    .await
    .unwrap();

    // Both pages are stored; only the menu yields records
    assert_eq!(report.retrieved, 2);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].url, url(&server, "/menu"));
    assert_eq!(report.records[0].records, vec![json!({ "text": "Flat white 3.50" })]);
}

#[tokio::test]
async fn test_panicking_extractor_does_not_abort_scrape() {
    let server = MockServer::start().await;
    let routes = ["/specials", "/menu", "/beans"];
    for route in routes {
        page(&server, route, &format!("<p>{}</p>", route)).await;
    }

    let seed = url(&server, "/menu");
    let mut ledger = Ledger::new(resolve_site_id(&server.uri()), seed.clone(), Utc::now());
    for route in routes {
        ledger.record(DiscoveredLink::new(
            url(&server, route),
            seed.clone(),
            DiscoveryMethod::Anchor,
            LinkType::Internal,
        ));
        ledger
            .set_status(&url(&server, route), LinkStatus::Keep, None)
            .unwrap();
    }

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::default());
    let report = run_retrieval(
        shared(test_config(dir.path(), 100, 1)),
        &ledger,
        &[LinkStatus::Keep],
        sink.clone(),
        Some(Arc::new(Unstable) as Arc<dyn RecordExtractor>),
    )
    .await
    .unwrap();

    assert_eq!(report.retrieved, 3);
    assert_eq!(sink.stored().len(), 3);
    let with_records: Vec<_> = report.records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(with_records, vec![url(&server, "/menu"), url(&server, "/beans")]);
}
