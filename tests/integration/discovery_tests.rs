use crate::common::{hits, page, shared, test_config, test_config_with, url};
use crawl_ledger::crawler::{discover, run_discovery};
use crawl_ledger::extractor::DiscoveryMethod;
use crawl_ledger::ledger::{LedgerStore, LinkStatus, LinkType};
use crawl_ledger::state::{FetchState, Termination};
use crawl_ledger::url::resolve_site_id;
use crawl_ledger::CrawlError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A home page with an anchor to /menu and a JSON-LD reference to /about
async fn cafe_site() -> MockServer {
    let server = MockServer::start().await;
    let home = format!(
        r#"<html>
          <head>
            <script type="application/ld+json">
              {{"@context": "https://schema.org", "@type": "CafeOrCoffeeShop", "url": "{uri}/about"}}
            </script>
          </head>
          <body><a href="/menu">Menu</a></body>
        </html>"#,
        uri = server.uri()
    );
    page(&server, "/", &home).await;
    page(&server, "/menu", r#"<p>Espresso</p><a href="/">Home</a>"#).await;
    page(&server, "/about", "<p>Since 1998</p>").await;
    server
}

#[tokio::test]
async fn test_discovery_end_to_end() {
    let server = cafe_site().await;
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 2));

    let ledger = run_discovery(&format!("{}/", server.uri()), config)
        .await
        .expect("discovery should succeed");

    let urls: Vec<_> = ledger.links().iter().map(|l| l.url.clone()).collect();
    assert_eq!(ledger.len(), 3, "unexpected entries: {:?}", urls);
    for path in ["/", "/menu", "/about"] {
        let entry = ledger.get(&url(&server, path)).expect("entry present");
        assert_eq!(entry.status, LinkStatus::Pending);
        assert_eq!(entry.link_type, LinkType::Internal);
    }

    assert_eq!(
        ledger.get(&url(&server, "/")).unwrap().discovery_method,
        DiscoveryMethod::Seed
    );
    assert_eq!(
        ledger.get(&url(&server, "/menu")).unwrap().discovery_method,
        DiscoveryMethod::Anchor
    );
    let about = ledger.get(&url(&server, "/about")).unwrap();
    assert_eq!(about.discovery_method, DiscoveryMethod::JsonLd);
    assert_eq!(about.source_page, url(&server, "/"));

    assert_eq!(ledger.metadata.pages_scanned, 3);
    assert_eq!(ledger.metadata.termination, Some(Termination::Exhausted));
    assert_eq!(ledger.visited_pages().len(), 3);
    assert!(ledger.failed_pages().is_empty());
}

#[tokio::test]
async fn test_repeated_discovery_is_idempotent() {
    let server = cafe_site().await;
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 3));
    let seed = format!("{}/", server.uri());

    let first = discover(config.clone(), &seed, Some("hash-1".to_string()))
        .await
        .unwrap();
    let second = discover(config.clone(), &seed, Some("hash-1".to_string()))
        .await
        .unwrap();

    assert_eq!(first.links(), second.links());
    assert_eq!(second.metadata.runs, 2);
    assert_eq!(second.metadata.first_run, first.metadata.run_timestamp);
    assert_eq!(second.metadata.config_hash.as_deref(), Some("hash-1"));

    let store = LedgerStore::new(dir.path().join("ledgers"));
    let saved = store
        .load(&resolve_site_id(&seed))
        .unwrap()
        .expect("ledger saved");
    assert_eq!(saved.links(), second.links());
}

#[tokio::test]
async fn test_rediscovery_preserves_curation() {
    let server = cafe_site().await;
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 2));
    let seed = format!("{}/", server.uri());
    let store = LedgerStore::new(dir.path().join("ledgers"));

    discover(config.clone(), &seed, None).await.unwrap();

    let mut ledger = store.load(&resolve_site_id(&seed)).unwrap().unwrap();
    ledger
        .set_status(&url(&server, "/menu"), LinkStatus::Keep, Some("daily menu"))
        .unwrap();
    ledger
        .set_status(&url(&server, "/about"), LinkStatus::Skip, None)
        .unwrap();
    store.save(&ledger).unwrap();

    let merged = discover(config, &seed, None).await.unwrap();

    let menu = merged.get(&url(&server, "/menu")).unwrap();
    assert_eq!(menu.status, LinkStatus::Keep);
    assert_eq!(menu.notes, "daily menu");
    assert_eq!(
        merged.get(&url(&server, "/about")).unwrap().status,
        LinkStatus::Skip
    );
    assert_eq!(merged.len(), 3);
}

#[tokio::test]
async fn test_ceiling_stops_run_with_work_queued() {
    let server = MockServer::start().await;
    let links: String = (1..=5)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    page(&server, "/", &links).await;
    for i in 1..=5 {
        page(&server, &format!("/p{}", i), "<p>leaf</p>").await;
    }

    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 3, 2));
    let ledger = run_discovery(&format!("{}/", server.uri()), config)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(ledger.metadata.pages_scanned, 3);
    assert_eq!(ledger.metadata.termination, Some(Termination::CeilingReached));
    // Every link on the seed page is recorded even though most were never fetched
    assert_eq!(ledger.len(), 6);
}

#[tokio::test]
async fn test_http_errors_recorded_without_retry() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        r#"<a href="/gone">Gone</a><a href="/broken">Broken</a><a href="/ok">Ok</a>"#,
    )
    .await;
    page(&server, "/ok", "<p>fine</p>").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 2));
    let ledger = run_discovery(&format!("{}/", server.uri()), config)
        .await
        .unwrap();

    assert_eq!(ledger.len(), 4);
    assert_eq!(ledger.failed_pages().len(), 2);

    let gone = ledger
        .failed_pages()
        .iter()
        .find(|f| f.url == url(&server, "/gone"))
        .unwrap();
    assert_eq!(gone.outcome, FetchState::ClientError);
    assert_eq!(gone.status_code, Some(404));
    assert_eq!(gone.attempts, 1);

    let broken = ledger
        .failed_pages()
        .iter()
        .find(|f| f.url == url(&server, "/broken"))
        .unwrap();
    assert_eq!(broken.outcome, FetchState::ServerError);

    // Failed pages stay visited and stay in the ledger
    assert!(ledger.visited_pages().contains(&url(&server, "/gone")));
    assert!(ledger.contains(&url(&server, "/gone")));
    assert_eq!(hits(&server, "/gone").await, 1);
}

#[tokio::test]
async fn test_redirect_target_enters_ledger() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/old-menu">Menu</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/old-menu"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/menu"))
        .mount(&server)
        .await;
    page(&server, "/menu", r#"<a href="/old-menu">Old</a>"#).await;

    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 1));
    let ledger = run_discovery(&format!("{}/", server.uri()), config)
        .await
        .unwrap();

    let menu = ledger.get(&url(&server, "/menu")).unwrap();
    assert_eq!(menu.discovery_method, DiscoveryMethod::Header);
    assert_eq!(menu.source_page, url(&server, "/old-menu"));
    assert_eq!(hits(&server, "/old-menu").await, 1);
    assert_eq!(hits(&server, "/menu").await, 1);
    assert!(ledger.failed_pages().is_empty());
}

#[tokio::test]
async fn test_out_of_scope_links_are_not_recorded() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        r#"<a href="/menu">Menu</a>
           <a href="https://elsewhere.test/">Partner</a>
           <a href="/images/latte.png">Photo</a>
           <a href="mailto:hello@cafe.test">Mail</a>"#,
    )
    .await;
    page(&server, "/menu", "<p>menu</p>").await;

    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 2));
    let ledger = run_discovery(&format!("{}/", server.uri()), config)
        .await
        .unwrap();

    assert_eq!(ledger.len(), 2);
    assert_eq!(hits(&server, "/images/latte.png").await, 0);
}

#[tokio::test]
async fn test_disabled_strategy_finds_nothing() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        r#"<a href="/menu">Menu</a><script>window.location.href = "/promo";</script>"#,
    )
    .await;
    page(&server, "/menu", "<p>menu</p>").await;

    let dir = TempDir::new().unwrap();
    let config = shared(test_config_with(
        dir.path(),
        10,
        1,
        r#"disabled-strategies = ["script"]"#,
    ));
    let ledger = run_discovery(&format!("{}/", server.uri()), config)
        .await
        .unwrap();

    assert!(ledger.contains(&url(&server, "/menu")));
    assert!(!ledger.contains(&url(&server, "/promo")));
    assert_eq!(hits(&server, "/promo").await, 0);
}

#[tokio::test]
async fn test_host_delay_spaces_fetches() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#).await;
    page(&server, "/a", "<p>a</p>").await;
    page(&server, "/b", "<p>b</p>").await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), 10, 3);
    config.crawler.host_delay_ms = 150;

    let started = Instant::now();
    let ledger = run_discovery(&format!("{}/", server.uri()), shared(config))
        .await
        .unwrap();

    // Three fetch starts on one host need at least two full delays
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(ledger.metadata.pages_scanned, 3);
}

#[tokio::test]
async fn test_retries_respect_host_delay() {
    // Accepts and immediately drops every connection, so each attempt is a
    // retryable connection error
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            log.lock().unwrap().push(Instant::now());
            drop(socket);
        }
    });

    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), 10, 2);
    config.crawler.host_delay_ms = 300;
    config.crawler.max_retries = 2;
    config.crawler.retry_backoff_ms = 20;

    let ledger = run_discovery(&format!("http://127.0.0.1:{}/", port), shared(config))
        .await
        .unwrap();

    assert_eq!(ledger.failed_pages().len(), 1);
    assert_eq!(ledger.failed_pages()[0].outcome, FetchState::ConnectionError);
    assert_eq!(ledger.failed_pages()[0].attempts, 3);

    let accepted = accepted.lock().unwrap().clone();
    assert_eq!(accepted.len(), 3);
    for pair in accepted.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_millis(250),
            "retry started {:?} after the previous attempt",
            gap
        );
    }
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = shared(test_config(dir.path(), 10, 1));

    let result = run_discovery("not a url", config.clone()).await;
    assert!(matches!(result, Err(CrawlError::InvalidSeed(_))));

    let result = run_discovery("ftp://cafe.test/", config).await;
    assert!(matches!(result, Err(CrawlError::InvalidSeed(_))));
}

#[tokio::test]
async fn test_unwritable_ledger_dir_is_fatal_and_keeps_old_file() {
    let server = cafe_site().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 10, 2);
    let seed = format!("{}/", server.uri());

    discover(shared(config.clone()), &seed, None).await.unwrap();
    let store = LedgerStore::new(dir.path().join("ledgers"));
    let ledger_path = store.path_for(&resolve_site_id(&seed));
    let before = std::fs::read_to_string(&ledger_path).unwrap();

    // A ledger directory that is a regular file cannot be written
    let mut broken = config;
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();
    broken.output.ledger_dir = blocker.join("ledgers").display().to_string();

    let result = discover(shared(broken), &seed, None).await;
    match result {
        Err(CrawlError::Fatal { site_id, url, .. }) => {
            assert_eq!(site_id, resolve_site_id(&seed));
            assert_eq!(url, seed);
        }
        other => panic!("expected a fatal error, got {:?}", other.map(|l| l.len())),
    }
    assert_eq!(std::fs::read_to_string(&ledger_path).unwrap(), before);
}
