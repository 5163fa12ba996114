use crawl_ledger::config::{parse_config, Config};
use crawl_ledger::url::CanonicalUrl;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a configuration writing under `dir`, with no politeness delay
pub fn test_config(dir: &Path, max_pages: usize, workers: usize) -> Config {
    test_config_with(dir, max_pages, workers, "")
}

/// Same as `test_config`, with extra `[crawler]` lines appended
pub fn test_config_with(dir: &Path, max_pages: usize, workers: usize, crawler_extra: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
max-pages = {max_pages}
workers = {workers}
host-delay-ms = 0
request-timeout-secs = 5
max-retries = 1
retry-backoff-ms = 1
{crawler_extra}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
ledger-dir = '{ledgers}'
content-dir = '{content}'
"#,
        ledgers = dir.join("ledgers").display(),
        content = dir.join("content").display(),
    );
    parse_config(&toml).expect("test config should parse")
}

pub fn shared(config: Config) -> Arc<Config> {
    Arc::new(config)
}

/// Canonical URL of `path` on the mock server
pub fn url(server: &MockServer, path: &str) -> CanonicalUrl {
    CanonicalUrl::parse(&format!("{}{}", server.uri(), path))
}

/// Serves an HTML page at `route`
pub async fn page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html"),
        )
        .mount(server)
        .await;
}

/// Number of requests the server received for `route`
pub async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}
