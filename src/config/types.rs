use crate::extractor::{DiscoveryMethod, LinkExtractor};
use crate::url::ScopeOptions;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Crawl-Ledger
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub curation: CurationConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page ceiling: maximum number of pages dequeued per discovery run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Minimum time between fetch starts on the same host (milliseconds)
    #[serde(rename = "host-delay-ms", default = "default_host_delay_ms")]
    pub host_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for timeouts and connection errors
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry (milliseconds), doubled on each retry
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Keep external links in scope
    #[serde(rename = "follow-external", default)]
    pub follow_external: bool,

    /// Treat subdomains of the seed host as internal
    #[serde(rename = "include-subdomains", default)]
    pub include_subdomains: bool,

    /// Extraction strategies to turn off, by method name
    #[serde(rename = "disabled-strategies", default)]
    pub disabled_strategies: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            workers: default_workers(),
            host_delay_ms: default_host_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            follow_external: false,
            include_subdomains: false,
            disabled_strategies: Vec::new(),
        }
    }
}

impl CrawlerConfig {
    pub fn host_delay(&self) -> Duration {
        Duration::from_millis(self.host_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn scope_options(&self) -> ScopeOptions {
        ScopeOptions {
            include_subdomains: self.include_subdomains,
            follow_external: self.follow_external,
        }
    }

    /// Parsed disabled strategies; unknown names are rejected at validation
    pub fn disabled_methods(&self) -> Vec<DiscoveryMethod> {
        self.disabled_strategies
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    /// Builds the link extractor this configuration asks for
    pub fn link_extractor(&self) -> LinkExtractor {
        LinkExtractor::with_disabled(self.disabled_methods())
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where scrape output goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentBackend {
    /// One file per page plus a manifest
    #[default]
    Files,
    /// A single SQLite database
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one ledger file per site
    #[serde(rename = "ledger-dir", default = "default_ledger_dir")]
    pub ledger_dir: String,

    /// Directory receiving scraped content
    #[serde(rename = "content-dir", default = "default_content_dir")]
    pub content_dir: String,

    #[serde(rename = "content-backend", default)]
    pub content_backend: ContentBackend,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ledger_dir: default_ledger_dir(),
            content_dir: default_content_dir(),
            content_backend: ContentBackend::default(),
        }
    }
}

/// Automatic curation rules (regular expressions over canonical URLs)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurationConfig {
    #[serde(default)]
    pub keep: Vec<String>,
    #[serde(default)]
    pub skip: Vec<String>,
}

/// Settings for the structured-record extraction hand-off
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum characters per text chunk
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_max_pages() -> usize {
    100
}

fn default_workers() -> usize {
    5
}

fn default_host_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_ledger_dir() -> String {
    "./ledgers".to_string()
}

fn default_content_dir() -> String {
    "./content".to_string()
}

fn default_chunk_size() -> usize {
    4000
}
