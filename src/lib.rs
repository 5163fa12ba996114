//! Crawl-Ledger: a two-phase site cataloguer
//!
//! Phase one discovers every link reachable from a seed URL and records it,
//! with provenance, into a per-site ledger that a curator reviews. Phase two
//! retrieves raw content only for the ledger entries the curator approved.

pub mod config;
pub mod crawler;
pub mod extractor;
pub mod ledger;
pub mod output;
pub mod records;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Crawl-Ledger operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("No ledger found for site '{0}'")]
    NoLedger(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("{phase} run for site '{site_id}' aborted at {url}: {message}")]
    Fatal {
        site_id: String,
        phase: crawler::Phase,
        url: String,
        message: String,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid curation pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Result type alias for Crawl-Ledger operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{discover, run_discovery, run_retrieval, scrape, Phase};
pub use extractor::{extract_links, DiscoveryMethod};
pub use ledger::{DiscoveredLink, Ledger, LinkStatus, LinkType};
pub use crate::url::{classify, normalize, CanonicalUrl, Classification};
