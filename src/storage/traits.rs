//! Storage traits and error types
//!
//! This module defines the interface the scrape phase hands retrieved pages
//! to, and the errors content backends may raise.

use crate::url::CanonicalUrl;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while persisting retrieved content
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Content store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One page retrieved by the scrape phase
#[derive(Debug, Clone)]
pub struct RetrievedPage {
    pub site_id: String,

    /// Position of the page in the ledger's approved list
    pub crawl_index: usize,

    pub url: CanonicalUrl,
    pub status_code: u16,
    pub content_type: Option<String>,

    /// Raw response body, undecoded
    pub body: Vec<u8>,

    pub fetched_at: DateTime<Utc>,
}

/// Destination for raw content retrieved by the scrape phase
///
/// Implementations are shared by every worker in the pool and must tolerate
/// concurrent `store` calls. A `store` error is fatal to the run.
pub trait ContentSink: Send + Sync {
    /// Persists one retrieved page
    fn store(&self, page: &RetrievedPage) -> StorageResult<()>;

    /// Flushes anything buffered once the run ends
    fn finish(&self) -> StorageResult<()> {
        Ok(())
    }
}
