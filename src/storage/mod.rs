//! Storage module for persisting retrieved content
//!
//! This module handles everything the scrape phase writes besides the
//! ledger, including:
//! - The `ContentSink` seam retrieved pages are handed to
//! - A filesystem backend (one file per page plus a manifest)
//! - A SQLite backend (one row per canonical URL)
//! - Atomic file replacement shared with the ledger store

mod atomic;
mod fs;
mod schema;
mod sqlite;
mod traits;

pub use atomic::write_atomic;
pub use fs::{FsContentStore, ManifestEntry};
pub use sqlite::SqliteContentStore;
pub use traits::{ContentSink, RetrievedPage, StorageError, StorageResult};

use crate::config::{Config, ContentBackend};
use std::path::Path;

/// File name of the SQLite content database inside the content directory
pub const CONTENT_DB_FILENAME: &str = "content.db";

/// Opens the content backend selected in the `[output]` section
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `site_id` - Site whose pages will be stored
///
/// # Returns
///
/// * `Ok(Box<dyn ContentSink>)` - Ready-to-use backend
/// * `Err(StorageError)` - Failed to create directories or open the database
pub fn open_sink(config: &Config, site_id: &str) -> StorageResult<Box<dyn ContentSink>> {
    let content_dir = Path::new(&config.output.content_dir);
    match config.output.content_backend {
        ContentBackend::Files => Ok(Box::new(FsContentStore::new(content_dir, site_id)?)),
        ContentBackend::Sqlite => Ok(Box::new(SqliteContentStore::new(
            &content_dir.join(CONTENT_DB_FILENAME),
        )?)),
    }
}
