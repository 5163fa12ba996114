//! SQLite content store
//!
//! This module provides a SQLite-backed implementation of `ContentSink`.
//! Pages are keyed by canonical URL; re-scraping a URL replaces its row.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentSink, RetrievedPage, StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite content backend
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Opens (or creates) a content database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteContentStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }

    /// Counts stored pages for a site
    pub fn page_count(&self, site_id: &str) -> StorageResult<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Returns the stored body for a canonical URL
    pub fn body(&self, url: &str) -> StorageResult<Option<Vec<u8>>> {
        let body = self
            .conn()?
            .query_row("SELECT body FROM pages WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(body)
    }

    /// Lists stored URLs for a site in crawl order
    pub fn urls(&self, site_id: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT url FROM pages WHERE site_id = ?1 ORDER BY crawl_index")?;
        let urls = stmt
            .query_map(params![site_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }
}

impl ContentSink for SqliteContentStore {
    fn store(&self, page: &RetrievedPage) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO pages
                (url, site_id, crawl_index, status_code, content_type, body, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                page.url.as_str(),
                page.site_id,
                page.crawl_index as i64,
                page.status_code,
                page.content_type,
                page.body,
                page.fetched_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!("Stored {} ({} bytes) in content database", page.url, page.body.len());
        Ok(())
    }
}
