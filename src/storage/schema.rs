//! Database schema for the SQLite content store

/// SQL schema for the content database
pub const SCHEMA_SQL: &str = r#"
-- Raw content retrieved by scrape runs, one row per canonical URL
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    site_id TEXT NOT NULL,
    crawl_index INTEGER NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_site ON pages(site_id, crawl_index);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
