//! Filesystem content store
//!
//! Layout under the configured content directory:
//!
//! ```text
//! <content-dir>/<site-id>/00000_3f2a9c...html
//! <content-dir>/<site-id>/00001_b81e07...html
//! <content-dir>/<site-id>/manifest.json
//! ```
//!
//! File names combine the crawl index with a hash of the canonical URL. The
//! manifest maps each file back to its URL and fetch metadata.

use crate::storage::traits::{ContentSink, RetrievedPage, StorageError, StorageResult};
use crate::storage::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const MANIFEST_FILENAME: &str = "manifest.json";

/// Hex characters of the URL hash kept in file names
const URL_HASH_LEN: usize = 16;

/// One manifest row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub crawl_index: usize,
    pub url: String,
    pub file: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub bytes: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Writes each retrieved page to its own file
pub struct FsContentStore {
    site_dir: PathBuf,
    manifest: Mutex<Vec<ManifestEntry>>,
}

impl FsContentStore {
    /// Creates a store writing under `<content_dir>/<site_id>/`
    pub fn new(content_dir: &Path, site_id: &str) -> StorageResult<Self> {
        let site_dir = content_dir.join(site_id);
        std::fs::create_dir_all(&site_dir)?;
        Ok(Self {
            site_dir,
            manifest: Mutex::new(Vec::new()),
        })
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.site_dir.join(MANIFEST_FILENAME)
    }

    /// File name for a page: zero-padded crawl index plus URL hash prefix
    pub fn file_name(crawl_index: usize, url: &str) -> String {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        format!("{:05}_{}.html", crawl_index, &digest[..URL_HASH_LEN])
    }
}

impl ContentSink for FsContentStore {
    fn store(&self, page: &RetrievedPage) -> StorageResult<()> {
        let file = Self::file_name(page.crawl_index, page.url.as_str());
        let path = self.site_dir.join(&file);
        write_atomic(&path, &page.body)?;

        tracing::debug!("Stored {} ({} bytes) as {}", page.url, page.body.len(), file);

        let mut manifest = self
            .manifest
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        manifest.push(ManifestEntry {
            crawl_index: page.crawl_index,
            url: page.url.to_string(),
            file,
            status_code: page.status_code,
            content_type: page.content_type.clone(),
            bytes: page.body.len(),
            fetched_at: page.fetched_at,
        });
        Ok(())
    }

    fn finish(&self) -> StorageResult<()> {
        let mut manifest = self
            .manifest
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        manifest.sort_by_key(|entry| entry.crawl_index);

        let json = serde_json::to_vec_pretty(&*manifest)?;
        write_atomic(&self.manifest_path(), &json)?;

        tracing::info!(
            "Wrote manifest for {} pages to {}",
            manifest.len(),
            self.manifest_path().display()
        );
        Ok(())
    }
}
