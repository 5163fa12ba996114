use crate::ledger::{Ledger, LedgerError};
use crate::storage::write_atomic;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File extension of persisted ledgers
const LEDGER_SUFFIX: &str = ".ledger.json";

/// Reads and writes one JSON ledger file per site in a directory
///
/// Saves replace the file atomically (temp file in the same directory, then
/// rename), so an interrupted or failed save leaves the previous ledger intact.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the ledger file for a site
    pub fn path_for(&self, site_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", site_id, LEDGER_SUFFIX))
    }

    /// Loads a site's ledger
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Ledger))` - The ledger on disk
    /// * `Ok(None)` - No ledger exists yet for this site
    /// * `Err(LedgerError)` - The file exists but could not be read or parsed
    pub fn load(&self, site_id: &str) -> Result<Option<Ledger>, LedgerError> {
        let path = self.path_for(site_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LedgerError::Io { path, source }),
        };

        let ledger = serde_json::from_str(&content)
            .map_err(|source| LedgerError::Parse { path, source })?;
        Ok(Some(ledger))
    }

    /// Saves a ledger, replacing any previous version atomically
    ///
    /// Returns the path written.
    pub fn save(&self, ledger: &Ledger) -> Result<PathBuf, LedgerError> {
        let path = self.path_for(ledger.site_id());
        let mut json = serde_json::to_vec_pretty(ledger).map_err(LedgerError::Serialize)?;
        json.push(b'\n');

        write_atomic(&path, &json).map_err(|source| LedgerError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Saved ledger with {} entries to {}", ledger.len(), path.display());
        Ok(path)
    }

    /// Lists site identifiers that have a ledger in this directory
    pub fn list_sites(&self) -> Result<Vec<String>, LedgerError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut sites: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(LEDGER_SUFFIX))
                    .map(str::to_string)
            })
            .collect();
        sites.sort();
        Ok(sites)
    }
}
