//! Discovery ledger
//!
//! The ledger is the durable, cross-run record of every link discovered for
//! one site. Each entry carries a curation status owned by the curator.
//!
//! # Merge rule
//!
//! Merging findings into a ledger appends unknown URLs as `pending` and leaves
//! known URLs untouched (status, notes and first `source_page` included). The
//! rule makes repeated discovery runs idempotent with respect to curation
//! work already done, and makes the final ledger independent of the order in
//! which concurrent workers recorded their findings.

mod curation;
mod store;
mod types;

pub use curation::{CurationPolicy, CurationSummary};
pub use store::LedgerStore;
pub use types::{DiscoveredLink, FailedFetch, LedgerMetadata, LinkStatus};

pub use crate::url::LinkType;

use crate::state::Termination;
use crate::url::CanonicalUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use thiserror::Error;

/// Ledger persistence and curation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to access ledger {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ledger {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("URL not in ledger: {0}")]
    UnknownUrl(String),
}

/// The full persisted state for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LedgerDocument")]
pub struct Ledger {
    pub metadata: LedgerMetadata,
    links: Vec<DiscoveredLink>,
    visited_pages: BTreeSet<CanonicalUrl>,
    failed_pages: Vec<FailedFetch>,
    #[serde(skip)]
    index: HashMap<CanonicalUrl, usize>,
}

/// On-disk shape of a ledger, before the lookup index is rebuilt
#[derive(Deserialize)]
struct LedgerDocument {
    metadata: LedgerMetadata,
    #[serde(default)]
    links: Vec<DiscoveredLink>,
    #[serde(default)]
    visited_pages: BTreeSet<CanonicalUrl>,
    #[serde(default)]
    failed_pages: Vec<FailedFetch>,
}

impl From<LedgerDocument> for Ledger {
    fn from(doc: LedgerDocument) -> Self {
        let mut ledger = Ledger {
            metadata: doc.metadata,
            links: Vec::with_capacity(doc.links.len()),
            visited_pages: doc.visited_pages,
            failed_pages: doc.failed_pages,
            index: HashMap::new(),
        };
        // A hand-edited file may repeat a URL; the first occurrence wins
        for link in doc.links {
            if !ledger.index.contains_key(&link.url) {
                ledger.index.insert(link.url.clone(), ledger.links.len());
                ledger.links.push(link);
            }
        }
        ledger.metadata.total_links = ledger.links.len();
        ledger
    }
}

impl Ledger {
    /// Creates an empty ledger for a run starting at `run_timestamp`
    pub fn new(site_id: impl Into<String>, seed_url: CanonicalUrl, run_timestamp: DateTime<Utc>) -> Self {
        Self {
            metadata: LedgerMetadata {
                site_id: site_id.into(),
                seed_url,
                run_timestamp,
                first_run: run_timestamp,
                runs: 1,
                pages_scanned: 0,
                links_found: 0,
                total_links: 0,
                termination: None,
                config_hash: None,
            },
            links: Vec::new(),
            visited_pages: BTreeSet::new(),
            failed_pages: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.metadata.site_id
    }

    /// All entries in insertion order
    pub fn links(&self) -> &[DiscoveredLink] {
        &self.links
    }

    pub fn visited_pages(&self) -> &BTreeSet<CanonicalUrl> {
        &self.visited_pages
    }

    pub fn failed_pages(&self) -> &[FailedFetch] {
        &self.failed_pages
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, url: &CanonicalUrl) -> Option<&DiscoveredLink> {
        self.index.get(url).map(|&i| &self.links[i])
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.index.contains_key(url)
    }

    /// Records one finding under the merge rule
    ///
    /// Returns true if the URL was new and got appended as `pending`.
    pub fn record(&mut self, mut link: DiscoveredLink) -> bool {
        if self.index.contains_key(&link.url) {
            return false;
        }
        link.status = LinkStatus::Pending;
        link.notes.clear();
        self.index.insert(link.url.clone(), self.links.len());
        self.links.push(link);
        self.metadata.total_links = self.links.len();
        true
    }

    /// Merges a batch of findings, returning how many were new
    pub fn merge_links<I>(&mut self, findings: I) -> usize
    where
        I: IntoIterator<Item = DiscoveredLink>,
    {
        findings
            .into_iter()
            .map(|link| self.record(link))
            .filter(|&appended| appended)
            .count()
    }

    /// Marks a page as visited by the current run
    pub fn mark_visited(&mut self, page: CanonicalUrl) {
        self.visited_pages.insert(page);
    }

    /// Records a page the current run failed to fetch
    pub fn record_failure(&mut self, failure: FailedFetch) {
        self.failed_pages.push(failure);
    }

    /// Stamps the run totals once the crawl has finished
    pub fn finish_run(
        &mut self,
        pages_scanned: usize,
        termination: Termination,
        config_hash: Option<String>,
    ) {
        self.metadata.pages_scanned = pages_scanned;
        self.metadata.links_found = self.links.len();
        self.metadata.total_links = self.links.len();
        self.metadata.termination = Some(termination);
        self.metadata.config_hash = config_hash;
    }

    /// Returns entries whose status is in `filter`, in insertion order
    ///
    /// This is the read path the scrape phase depends on.
    pub fn load(&self, filter: &[LinkStatus]) -> Vec<&DiscoveredLink> {
        self.links
            .iter()
            .filter(|link| filter.contains(&link.status))
            .collect()
    }

    /// Sets an entry's status on behalf of a curator
    ///
    /// `notes` replaces the existing annotation when given.
    pub fn set_status(
        &mut self,
        url: &CanonicalUrl,
        status: LinkStatus,
        notes: Option<&str>,
    ) -> Result<(), LedgerError> {
        let i = *self
            .index
            .get(url)
            .ok_or_else(|| LedgerError::UnknownUrl(url.to_string()))?;
        let link = &mut self.links[i];
        link.status = status;
        if let Some(notes) = notes {
            link.notes = notes.to_string();
        }
        Ok(())
    }

    /// Applies keep/skip rules to every `pending` entry
    ///
    /// Entries a curator already decided are never touched.
    pub fn apply_policy(&mut self, policy: &CurationPolicy) -> CurationSummary {
        let mut summary = CurationSummary::default();
        for link in self.links.iter_mut() {
            if link.status != LinkStatus::Pending {
                continue;
            }
            match policy.decide(&link.url) {
                Some(LinkStatus::Keep) => {
                    link.status = LinkStatus::Keep;
                    summary.kept += 1;
                }
                Some(LinkStatus::Skip) => {
                    link.status = LinkStatus::Skip;
                    summary.skipped += 1;
                }
                _ => summary.untouched += 1,
            }
        }
        summary
    }

    /// Folds a finished run into this ledger
    fn absorb(&mut self, run: Ledger) {
        let Ledger {
            metadata,
            links,
            visited_pages,
            failed_pages,
            ..
        } = run;

        let appended = self.merge_links(links);
        self.visited_pages.extend(visited_pages);
        self.failed_pages = failed_pages;

        tracing::debug!(
            "Merged run into ledger for {}: {} new entries, {} total",
            self.metadata.site_id,
            appended,
            self.links.len()
        );

        self.metadata = LedgerMetadata {
            first_run: self.metadata.first_run.min(metadata.run_timestamp),
            runs: self.metadata.runs.saturating_add(1),
            total_links: self.links.len(),
            ..metadata
        };
    }
}

/// Merges a finished discovery run into the existing ledger, if any
///
/// # Arguments
///
/// * `existing` - The ledger loaded from disk, or None on the first run
/// * `run` - The ledger accumulated by the run that just finished
///
/// # Returns
///
/// The merged ledger: every pre-existing entry unchanged, new URLs appended
/// as `pending`, metadata describing the latest run
pub fn merge(existing: Option<Ledger>, run: Ledger) -> Ledger {
    match existing {
        None => run,
        Some(mut ledger) => {
            ledger.absorb(run);
            ledger
        }
    }
}
