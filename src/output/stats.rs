//! Statistics generation from a site ledger
//!
//! This module provides functionality for summarizing a ledger and
//! displaying the summary on stdout.

use crate::extractor::DiscoveryMethod;
use crate::ledger::{Ledger, LinkStatus, LinkType};
use crate::state::{FetchState, Termination};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Ledger statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStatistics {
    pub site_id: String,
    pub seed_url: String,
    pub runs: u32,
    pub first_run: DateTime<Utc>,
    pub last_run: DateTime<Utc>,
    pub termination: Option<Termination>,

    /// Pages fetched by the latest run
    pub pages_scanned: usize,

    /// Total number of ledger entries
    pub total_links: usize,

    pub visited_pages: usize,

    /// Count of entries by curation status
    pub by_status: HashMap<LinkStatus, usize>,

    /// Count of entries by link type
    pub by_type: HashMap<LinkType, usize>,

    /// Count of entries by discovery method, in precedence order
    pub by_method: BTreeMap<DiscoveryMethod, usize>,

    /// Failed fetches from the latest run, by outcome class
    pub failures: HashMap<FetchState, usize>,
}

impl LedgerStatistics {
    /// Counts the entries with the given status
    pub fn status_count(&self, status: LinkStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of entries a curator (or policy) has decided, as a percentage
    pub fn curated_percent(&self) -> f64 {
        if self.total_links == 0 {
            return 0.0;
        }
        let decided = self.total_links - self.status_count(LinkStatus::Pending);
        (decided as f64 / self.total_links as f64) * 100.0
    }
}

/// Computes statistics for a ledger
pub fn ledger_statistics(ledger: &Ledger) -> LedgerStatistics {
    let mut by_status = HashMap::new();
    let mut by_type = HashMap::new();
    let mut by_method = BTreeMap::new();

    for link in ledger.links() {
        *by_status.entry(link.status).or_insert(0) += 1;
        *by_type.entry(link.link_type).or_insert(0) += 1;
        *by_method.entry(link.discovery_method).or_insert(0) += 1;
    }

    let mut failures = HashMap::new();
    for failure in ledger.failed_pages() {
        *failures.entry(failure.outcome).or_insert(0) += 1;
    }

    LedgerStatistics {
        site_id: ledger.site_id().to_string(),
        seed_url: ledger.metadata.seed_url.to_string(),
        runs: ledger.metadata.runs,
        first_run: ledger.metadata.first_run,
        last_run: ledger.metadata.run_timestamp,
        termination: ledger.metadata.termination,
        pages_scanned: ledger.metadata.pages_scanned,
        total_links: ledger.len(),
        visited_pages: ledger.visited_pages().len(),
        by_status,
        by_type,
        by_method,
        failures,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Ledger Statistics: {} ===\n", stats.site_id);

    println!("Overview:");
    println!("  Seed URL: {}", stats.seed_url);
    println!("  Discovery runs: {}", stats.runs);
    println!("  First run: {}", stats.first_run.to_rfc3339());
    println!("  Latest run: {}", stats.last_run.to_rfc3339());
    if let Some(termination) = stats.termination {
        println!("  Latest run ended: {}", termination);
    }
    println!("  Pages scanned (latest run): {}", stats.pages_scanned);
    println!("  Pages visited (all runs): {}", stats.visited_pages);
    println!("  Ledger entries: {}", stats.total_links);
    println!();

    println!("Entries by Status:");
    for status in LinkStatus::all() {
        let count = stats.status_count(status);
        let percentage = if stats.total_links > 0 {
            (count as f64 / stats.total_links as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Entries by Type:");
    for link_type in [LinkType::Internal, LinkType::External] {
        println!(
            "  {}: {}",
            link_type,
            stats.by_type.get(&link_type).copied().unwrap_or(0)
        );
    }
    println!();

    println!("Entries by Discovery Method:");
    for (method, count) in &stats.by_method {
        println!("  {}: {}", method, count);
    }
    println!();

    if !stats.failures.is_empty() {
        println!("Failed Fetches (latest run):");
        let mut failure_counts: Vec<_> = stats.failures.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (state, count) in failure_counts {
            println!("  {}: {}", state, count);
        }
        println!();
    }

    println!("Curated: {:.1}%", stats.curated_percent());
}
