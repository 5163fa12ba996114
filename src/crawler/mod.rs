//! Crawler module for both phases of a site catalogue
//!
//! This module contains the core crawling logic, including:
//! - The frontier (FIFO, dedup, page ceiling)
//! - Scheduling with per-host politeness
//! - HTTP fetching with retry for transient failures
//! - The shared fetch worker pool
//! - The discovery phase (seed to ledger) and the scrape phase (approved
//!   ledger entries to content)

mod discovery;
mod fetcher;
mod frontier;
mod pool;
mod retrieval;
mod scheduler;

pub use discovery::{discover, run_discovery};
pub use fetcher::{build_http_client, fetch_once, fetch_with_retry, FetchOutcome, FetchedPage};
pub use frontier::Frontier;
pub use pool::{run_pool, PageVisitor, PoolReport};
pub use retrieval::{run_retrieval, scrape, RetrievalReport};
pub use scheduler::{Next, Scheduled, Scheduler};

use std::fmt;

/// The two phases of a site catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Link discovery into the ledger
    Discovery,
    /// Content retrieval for approved entries
    Scrape,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Scrape => "scrape",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
