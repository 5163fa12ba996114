//! Scrape phase
//!
//! Retrieves raw content for the ledger entries a curator approved and hands
//! each page to the configured `ContentSink`. No links are followed: the
//! frontier holds exactly the approved entries, in ledger order, and the
//! page ceiling equals their count.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchOutcome, FetchedPage};
use crate::crawler::frontier::Frontier;
use crate::crawler::pool::{run_pool, PageVisitor};
use crate::crawler::scheduler::Scheduler;
use crate::crawler::Phase;
use crate::ledger::{FailedFetch, Ledger, LedgerStore, LinkStatus};
use crate::records::{extract_records, PageRecords, RecordExtractor};
use crate::state::Termination;
use crate::storage::{self, ContentSink, RetrievedPage};
use crate::url::{resolve_site_id, CanonicalUrl};
use crate::{CrawlError, Result};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Outcome of one scrape run
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalReport {
    pub site_id: String,

    /// Ledger entries selected by the status filter
    pub requested: usize,

    /// Pages handed to the content sink
    pub retrieved: usize,

    /// Selected pages that did not yield content
    pub failed: Vec<FailedFetch>,

    /// Records from the extractor, for pages where it succeeded
    pub records: Vec<PageRecords>,

    pub termination: Termination,
}

#[derive(Default)]
struct Collected {
    retrieved: usize,
    failed: Vec<FailedFetch>,
    extractions: Vec<(CanonicalUrl, JoinHandle<Option<PageRecords>>)>,
}

struct RetrievalVisitor {
    site_id: String,
    sink: Arc<dyn ContentSink>,
    extractor: Option<Arc<dyn RecordExtractor>>,
    chunk_size: usize,
    collected: Mutex<Collected>,
}

impl RetrievalVisitor {
    fn fatal(&self, url: &CanonicalUrl, message: String) -> CrawlError {
        CrawlError::Fatal {
            site_id: self.site_id.clone(),
            phase: Phase::Scrape,
            url: url.to_string(),
            message,
        }
    }

    fn collected(&self, url: &CanonicalUrl) -> Result<std::sync::MutexGuard<'_, Collected>> {
        self.collected
            .lock()
            .map_err(|e| self.fatal(url, format!("result lock poisoned: {}", e)))
    }
}

impl PageVisitor for RetrievalVisitor {
    fn visit(&self, page: &FetchedPage) -> Result<Vec<CanonicalUrl>> {
        let FetchOutcome::Success {
            status,
            content_type,
            body,
            ..
        } = &page.outcome
        else {
            if !page.outcome.state().is_failure() {
                warn!("Not retrieving {}: {}", page.url, page.outcome.state());
            }
            self.collected(&page.url)?.failed.push(FailedFetch {
                url: page.url.clone(),
                outcome: page.outcome.state(),
                status_code: page.outcome.status_code(),
                attempts: page.attempts,
            });
            return Ok(Vec::new());
        };

        let retrieved = RetrievedPage {
            site_id: self.site_id.clone(),
            crawl_index: page.crawl_index,
            url: page.url.clone(),
            status_code: *status,
            content_type: content_type.clone(),
            body: body.clone(),
            fetched_at: page.fetched_at,
        };
        self.sink
            .store(&retrieved)
            .map_err(|e| self.fatal(&page.url, e.to_string()))?;

        // Extractors may block on a model call; keep them off the workers
        let extraction = self.extractor.as_ref().map(|extractor| {
            let extractor = Arc::clone(extractor);
            let url = page.url.clone();
            let crawl_index = page.crawl_index;
            let html = String::from_utf8_lossy(body).into_owned();
            let chunk_size = self.chunk_size;
            tokio::task::spawn_blocking(move || {
                extract_records(extractor.as_ref(), &url, &html, chunk_size).map(|records| {
                    PageRecords {
                        url,
                        crawl_index,
                        records,
                    }
                })
            })
        });

        let mut collected = self.collected(&page.url)?;
        collected.retrieved += 1;
        if let Some(handle) = extraction {
            collected.extractions.push((page.url.clone(), handle));
        }

        Ok(Vec::new())
    }
}

/// Retrieves content for every ledger entry whose status is in `statuses`
///
/// Pages are stored in ledger order; `crawl_index` is the entry's position in
/// the approved list. The sink's `finish` runs even when the pool fails.
///
/// # Arguments
///
/// * `config` - Immutable run configuration
/// * `ledger` - The site's ledger
/// * `statuses` - Which curation statuses to retrieve, normally `[Keep]`
/// * `sink` - Where retrieved pages go
/// * `extractor` - Optional structured-record extractor
///
/// # Returns
///
/// * `Ok(RetrievalReport)` - The run finished
/// * `Err(CrawlError)` - The sink failed or a worker died
pub async fn run_retrieval(
    config: Arc<Config>,
    ledger: &Ledger,
    statuses: &[LinkStatus],
    sink: Arc<dyn ContentSink>,
    extractor: Option<Arc<dyn RecordExtractor>>,
) -> Result<RetrievalReport> {
    let site_id = ledger.site_id().to_string();
    let approved = ledger.load(statuses);

    let mut frontier = Frontier::new(approved.len());
    for link in &approved {
        frontier.enqueue(link.url.clone());
    }

    info!(
        "Scrape for {}: {} of {} entries selected",
        site_id,
        approved.len(),
        ledger.len()
    );

    let visitor = Arc::new(RetrievalVisitor {
        site_id: site_id.clone(),
        sink: Arc::clone(&sink),
        extractor,
        chunk_size: config.extraction.chunk_size,
        collected: Mutex::new(Collected::default()),
    });

    let pooled = match build_http_client(&config) {
        Ok(client) => {
            run_pool(
                Scheduler::new(frontier, config.crawler.host_delay()),
                Arc::clone(&config),
                client,
                Arc::clone(&visitor) as Arc<dyn PageVisitor>,
            )
            .await
        }
        Err(e) => Err(CrawlError::Client(e)),
    };
    let finished = sink.finish();

    let report = pooled?;
    finished.map_err(|e| CrawlError::Fatal {
        site_id: site_id.clone(),
        phase: Phase::Scrape,
        url: ledger.metadata.seed_url.to_string(),
        message: e.to_string(),
    })?;

    let collected = std::mem::take(&mut *visitor.collected(&ledger.metadata.seed_url)?);
    let records = await_extractions(collected.extractions).await;
    let report = RetrievalReport {
        site_id,
        requested: approved.len(),
        retrieved: collected.retrieved,
        failed: collected.failed,
        records,
        termination: report.termination,
    };

    info!(
        "Scrape for {} finished: {} retrieved, {} failed",
        report.site_id,
        report.retrieved,
        report.failed.len()
    );
    Ok(report)
}

/// Gathers extractor results in crawl order
///
/// An extractor that panicked leaves its page without records.
async fn await_extractions(
    extractions: Vec<(CanonicalUrl, JoinHandle<Option<PageRecords>>)>,
) -> Vec<PageRecords> {
    let mut records = Vec::new();
    for (url, handle) in extractions {
        match handle.await {
            Ok(Some(page)) => records.push(page),
            Ok(None) => {}
            Err(e) => warn!("Record extraction for {} did not complete: {}", url, e),
        }
    }
    records.sort_by_key(|page| page.crawl_index);
    records
}

/// Loads a site's ledger and retrieves its approved entries
///
/// # Arguments
///
/// * `config` - Immutable run configuration (ledger and content settings)
/// * `site` - Site identifier, or any URL on the site
/// * `statuses` - Which curation statuses to retrieve
/// * `extractor` - Optional structured-record extractor
pub async fn scrape(
    config: Arc<Config>,
    site: &str,
    statuses: &[LinkStatus],
    extractor: Option<Arc<dyn RecordExtractor>>,
) -> Result<RetrievalReport> {
    let site_id = resolve_site_id(site);
    let store = LedgerStore::new(&config.output.ledger_dir);
    let ledger = store
        .load(&site_id)?
        .ok_or_else(|| CrawlError::NoLedger(site_id.clone()))?;

    let sink: Arc<dyn ContentSink> = Arc::from(storage::open_sink(&config, &site_id)?);
    run_retrieval(config, &ledger, statuses, sink, extractor).await
}
