//! Discovery phase
//!
//! Crawls outward from a seed URL and records every in-scope link, with the
//! page and strategy that found it, into a run ledger. The run ledger is then
//! merged into the site's persisted ledger under the merge rule, so curation
//! work already done survives.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchOutcome, FetchedPage};
use crate::crawler::frontier::Frontier;
use crate::crawler::pool::{run_pool, PageVisitor};
use crate::crawler::scheduler::Scheduler;
use crate::crawler::Phase;
use crate::extractor::{DiscoveryMethod, LinkExtractor, RawLink};
use crate::ledger::{self, DiscoveredLink, FailedFetch, Ledger, LedgerStore, LinkType};
use crate::url::{classify, normalize, site_id, CanonicalUrl, ScopeOptions};
use crate::{CrawlError, Result};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Records findings from every fetched page into the run ledger
struct DiscoveryVisitor {
    site_id: String,
    seed_host: String,
    scope: ScopeOptions,
    extractor: LinkExtractor,
    ledger: Mutex<Ledger>,
}

impl DiscoveryVisitor {
    fn ledger(&self, url: &CanonicalUrl) -> Result<MutexGuard<'_, Ledger>> {
        self.ledger.lock().map_err(|e| CrawlError::Fatal {
            site_id: self.site_id.clone(),
            phase: Phase::Discovery,
            url: url.to_string(),
            message: format!("ledger lock poisoned: {}", e),
        })
    }

    fn into_ledger(self: Arc<Self>) -> Result<Ledger> {
        let visitor = Arc::try_unwrap(self)
            .map_err(|_| CrawlError::Worker("discovery visitor still in use".to_string()))?;
        visitor
            .ledger
            .into_inner()
            .map_err(|e| CrawlError::Worker(format!("ledger lock poisoned: {}", e)))
    }

    /// Raw candidates for one fetch: page strategies on success, headers and
    /// the redirect target on a 3xx, nothing on failure
    fn candidates(&self, page: &FetchedPage) -> BTreeSet<RawLink> {
        match &page.outcome {
            FetchOutcome::Success {
                headers,
                content_type,
                body,
                ..
            } => {
                let html = if is_markup(content_type.as_deref()) {
                    String::from_utf8_lossy(body)
                } else {
                    debug!("Not scanning body of {} ({:?})", page.url, content_type);
                    Default::default()
                };
                self.extractor.extract(&html, &page.url, headers)
            }
            FetchOutcome::Redirect {
                headers, location, ..
            } => {
                let mut links = self.extractor.extract("", &page.url, headers);
                if let Some(location) = location {
                    links.insert(RawLink {
                        url: location.clone(),
                        method: DiscoveryMethod::Header,
                    });
                }
                links
            }
            _ => BTreeSet::new(),
        }
    }
}

impl PageVisitor for DiscoveryVisitor {
    fn visit(&self, page: &FetchedPage) -> Result<Vec<CanonicalUrl>> {
        // One canonical URL may come from several raw strings and strategies;
        // the lowest-ordered method wins
        let mut found: BTreeMap<CanonicalUrl, DiscoveryMethod> = BTreeMap::new();
        for raw in self.candidates(page) {
            let canonical = normalize(&raw.url, &page.url);
            if !canonical.is_valid() {
                debug!("Dropping unparseable link '{}' on {}", raw.url, page.url);
                continue;
            }
            found
                .entry(canonical)
                .and_modify(|method| *method = (*method).min(raw.method))
                .or_insert(raw.method);
        }

        let mut in_scope = Vec::with_capacity(found.len());
        let mut findings = Vec::with_capacity(found.len());
        for (url, method) in found {
            let classification = classify(&url, &self.seed_host, &self.scope);
            if !classification.in_scope {
                debug!("Out of scope: {} ({})", url, classification.link_type);
                continue;
            }
            findings.push(DiscoveredLink::new(
                url.clone(),
                page.url.clone(),
                method,
                classification.link_type,
            ));
            in_scope.push(url);
        }

        let mut ledger = self.ledger(&page.url)?;
        ledger.mark_visited(page.url.clone());
        if page.outcome.state().is_failure() {
            ledger.record_failure(FailedFetch {
                url: page.url.clone(),
                outcome: page.outcome.state(),
                status_code: page.outcome.status_code(),
                attempts: page.attempts,
            });
        }
        let appended = ledger.merge_links(findings);
        drop(ledger);

        debug!(
            "{}: {} in-scope links, {} new to the ledger",
            page.url,
            in_scope.len(),
            appended
        );
        Ok(in_scope)
    }
}

/// Bodies worth scanning for links; a missing Content-Type is scanned
fn is_markup(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => {
            let value = value.to_ascii_lowercase();
            value.starts_with("text/") || value.contains("html") || value.contains("xml")
        }
    }
}

/// Validates a seed and returns its canonical form, host and site identifier
fn parse_seed(seed: &str) -> Result<(CanonicalUrl, String, String)> {
    let canonical = CanonicalUrl::parse(seed);
    let url = canonical
        .to_url()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or_else(|| CrawlError::InvalidSeed(seed.to_string()))?;
    let host = canonical
        .host()
        .ok_or_else(|| CrawlError::InvalidSeed(seed.to_string()))?;
    let id = site_id(&url).ok_or_else(|| CrawlError::InvalidSeed(seed.to_string()))?;
    Ok((canonical, host, id))
}

/// Runs one discovery crawl and returns the run's own ledger
///
/// The seed itself is the first entry (`discovery_method = seed`). Nothing is
/// persisted; see [`discover`] for the load-merge-save cycle.
///
/// # Arguments
///
/// * `seed` - Absolute http(s) URL to start from
/// * `config` - Immutable run configuration
///
/// # Returns
///
/// * `Ok(Ledger)` - Every in-scope link found by this run
/// * `Err(CrawlError)` - Invalid seed, client construction failure or a fatal
///   worker error
pub async fn run_discovery(seed: &str, config: Arc<Config>) -> Result<Ledger> {
    let (seed_url, seed_host, site) = parse_seed(seed)?;

    info!(
        "Discovery for {} starting at {} (ceiling {} pages, {} workers)",
        site, seed_url, config.crawler.max_pages, config.crawler.workers
    );

    let mut ledger = Ledger::new(site.clone(), seed_url.clone(), Utc::now());
    ledger.record(DiscoveredLink::new(
        seed_url.clone(),
        seed_url.clone(),
        DiscoveryMethod::Seed,
        LinkType::Internal,
    ));

    let mut frontier = Frontier::new(config.crawler.max_pages);
    frontier.enqueue(seed_url);
    let scheduler = Scheduler::new(frontier, config.crawler.host_delay());

    let client = build_http_client(&config).map_err(CrawlError::Client)?;
    let visitor = Arc::new(DiscoveryVisitor {
        site_id: site,
        seed_host,
        scope: config.crawler.scope_options(),
        extractor: config.crawler.link_extractor(),
        ledger: Mutex::new(ledger),
    });

    let report = run_pool(
        scheduler,
        Arc::clone(&config),
        client,
        Arc::clone(&visitor) as Arc<dyn PageVisitor>,
    )
    .await?;

    let mut ledger = visitor.into_ledger()?;
    ledger.finish_run(report.pages_fetched, report.termination, None);

    info!(
        "Discovery for {} {}: {} pages scanned, {} links recorded",
        ledger.site_id(),
        report.termination,
        report.pages_fetched,
        ledger.len()
    );
    Ok(ledger)
}

/// Runs discovery and merges the result into the site's persisted ledger
///
/// # Arguments
///
/// * `config` - Immutable run configuration (ledger directory included)
/// * `seed` - Absolute http(s) URL to start from
/// * `config_hash` - Hash of the configuration file, stamped into metadata
///
/// # Returns
///
/// * `Ok(Ledger)` - The merged ledger, already saved
/// * `Err(CrawlError)` - The crawl failed, or the ledger could not be read or
///   written; the previous ledger file is left intact
pub async fn discover(
    config: Arc<Config>,
    seed: &str,
    config_hash: Option<String>,
) -> Result<Ledger> {
    let store = LedgerStore::new(&config.output.ledger_dir);
    let mut run = run_discovery(seed, Arc::clone(&config)).await?;
    run.metadata.config_hash = config_hash;

    let site = run.site_id().to_string();
    let fatal = |e: ledger::LedgerError| CrawlError::Fatal {
        site_id: site.clone(),
        phase: Phase::Discovery,
        url: seed.to_string(),
        message: e.to_string(),
    };

    let existing = store.load(&site).map_err(fatal)?;
    let previous = existing.as_ref().map(Ledger::len).unwrap_or(0);
    let merged = ledger::merge(existing, run);
    let path = store.save(&merged).map_err(fatal)?;

    info!(
        "Saved ledger for {} to {} ({} entries, {} new)",
        site,
        path.display(),
        merged.len(),
        merged.len() - previous
    );
    Ok(merged)
}
