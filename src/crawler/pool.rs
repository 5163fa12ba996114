//! Fetch worker pool
//!
//! A fixed number of tokio tasks share one scheduler behind a single lock.
//! Each worker asks the scheduler for a URL, honors the host wait, fetches
//! with retry (every retry books a fresh host slot), hands the result to the phase's `PageVisitor` and feeds any
//! returned links back into the frontier. Workers with nothing to do park on
//! a `Notify` until an in-flight page completes.

use crate::config::Config;
use crate::crawler::fetcher::{fetch_with_retry, FetchedPage};
use crate::crawler::scheduler::{Next, Scheduler};
use crate::state::Termination;
use crate::url::CanonicalUrl;
use crate::{CrawlError, Result};
use chrono::Utc;
use reqwest::Client;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

/// Pages between two progress lines
const PROGRESS_INTERVAL: usize = 10;

/// What a phase does with each fetched page
///
/// Called from worker tasks, concurrently. The returned links are enqueued
/// into the frontier; the frontier drops anything already visited or queued.
/// An error aborts the run.
pub trait PageVisitor: Send + Sync {
    fn visit(&self, page: &FetchedPage) -> Result<Vec<CanonicalUrl>>;
}

/// Totals for one pool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    /// Pages fetched, failed fetches included
    pub pages_fetched: usize,

    /// Fetches that ended in an error outcome
    pub failures: usize,

    pub termination: Termination,

    pub elapsed: Duration,
}

struct Shared {
    scheduler: Mutex<Scheduler>,
    wake: Notify,
    client: Client,
    config: Arc<Config>,
    visitor: Arc<dyn PageVisitor>,
    fetched: AtomicUsize,
    failures: AtomicUsize,
    started: Instant,
}

/// Runs the pool until the frontier is exhausted or the ceiling is reached
///
/// # Arguments
///
/// * `scheduler` - Scheduler over the run's frontier, seeded by the caller
/// * `config` - Immutable run configuration (worker count, retries)
/// * `client` - HTTP client shared by every worker
/// * `visitor` - The phase-specific page handler
///
/// # Returns
///
/// * `Ok(PoolReport)` - The run finished
/// * `Err(CrawlError)` - A visitor failed or panicked, or a worker task died
pub async fn run_pool(
    scheduler: Scheduler,
    config: Arc<Config>,
    client: Client,
    visitor: Arc<dyn PageVisitor>,
) -> Result<PoolReport> {
    let workers = config.crawler.workers.max(1);
    let shared = Arc::new(Shared {
        scheduler: Mutex::new(scheduler),
        wake: Notify::new(),
        client,
        config,
        visitor,
        fetched: AtomicUsize::new(0),
        failures: AtomicUsize::new(0),
        started: Instant::now(),
    });

    info!("Starting {} fetch workers", workers);

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move { worker(worker_id, shared).await })
        })
        .collect();

    let mut first_error = None;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| CrawlError::Worker(e.to_string()))
            .and_then(|result| result);
        if let Err(e) = outcome {
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    let termination = shared.scheduler.lock().await.finish();
    if let Some(e) = first_error {
        return Err(e);
    }

    let report = PoolReport {
        pages_fetched: shared.fetched.load(Ordering::Relaxed),
        failures: shared.failures.load(Ordering::Relaxed),
        termination,
        elapsed: shared.started.elapsed(),
    };

    info!(
        "Pool finished ({}): {} pages fetched, {} failed, {:.1}s",
        report.termination,
        report.pages_fetched,
        report.failures,
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}

async fn worker(worker_id: usize, shared: Arc<Shared>) -> Result<()> {
    debug!("Worker {} started", worker_id);
    let crawler = &shared.config.crawler;

    loop {
        // Registered before the check so a completion in between is not missed
        let notified = shared.wake.notified();

        let next = shared.scheduler.lock().await.next(Instant::now());
        let scheduled = match next {
            Next::Fetch(scheduled) => scheduled,
            Next::Wait => {
                notified.await;
                continue;
            }
            Next::Finished => break,
        };

        if !scheduled.wait.is_zero() {
            tokio::time::sleep(scheduled.wait).await;
        }

        debug!("[Worker {}] Fetching {}", worker_id, scheduled.url);
        let scheduler = &shared.scheduler;
        let url = &scheduled.url;
        let (outcome, attempts) = fetch_with_retry(
            &shared.client,
            url,
            crawler.max_retries,
            crawler.retry_backoff(),
            move |backoff| async move {
                let wait = scheduler
                    .lock()
                    .await
                    .book_retry(url, Instant::now(), backoff);
                tokio::time::sleep(wait).await;
            },
        )
        .await;

        let page = FetchedPage {
            url: scheduled.url,
            crawl_index: scheduled.crawl_index,
            outcome,
            attempts,
            fetched_at: Utc::now(),
        };

        if page.outcome.state().is_failure() {
            shared.failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Failed to fetch {}: {}{}",
                page.url,
                page.outcome.state(),
                page.outcome
                    .status_code()
                    .map(|code| format!(" (HTTP {})", code))
                    .unwrap_or_default()
            );
        }

        // A panic aborts the run like any other visitor error
        let visited = panic::catch_unwind(AssertUnwindSafe(|| shared.visitor.visit(&page)))
            .unwrap_or_else(|payload| {
                Err(CrawlError::Worker(format!(
                    "page handler panicked at {}: {}",
                    page.url,
                    panic_message(payload.as_ref())
                )))
            });

        let mut scheduler = shared.scheduler.lock().await;
        let links = match visited {
            Ok(links) => links,
            Err(e) => {
                scheduler.complete(Vec::new());
                scheduler.abort();
                drop(scheduler);
                shared.wake.notify_waiters();
                error!("[Worker {}] Aborting run at {}: {}", worker_id, page.url, e);
                return Err(e);
            }
        };

        let found = links.len();
        let added = scheduler.complete(links);
        let queued = scheduler.queue_len();
        drop(scheduler);
        shared.wake.notify_waiters();

        debug!(
            "[Worker {}] {} yielded {} links, {} new to the frontier",
            worker_id, page.url, found, added
        );

        let fetched = shared.fetched.fetch_add(1, Ordering::Relaxed) + 1;
        if fetched % PROGRESS_INTERVAL == 0 {
            let elapsed = shared.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                fetched as f64 / elapsed
            } else {
                0.0
            };
            info!(
                "Progress: {} pages fetched, {} queued, {:.2} pages/sec",
                fetched, queued, rate
            );
        }
    }

    debug!("Worker {} finished", worker_id);
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
