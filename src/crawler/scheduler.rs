//! Scheduler for handing frontier URLs to fetch workers
//!
//! This module handles:
//! - Dequeuing from the frontier on behalf of the pool
//! - Per-host politeness (minimum spacing between fetch starts)
//! - Tracking in-flight fetches so idle workers know when the run is over
//!
//! The frontier and the per-host timestamps live in one struct so a single
//! lock serializes both.

use crate::crawler::frontier::Frontier;
use crate::state::{HostState, Termination};
use crate::url::CanonicalUrl;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A URL handed to a worker, with its politeness wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub url: CanonicalUrl,

    /// Position of the URL in dequeue order, starting at 0
    pub crawl_index: usize,

    /// How long the worker must sleep before starting the fetch
    pub wait: Duration,
}

/// What a worker should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Fetch this URL
    Fetch(Scheduled),

    /// Nothing is queued but in-flight pages may still enqueue work
    Wait,

    /// The run is over for this worker
    Finished,
}

/// Owns the frontier and the per-host politeness state for one run
#[derive(Debug)]
pub struct Scheduler {
    frontier: Frontier,
    hosts: HashMap<String, HostState>,
    min_delay: Duration,
    in_flight: usize,
    aborted: bool,
}

impl Scheduler {
    /// Creates a scheduler over `frontier`
    ///
    /// # Arguments
    ///
    /// * `frontier` - The run's frontier, usually already holding the seed
    /// * `min_delay` - Minimum time between fetch starts on one host
    pub fn new(frontier: Frontier, min_delay: Duration) -> Self {
        Self {
            frontier,
            hosts: HashMap::new(),
            min_delay,
            in_flight: 0,
            aborted: false,
        }
    }

    /// Picks the next action for a worker
    ///
    /// A dequeued URL books the next free slot on its host, so concurrent
    /// workers fetching the same host are spaced by the minimum delay.
    pub fn next(&mut self, now: Instant) -> Next {
        if self.aborted {
            return Next::Finished;
        }

        match self.frontier.dequeue() {
            Some(url) => {
                let crawl_index = self.frontier.dequeued() - 1;
                let host = url.host().unwrap_or_default();
                let wait = self
                    .hosts
                    .entry(host)
                    .or_default()
                    .reserve(self.min_delay, now);
                self.in_flight += 1;
                Next::Fetch(Scheduled {
                    url,
                    crawl_index,
                    wait,
                })
            }
            None if self.in_flight > 0 && !self.frontier.at_ceiling() => Next::Wait,
            None => Next::Finished,
        }
    }

    /// Books a slot for retrying `url` no sooner than `backoff` from `now`
    ///
    /// Retries share the host's politeness spacing with first attempts.
    /// Returns how long the caller must sleep before the retry.
    pub fn book_retry(&mut self, url: &CanonicalUrl, now: Instant, backoff: Duration) -> Duration {
        let earliest = now + backoff;
        let wait = self
            .hosts
            .entry(url.host().unwrap_or_default())
            .or_default()
            .reserve(self.min_delay, earliest);
        backoff + wait
    }

    /// Records a finished fetch and enqueues the links it produced
    ///
    /// Returns how many links were new to the frontier.
    pub fn complete<I>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.aborted {
            return 0;
        }
        links
            .into_iter()
            .filter(|url| self.frontier.enqueue(url.clone()))
            .count()
    }

    /// Stops handing out work; in-flight fetches still complete
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn queue_len(&self) -> usize {
        self.frontier.len()
    }

    /// Number of URLs handed out so far
    pub fn dispatched(&self) -> usize {
        self.frontier.dequeued()
    }

    pub fn host_state(&self, host: &str) -> Option<&HostState> {
        self.hosts.get(host)
    }

    /// Closes the frontier and reports how the run ended
    pub fn finish(&mut self) -> Termination {
        let termination = self.frontier.finish();
        if self.aborted {
            Termination::Aborted
        } else {
            termination
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FrontierState;

    const DELAY: Duration = Duration::from_millis(1000);

    fn url(host: &str, path: &str) -> CanonicalUrl {
        CanonicalUrl::parse(&format!("https://{}{}", host, path))
    }

    fn scheduler(max_pages: usize, urls: &[CanonicalUrl]) -> Scheduler {
        let mut frontier = Frontier::new(max_pages);
        for url in urls {
            frontier.enqueue(url.clone());
        }
        Scheduler::new(frontier, DELAY)
    }

    fn fetch(next: Next) -> Scheduled {
        match next {
            Next::Fetch(scheduled) => scheduled,
            other => panic!("expected a fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_first_fetch_has_no_wait() {
        let mut scheduler = scheduler(10, &[url("cafe.test", "/")]);
        let scheduled = fetch(scheduler.next(Instant::now()));

        assert_eq!(scheduled.url, url("cafe.test", "/"));
        assert_eq!(scheduled.crawl_index, 0);
        assert_eq!(scheduled.wait, Duration::ZERO);
        assert_eq!(scheduler.in_flight(), 1);
        assert_eq!(scheduler.host_state("cafe.test").unwrap().request_count, 1);
    }

    #[test]
    fn test_same_host_fetches_are_spaced() {
        let mut scheduler = scheduler(
            10,
            &[url("cafe.test", "/a"), url("cafe.test", "/b"), url("cafe.test", "/c")],
        );
        let now = Instant::now();

        assert_eq!(fetch(scheduler.next(now)).wait, Duration::ZERO);
        assert_eq!(fetch(scheduler.next(now)).wait, DELAY);
        assert_eq!(fetch(scheduler.next(now)).wait, DELAY * 2);
    }

    #[test]
    fn test_different_hosts_do_not_wait() {
        let mut scheduler = scheduler(10, &[url("cafe.test", "/"), url("bakery.test", "/")]);
        let now = Instant::now();

        assert_eq!(fetch(scheduler.next(now)).wait, Duration::ZERO);
        assert_eq!(fetch(scheduler.next(now)).wait, Duration::ZERO);
    }

    #[test]
    fn test_retries_book_host_slots() {
        let mut scheduler = scheduler(10, &[url("cafe.test", "/a"), url("cafe.test", "/b")]);
        let now = Instant::now();
        let page = fetch(scheduler.next(now));

        // A short backoff still waits out the host delay
        let backoff = Duration::from_millis(50);
        assert_eq!(scheduler.book_retry(&page.url, now, backoff), DELAY);

        // A long backoff already clears it
        let later = now + DELAY;
        let backoff = DELAY * 3;
        assert_eq!(scheduler.book_retry(&page.url, later, backoff), backoff);

        // The next first attempt queues behind both retries
        assert_eq!(fetch(scheduler.next(now)).wait, DELAY * 5);
        assert_eq!(scheduler.host_state("cafe.test").unwrap().request_count, 4);
    }

    #[test]
    fn test_wait_while_in_flight_then_finish() {
        let mut scheduler = scheduler(10, &[url("cafe.test", "/")]);
        let now = Instant::now();

        fetch(scheduler.next(now));
        assert_eq!(scheduler.next(now), Next::Wait);

        assert_eq!(scheduler.complete(vec![url("cafe.test", "/menu")]), 1);
        let scheduled = fetch(scheduler.next(now));
        assert_eq!(scheduled.crawl_index, 1);

        assert_eq!(scheduler.complete(vec![url("cafe.test", "/")]), 0);
        assert_eq!(scheduler.next(now), Next::Finished);
        assert_eq!(scheduler.finish(), Termination::Exhausted);
    }

    #[test]
    fn test_ceiling_finishes_even_with_work_in_flight() {
        let mut scheduler = scheduler(1, &[url("cafe.test", "/"), url("cafe.test", "/menu")]);
        let now = Instant::now();

        fetch(scheduler.next(now));
        assert_eq!(scheduler.next(now), Next::Finished);
        scheduler.complete(Vec::new());
        assert_eq!(scheduler.finish(), Termination::CeilingReached);
    }

    #[test]
    fn test_abort_stops_dispatch() {
        let mut scheduler = scheduler(10, &[url("cafe.test", "/"), url("cafe.test", "/menu")]);
        let now = Instant::now();

        fetch(scheduler.next(now));
        scheduler.abort();
        assert!(scheduler.is_aborted());
        assert_eq!(scheduler.next(now), Next::Finished);
        assert_eq!(scheduler.complete(vec![url("cafe.test", "/about")]), 0);
        assert_eq!(scheduler.finish(), Termination::Aborted);
    }

    #[test]
    fn test_empty_frontier_finishes_immediately() {
        let mut scheduler = scheduler(10, &[]);
        assert_eq!(scheduler.next(Instant::now()), Next::Finished);
        assert_eq!(scheduler.finish(), Termination::Exhausted);
        assert_eq!(scheduler.frontier.state(), FrontierState::Done);
    }
}
