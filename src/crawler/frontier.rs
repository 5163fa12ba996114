//! Frontier manager
//!
//! The frontier is the in-memory FIFO of not-yet-visited, in-scope URLs for
//! one run. It owns the visited-set and the page ceiling; host politeness is
//! layered on top by the scheduler.

use crate::state::{FrontierState, Termination};
use crate::url::CanonicalUrl;
use std::collections::{HashSet, VecDeque};

/// FIFO queue of canonical URLs with dedup and a dequeue ceiling
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CanonicalUrl>,
    queued: HashSet<CanonicalUrl>,
    visited: HashSet<CanonicalUrl>,
    max_pages: usize,
    dequeued: usize,
    state: FrontierState,
}

impl Frontier {
    /// Creates an idle frontier that will hand out at most `max_pages` URLs
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            max_pages,
            dequeued: 0,
            state: FrontierState::Idle,
        }
    }

    pub fn state(&self) -> FrontierState {
        self.state
    }

    /// Number of URLs handed out so far
    pub fn dequeued(&self) -> usize {
        self.dequeued
    }

    /// Number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, url: &CanonicalUrl) -> bool {
        self.visited.contains(url)
    }

    pub fn at_ceiling(&self) -> bool {
        self.dequeued >= self.max_pages
    }

    /// Appends a URL unless it was already visited or queued
    ///
    /// Returns true if the URL was appended.
    pub fn enqueue(&mut self, url: CanonicalUrl) -> bool {
        if self.state == FrontierState::Done
            || self.visited.contains(&url)
            || self.queued.contains(&url)
        {
            return false;
        }

        self.queued.insert(url.clone());
        self.queue.push_back(url);

        if self.state == FrontierState::Exhausted {
            self.state = if self.at_ceiling() {
                FrontierState::CeilingReached
            } else {
                FrontierState::Running
            };
        }
        true
    }

    /// Pops the next URL in FIFO order and marks it visited
    ///
    /// Returns None when the ceiling has been reached or the queue is empty,
    /// moving the frontier to `CeilingReached` or `Exhausted` respectively.
    pub fn dequeue(&mut self) -> Option<CanonicalUrl> {
        if self.state == FrontierState::Done {
            return None;
        }

        if self.at_ceiling() {
            self.state = if self.queue.is_empty() {
                FrontierState::Exhausted
            } else {
                FrontierState::CeilingReached
            };
            return None;
        }

        let Some(url) = self.queue.pop_front() else {
            self.state = FrontierState::Exhausted;
            return None;
        };

        self.queued.remove(&url);
        self.visited.insert(url.clone());
        self.dequeued += 1;
        self.state = FrontierState::Running;
        Some(url)
    }

    /// Closes the frontier and reports how the run ended
    pub fn finish(&mut self) -> Termination {
        let termination = if self.at_ceiling() && !self.queue.is_empty() {
            Termination::CeilingReached
        } else {
            Termination::Exhausted
        };
        self.state = FrontierState::Done;
        termination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> CanonicalUrl {
        CanonicalUrl::parse(&format!("https://cafe.test{}", path))
    }

    #[test]
    fn test_new_frontier_is_idle() {
        let frontier = Frontier::new(10);
        assert_eq!(frontier.state(), FrontierState::Idle);
        assert!(frontier.is_empty());
        assert_eq!(frontier.dequeued(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new(10);
        frontier.enqueue(url("/a"));
        frontier.enqueue(url("/b"));
        frontier.enqueue(url("/c"));

        assert_eq!(frontier.dequeue(), Some(url("/a")));
        assert_eq!(frontier.state(), FrontierState::Running);
        assert_eq!(frontier.dequeue(), Some(url("/b")));
        assert_eq!(frontier.dequeue(), Some(url("/c")));
        assert_eq!(frontier.dequeue(), None);
        assert_eq!(frontier.state(), FrontierState::Exhausted);
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut frontier = Frontier::new(10);
        assert!(frontier.enqueue(url("/a")));
        assert!(!frontier.enqueue(url("/a")));
        assert_eq!(frontier.len(), 1);

        frontier.dequeue();
        // Visited URLs never come back
        assert!(!frontier.enqueue(url("/a")));
        assert!(frontier.is_empty());
        assert!(frontier.is_visited(&url("/a")));
    }

    #[test]
    fn test_ceiling_with_work_remaining() {
        let mut frontier = Frontier::new(2);
        for path in ["/a", "/b", "/c"] {
            frontier.enqueue(url(path));
        }

        assert!(frontier.dequeue().is_some());
        assert!(frontier.dequeue().is_some());
        assert_eq!(frontier.dequeue(), None);
        assert_eq!(frontier.state(), FrontierState::CeilingReached);
        assert_eq!(frontier.dequeued(), 2);
        assert_eq!(frontier.finish(), Termination::CeilingReached);
        assert_eq!(frontier.state(), FrontierState::Done);
    }

    #[test]
    fn test_ceiling_equal_to_site_size_is_exhausted() {
        let mut frontier = Frontier::new(2);
        frontier.enqueue(url("/a"));
        frontier.enqueue(url("/b"));

        frontier.dequeue();
        frontier.dequeue();
        assert_eq!(frontier.dequeue(), None);
        assert_eq!(frontier.state(), FrontierState::Exhausted);
        assert_eq!(frontier.finish(), Termination::Exhausted);
    }

    #[test]
    fn test_exhausted_frontier_resumes_on_enqueue() {
        let mut frontier = Frontier::new(10);
        frontier.enqueue(url("/"));
        frontier.dequeue();
        assert_eq!(frontier.dequeue(), None);
        assert_eq!(frontier.state(), FrontierState::Exhausted);

        assert!(frontier.enqueue(url("/menu")));
        assert_eq!(frontier.state(), FrontierState::Running);
        assert_eq!(frontier.dequeue(), Some(url("/menu")));
    }

    #[test]
    fn test_done_frontier_rejects_work() {
        let mut frontier = Frontier::new(10);
        frontier.finish();
        assert!(!frontier.enqueue(url("/a")));
        assert_eq!(frontier.dequeue(), None);
    }

    #[test]
    fn test_visited_set_is_monotonic() {
        let mut frontier = Frontier::new(10);
        let mut last = 0;
        for path in ["/a", "/b", "/a", "/c", "/b"] {
            frontier.enqueue(url(path));
            frontier.dequeue();
            assert!(frontier.visited_count() >= last);
            last = frontier.visited_count();
        }
        assert_eq!(last, 3);
    }
}
