use std::time::{Duration, Instant};

/// Tracks the politeness state of one host during a run
///
/// The scheduler books fetch slots ahead of time: a reservation moves
/// `last_fetch` to the slot's start, so two workers can never be handed
/// slots on the same host closer together than the minimum delay.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of fetches booked against this host in the current run
    pub request_count: u32,

    /// Start time of the most recently booked fetch
    pub last_fetch: Option<Instant>,
}

impl HostState {
    /// Creates a new HostState with no fetch history
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the time until the next fetch may start
    ///
    /// Returns None if a fetch can start now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_fetch?;
        let ready = last + min_delay;
        if ready > now {
            Some(ready - now)
        } else {
            None
        }
    }

    /// Books the next fetch slot for this host
    ///
    /// # Arguments
    ///
    /// * `min_delay` - Minimum spacing between fetch starts on this host
    /// * `now` - The current time instant
    ///
    /// # Returns
    ///
    /// How long the caller must sleep before starting the fetch
    pub fn reserve(&mut self, min_delay: Duration, now: Instant) -> Duration {
        let wait = self
            .time_until_next_request(min_delay, now)
            .unwrap_or_default();
        self.last_fetch = Some(now + wait);
        self.request_count += 1;
        wait
    }
}
