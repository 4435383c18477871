//! Fetch throttling, quality-upgrade debouncing and stale-response rejection.
//!
//! Everything here is driven by explicit `Instant`s handed in by the caller,
//! so the render loop owns the clock and tests can step it.

use std::time::{Duration, Instant};

/// Limits issued requests to one per `interval`.
///
/// Holds a single pending slot: a request made while another is waiting
/// replaces it and marks the slot as superseded.
#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_issued: Option<Instant>,
    pending: Option<T>,
    superseded: bool,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_issued: None,
            pending: None,
            superseded: false,
        }
    }

    /// Queue `request`, replacing any request still waiting.
    pub fn request(&mut self, request: T) {
        if self.pending.replace(request).is_some() {
            self.superseded = true;
        }
    }

    /// Release the pending request if the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_none() {
            return None;
        }
        if let Some(due) = self.next_due() {
            if now < due {
                return None;
            }
        }
        self.last_issued = Some(now);
        self.superseded = false;
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the waiting request replaced an earlier one.
    pub fn was_superseded(&self) -> bool {
        self.superseded
    }

    /// Earliest instant the next request may be issued.
    pub fn next_due(&self) -> Option<Instant> {
        self.last_issued.map(|t| t + self.interval)
    }
}

/// Fires once after inputs stop changing for `quiet`.
#[derive(Debug, Clone)]
pub struct Debounce {
    quiet: Duration,
    last_change: Option<Instant>,
    fired: bool,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_change: None,
            fired: false,
        }
    }

    /// Record an input change; restarts the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
        self.fired = false;
    }

    /// True exactly once per quiet period that has elapsed since the last
    /// change.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.fired || !self.is_settled(now) {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        match self.last_change {
            Some(t) => now.saturating_duration_since(t) >= self.quiet,
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Forget the last change so nothing fires until the next `touch`.
    pub fn reset(&mut self) {
        self.last_change = None;
        self.fired = false;
    }
}

/// Monotonic generation attached to each issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Latest data received for one request stream.
///
/// Responses carry the ticket their fetch was issued with; a response older
/// than the one already applied is dropped, so out-of-order completions
/// never roll the cache back.
#[derive(Debug)]
pub struct DataFeed<T> {
    name: &'static str,
    next_generation: u64,
    applied: Option<u64>,
    data: Option<T>,
    dirty: bool,
}

impl<T> DataFeed<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_generation: 1,
            applied: None,
            data: None,
            dirty: false,
        }
    }

    /// Ticket for a new fetch.
    pub fn issue(&mut self) -> FetchTicket {
        let ticket = FetchTicket(self.next_generation);
        self.next_generation += 1;
        ticket
    }

    /// Apply a response. Returns false when it was stale and dropped.
    pub fn apply(&mut self, ticket: FetchTicket, data: T) -> bool {
        if let Some(applied) = self.applied {
            if ticket.0 <= applied {
                log::warn!(
                    "{}: dropping stale response (generation {} <= applied {})",
                    self.name,
                    ticket.0,
                    applied
                );
                return false;
            }
        }
        self.applied = Some(ticket.0);
        self.data = Some(data);
        self.dirty = true;
        true
    }

    pub fn current(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Move the data out, keeping the applied generation.
    pub fn take(&mut self) -> Option<T> {
        self.data.take()
    }

    pub fn applied_generation(&self) -> Option<u64> {
        self.applied
    }

    /// Whether a fetch was issued after the last applied response.
    pub fn is_waiting(&self) -> bool {
        self.next_generation - 1 > self.applied.unwrap_or(0)
    }

    /// True once after each applied response.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn clear(&mut self) {
        self.data = None;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_throttle_limits_rate() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(100 * MS);
        throttle.request(1);
        assert_eq!(throttle.poll(t0), Some(1));
        throttle.request(2);
        assert_eq!(throttle.poll(t0 + 50 * MS), None);
        assert!(throttle.has_pending());
        assert_eq!(throttle.poll(t0 + 100 * MS), Some(2));
        assert_eq!(throttle.poll(t0 + 300 * MS), None);
    }

    #[test]
    fn test_throttle_keeps_only_latest_request() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(100 * MS);
        throttle.request("a");
        throttle.poll(t0);
        throttle.request("b");
        throttle.request("c");
        assert!(throttle.was_superseded());
        assert_eq!(throttle.poll(t0 + 120 * MS), Some("c"));
        assert!(!throttle.was_superseded());
        assert!(!throttle.has_pending());
    }

    #[test]
    fn test_debounce_fires_once_after_quiet_period() {
        let t0 = Instant::now();
        let mut debounce = Debounce::new(120 * MS);
        assert!(!debounce.poll(t0));
        debounce.touch(t0);
        assert!(!debounce.poll(t0 + 60 * MS));
        debounce.touch(t0 + 60 * MS);
        assert!(!debounce.poll(t0 + 150 * MS));
        assert!(debounce.poll(t0 + 180 * MS));
        assert!(!debounce.poll(t0 + 500 * MS));
        assert!(debounce.has_fired());
    }

    #[test]
    fn test_data_feed_drops_stale_responses() {
        let mut feed = DataFeed::new("test");
        let first = feed.issue();
        let second = feed.issue();
        assert!(feed.is_waiting());
        assert!(feed.apply(second, "new"));
        assert!(!feed.apply(first, "old"));
        assert_eq!(feed.current(), Some(&"new"));
        assert_eq!(feed.applied_generation(), Some(second.generation()));
        assert!(!feed.is_waiting());
    }

    #[test]
    fn test_data_feed_applies_late_but_newer_response() {
        let mut feed = DataFeed::new("test");
        let a = feed.issue();
        let b = feed.issue();
        let c = feed.issue();
        assert!(feed.apply(a, 1));
        assert!(feed.apply(b, 2));
        assert!(feed.is_waiting());
        assert!(feed.take_dirty());
        assert!(!feed.take_dirty());
        assert!(feed.apply(c, 3));
        assert_eq!(feed.current(), Some(&3));
        assert_eq!(feed.take(), Some(3));
        assert!(feed.current().is_none());
        // taking the data does not reopen older generations
        assert!(!feed.apply(b, 2));
    }
}
