use std::time::{Duration, Instant};

/// Tracks per-domain request timing for the scheduler
///
/// Only the scheduler of a single shard touches this, so it needs no internal
/// synchronisation.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests admitted to this domain
    pub request_count: u32,

    /// Instant at which the most recent request to this domain was (or will be) issued
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the next issue slot for this domain
    ///
    /// The returned instant is at least `delay` after the previously claimed
    /// slot and never earlier than `now`. Claims are recorded immediately, so
    /// callers that claim back to back receive strictly spaced slots even before
    /// any of them has actually fired.
    pub fn reserve_slot(&mut self, delay: Duration, now: Instant) -> Instant {
        let slot = match self.last_request_time {
            Some(last) if last + delay > now => last + delay,
            _ => now,
        };
        self.last_request_time = Some(slot);
        self.request_count += 1;
        slot
    }
}
