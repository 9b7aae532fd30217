//! Request admission and rate limiting
//!
//! Every outbound fetch of a crawl engine passes two gates, in this order:
//! - a global concurrency cap (a FIFO tokio semaphore)
//! - per-domain minimum spacing between issued requests
//!
//! Admission is represented by an RAII guard, so the concurrency slot is
//! released on every exit path of the fetch, including errors and panics.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchRequest, FetchResponse, Fetcher};
use crate::state::DomainState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A throttling policy consulted before each fetch
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Waits until a request to `domain` may be issued
    async fn admit(&self, domain: &str) -> Admission;
}

/// Proof of admission; dropping it frees the concurrency slot
pub struct Admission {
    _permit: Option<OwnedSemaphorePermit>,
    in_flight: Option<Arc<AtomicUsize>>,
}

impl Admission {
    /// An admission that holds no slot
    pub fn unbounded() -> Self {
        Self {
            _permit: None,
            in_flight: None,
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if let Some(counter) = &self.in_flight {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Per-shard scheduler combining the concurrency cap with per-domain spacing
///
/// The scheduler is shared by all concurrent page tasks of one crawl engine.
/// Domain bookkeeping sits behind a `std::sync::Mutex` that is only held while
/// a slot is reserved, never across an await point.
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    /// Per-domain state tracking
    domain_states: Mutex<HashMap<String, DomainState>>,

    /// Minimum spacing between two requests to the same domain
    delay: Duration,

    capacity: usize,
    in_flight: Arc<AtomicUsize>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Maximum number of fetches in flight at once (at least 1)
    /// * `delay` - Minimum spacing between requests to one domain
    pub fn new(max_concurrent: usize, delay: Duration) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            domain_states: Mutex::new(HashMap::new()),
            delay,
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.concurrency(), config.request_delay())
    }

    /// Number of admitted fetches that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Gets a copy of the domain state for a specific domain
    pub fn domain_state(&self, domain: &str) -> Option<DomainState> {
        self.lock_states().get(domain).cloned()
    }

    /// Claims the next issue slot for a domain
    fn reserve(&self, domain: &str) -> Instant {
        let mut states = self.lock_states();
        states
            .entry(domain.to_string())
            .or_insert_with(DomainState::new)
            .reserve_slot(self.delay, Instant::now())
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<String, DomainState>> {
        // A poisoned map still holds valid timestamps
        self.domain_states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Throttle for Scheduler {
    async fn admit(&self, domain: &str) -> Admission {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Scheduler semaphore closed; admitting {} unbounded", domain);
                None
            }
        };

        let slot = self.reserve(domain);
        let now = Instant::now();
        if slot > now {
            tracing::trace!("Spacing request to {} by {:?}", domain, slot - now);
            tokio::time::sleep_until(tokio::time::Instant::from_std(slot)).await;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Admission {
            _permit: permit,
            in_flight: Some(self.in_flight.clone()),
        }
    }
}

/// A policy that admits every request immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

#[async_trait]
impl Throttle for Unthrottled {
    async fn admit(&self, _domain: &str) -> Admission {
        Admission::unbounded()
    }
}

/// Issues a fetch once the throttle admits it
///
/// The admission is held for the duration of the fetch only.
pub async fn throttled_fetch(
    throttle: &dyn Throttle,
    fetcher: &dyn Fetcher,
    domain: &str,
    request: FetchRequest,
) -> Result<FetchResponse, FetchError> {
    let _admission = throttle.admit(domain).await;
    fetcher.fetch(request).await
}
