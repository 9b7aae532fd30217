use crate::state::{PageState, ProductStore};
use crate::RippleError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-engine crawl bookkeeping: visited pages, their states, seen sitemaps and products
///
/// The visited set only grows. A URL enters it as `Dispatched` before its fetch is
/// issued, which is what guarantees at most one fetch per URL per engine.
#[derive(Debug, Default)]
pub struct Frontier {
    pages: HashMap<String, PageState>,
    sitemaps: HashSet<String>,
    robots_read: usize,
    pub products: ProductStore,
}

/// Counters exported with a shard's results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontierStats {
    pub pages_by_state: BTreeMap<PageState, usize>,
    pub sitemaps_resolved: usize,
    pub robots_read: usize,
    pub products: usize,
}

impl Frontier {
    pub fn new(products: ProductStore) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Claims a URL for fetching
    ///
    /// Returns true exactly once per URL; later calls see it as visited.
    pub fn try_dispatch(&mut self, url: &str) -> bool {
        if self.pages.contains_key(url) {
            return false;
        }
        self.pages.insert(url.to_string(), PageState::Dispatched);
        true
    }

    pub fn state_of(&self, url: &str) -> Option<PageState> {
        self.pages.get(url).copied()
    }

    /// Moves a dispatched URL to its next state
    pub fn advance(&mut self, url: &str, to: PageState) -> Result<(), RippleError> {
        let current = self.pages.get_mut(url).ok_or_else(|| RippleError::InvalidTransition {
            url: url.to_string(),
            from: PageState::Dispatched,
            to,
        })?;

        if !current.can_transition_to(to) {
            return Err(RippleError::InvalidTransition {
                url: url.to_string(),
                from: *current,
                to,
            });
        }

        *current = to;
        Ok(())
    }

    /// Claims a sitemap URL; false if it was already resolved in this run
    pub fn try_claim_sitemap(&mut self, url: &str) -> bool {
        self.sitemaps.insert(url.to_string())
    }

    pub fn note_robots_read(&mut self) {
        self.robots_read += 1;
    }

    pub fn stats(&self) -> FrontierStats {
        let mut pages_by_state = BTreeMap::new();
        for state in self.pages.values() {
            *pages_by_state.entry(*state).or_insert(0) += 1;
        }

        FrontierStats {
            pages_by_state,
            sitemaps_resolved: self.sitemaps.len(),
            robots_read: self.robots_read,
            products: self.products.total(),
        }
    }
}
