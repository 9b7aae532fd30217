//! Crawl event sink
//!
//! The engine reports everything worth logging as a `CrawlEvent`. Recoverable
//! failures end here instead of propagating to the caller.

use std::fmt;
use std::sync::Mutex;

/// Where a product URL was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    Link,
    Sitemap,
    EmbeddedJson,
}

impl fmt::Display for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Discovery::Link => "link",
            Discovery::Sitemap => "sitemap",
            Discovery::EmbeddedJson => "embedded-json",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    RobotsRead {
        url: String,
        sitemaps: usize,
        entry_points: usize,
    },
    RobotsFailed {
        url: String,
        error: String,
    },
    SitemapResolved {
        url: String,
        children: usize,
        leaves: usize,
    },
    /// Already resolved in this run, or nested too deep
    SitemapSkipped {
        url: String,
        reason: String,
    },
    SitemapFailed {
        url: String,
        error: String,
    },
    PageProcessed {
        url: String,
        depth: u32,
        links: usize,
    },
    PageFailed {
        url: String,
        depth: u32,
        error: String,
    },
    PageBlocked {
        url: String,
        status: u16,
        mirror: Option<String>,
    },
    ProductFound {
        domain: String,
        url: String,
        source: Discovery,
    },
    JsonBlockSkipped {
        url: String,
        error: String,
    },
}

/// Receives crawl events
pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::RobotsRead {
                url,
                sitemaps,
                entry_points,
            } => tracing::info!(
                "Read {}: {} sitemaps, {} category entry points",
                url,
                sitemaps,
                entry_points
            ),
            CrawlEvent::RobotsFailed { url, error } => {
                tracing::warn!("Failed to read {}: {}", url, error)
            }
            CrawlEvent::SitemapResolved {
                url,
                children,
                leaves,
            } => tracing::debug!(
                "Resolved sitemap {} ({} children, {} urls)",
                url,
                children,
                leaves
            ),
            CrawlEvent::SitemapSkipped { url, reason } => {
                tracing::debug!("Skipping sitemap {}: {}", url, reason)
            }
            CrawlEvent::SitemapFailed { url, error } => {
                tracing::warn!("Sitemap {} failed: {}", url, error)
            }
            CrawlEvent::PageProcessed { url, depth, links } => {
                tracing::debug!("Processed {} at depth {} ({} links)", url, depth, links)
            }
            CrawlEvent::PageFailed { url, depth, error } => {
                tracing::warn!("Page {} at depth {} failed: {}", url, depth, error)
            }
            CrawlEvent::PageBlocked {
                url,
                status,
                mirror,
            } => match mirror {
                Some(mirror) => {
                    tracing::info!("Blocked ({}) at {}, retrying on {}", status, url, mirror)
                }
                None => tracing::warn!("Blocked ({}) at {}, no mirror to retry", status, url),
            },
            CrawlEvent::ProductFound {
                domain,
                url,
                source,
            } => tracing::info!("Found product ({}) for {}: {}", source, domain, url),
            CrawlEvent::JsonBlockSkipped { url, error } => {
                tracing::trace!("Skipping embedded JSON on {}: {}", url, error)
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<CrawlEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl CrawlObserver for MemoryObserver {
    fn on_event(&self, event: &CrawlEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
