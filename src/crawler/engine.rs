//! The crawl engine of one shard
//!
//! A `CrawlEngine` owns all mutable state of a shard (visited pages, seen
//! sitemaps, products) and borrows its collaborators through trait objects:
//! the fetcher, the document parser, the throttle policy and the observer.
//! Recursive operations (`crawl_page`, `resolve_sitemap`) return boxed futures
//! that borrow the engine, so a shard runs as a single task whose page fetches
//! overlap up to the throttle's limits.

use crate::config::Config;
use crate::crawler::coordinator::ShardPlan;
use crate::crawler::extractor;
use crate::crawler::fetcher::{request_headers, FetchError, FetchRequest, Fetcher, HttpFetcher};
use crate::crawler::observer::{CrawlEvent, CrawlObserver, Discovery, TracingObserver};
use crate::crawler::parser::{DocumentParser, HtmlParser, ScriptBlock};
use crate::crawler::scheduler::{throttled_fetch, Scheduler, Throttle};
use crate::robots::{category_url, RobotsDirectives};
use crate::state::{Frontier, FrontierStats, PageState, ProductSnapshot, ProductStore};
use crate::url::{extract_domain, resolve_link, swap_domain, Classification, UrlClassifier};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// Collaborators an engine is built from
#[derive(Clone)]
pub struct EngineDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub parser: Arc<dyn DocumentParser>,
    pub throttle: Arc<dyn Throttle>,
    pub observer: Arc<dyn CrawlObserver>,
}

impl EngineDeps {
    /// reqwest fetcher, scraper parser, a fresh scheduler and tracing output
    pub fn production(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new()?),
            parser: Arc::new(HtmlParser),
            throttle: Arc::new(Scheduler::from_config(&config.crawler)),
            observer: Arc::new(TracingObserver),
        })
    }
}

/// Limits and request settings an engine runs with
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_depth: u32,
    pub robots_timeout: Duration,
    pub sitemap_timeout: Duration,
    pub page_timeout: Duration,
    pub max_block_retries: u32,
    pub max_sitemap_depth: u32,
    pub max_json_depth: usize,
    pub user_agents: Vec<String>,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let crawler = &config.crawler;
        Self {
            max_depth: crawler.max_depth,
            robots_timeout: crawler.robots_timeout(),
            sitemap_timeout: crawler.sitemap_timeout(),
            page_timeout: crawler.page_timeout(),
            max_block_retries: crawler.max_block_retries,
            max_sitemap_depth: crawler.max_sitemap_depth,
            max_json_depth: crawler.max_json_depth,
            user_agents: config.user_agent.agents.clone(),
        }
    }
}

pub struct CrawlEngine {
    pub(crate) deps: EngineDeps,
    pub(crate) classifier: Arc<UrlClassifier>,
    pub(crate) settings: EngineSettings,
    allowed: HashSet<String>,
    frontier: Mutex<Frontier>,
}

impl CrawlEngine {
    /// Creates an engine responsible for `domains`
    ///
    /// Links are only followed, and products only recorded, for these domains
    /// and their mirror domains.
    pub fn new(
        settings: EngineSettings,
        classifier: Arc<UrlClassifier>,
        domains: &[String],
        deps: EngineDeps,
    ) -> Self {
        let mut allowed: HashSet<String> = domains.iter().cloned().collect();
        for domain in domains {
            if let Some(alt) = classifier.alt_domain(domain) {
                allowed.insert(alt.to_string());
            }
        }

        Self {
            deps,
            classifier,
            settings,
            allowed,
            frontier: Mutex::new(Frontier::new(ProductStore::with_domains(domains.iter()))),
        }
    }

    /// Runs the shard pipeline: robots files, then sitemaps, then start pages
    pub async fn run(&self, plan: &ShardPlan) {
        join_all(plan.robots_urls.iter().map(|url| self.resolve_robots(url))).await;

        join_all(
            plan.sitemap_urls
                .iter()
                .map(|url| self.resolve_sitemap(url.clone(), 0)),
        )
        .await;

        let starts = plan.start_urls.iter().filter_map(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Skipping start URL {}: {}", raw, e);
                None
            }
        });
        join_all(starts.map(|url| self.crawl_page(url, 0))).await;
    }

    pub fn is_allowed(&self, domain: &str) -> bool {
        self.allowed.contains(domain)
    }

    pub fn snapshot(&self) -> ProductSnapshot {
        self.frontier().products.snapshot()
    }

    pub fn stats(&self) -> FrontierStats {
        self.frontier().stats()
    }

    pub fn page_state(&self, url: &str) -> Option<PageState> {
        self.frontier().state_of(url)
    }

    pub(crate) fn frontier(&self) -> MutexGuard<'_, Frontier> {
        // Frontier updates are single statements, so a poisoned lock is still consistent
        self.frontier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn emit(&self, event: CrawlEvent) {
        self.deps.observer.on_event(&event);
    }

    pub(crate) fn request(&self, url: &str, timeout: Duration) -> FetchRequest {
        FetchRequest::new(url, timeout).with_headers(request_headers(&self.settings.user_agents))
    }

    /// Classifies a discovered URL under its own domain and records products
    ///
    /// Returns `None` when the URL is discarded before classification: its
    /// domain is outside this engine's set, or the domain excludes it.
    pub(crate) fn consider(&self, url: &Url, source: Discovery) -> Option<Classification> {
        let domain = extract_domain(url)?;
        if !self.is_allowed(&domain) {
            return None;
        }

        let url_str = url.as_str();
        if self.classifier.is_excluded(url_str, &domain) {
            return None;
        }

        let (classification, recorded) = {
            let mut frontier = self.frontier();
            let classification = self.classifier.classify(url_str, &domain, &frontier.products);
            let recorded = classification == Classification::Product
                && frontier.products.record(&domain, url_str);
            (classification, recorded)
        };

        if recorded {
            self.emit(CrawlEvent::ProductFound {
                domain,
                url: url_str.to_string(),
                source,
            });
        }

        Some(classification)
    }

    fn advance(&self, url: &str, to: PageState) {
        if let Err(e) = self.frontier().advance(url, to) {
            tracing::error!("{}", e);
        }
    }

    /// Reads a robots.txt file and follows what it points at
    ///
    /// Every `Sitemap:` entry is resolved. For domains with category rules,
    /// `Allow:` paths matching a category pattern are crawled as depth-0 entry
    /// points.
    pub async fn resolve_robots(&self, raw_url: &str) {
        let robots_url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => {
                self.emit(CrawlEvent::RobotsFailed {
                    url: raw_url.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };
        let Some(domain) = extract_domain(&robots_url) else {
            return;
        };

        let request = self.request(raw_url, self.settings.robots_timeout);
        let response = match throttled_fetch(
            self.deps.throttle.as_ref(),
            self.deps.fetcher.as_ref(),
            &domain,
            request,
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                self.emit(CrawlEvent::RobotsFailed {
                    url: raw_url.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let directives = RobotsDirectives::from_content(&response.body.into_text());
        self.frontier().note_robots_read();

        let entry_points: Vec<Url> = if self.classifier.has_category_rules(&domain) {
            directives
                .allows
                .iter()
                .filter(|path| self.classifier.is_category_path(&domain, path))
                .filter_map(|path| category_url(&robots_url, path))
                .collect()
        } else {
            Vec::new()
        };

        self.emit(CrawlEvent::RobotsRead {
            url: raw_url.to_string(),
            sitemaps: directives.sitemaps.len(),
            entry_points: entry_points.len(),
        });

        join_all(
            directives
                .sitemaps
                .into_iter()
                .map(|sitemap| self.resolve_sitemap(sitemap, 0)),
        )
        .await;

        join_all(entry_points.into_iter().map(|url| self.crawl_page(url, 0))).await;
    }

    /// Crawls one page and recurses into the links it discovers
    pub fn crawl_page(&self, url: Url, depth: u32) -> BoxFuture<'_, ()> {
        self.crawl_with_retries(url, depth, self.settings.max_block_retries)
    }

    fn crawl_with_retries(&self, url: Url, depth: u32, retries_left: u32) -> BoxFuture<'_, ()> {
        async move {
            let url_str = url.as_str().to_string();

            if depth > self.settings.max_depth || self.classifier.has_skip_extension(&url_str) {
                return;
            }
            if !self.frontier().try_dispatch(&url_str) {
                return;
            }

            let Some(domain) = extract_domain(&url) else {
                self.fail_page(&url_str, depth, "URL has no host".to_string());
                return;
            };

            let request = self
                .request(&url_str, self.settings.page_timeout)
                .accept_statuses(self.classifier.block_statuses());
            let response = match throttled_fetch(
                self.deps.throttle.as_ref(),
                self.deps.fetcher.as_ref(),
                &domain,
                request,
            )
            .await
            {
                Ok(response) => response,
                Err(e) => {
                    self.fail_page(&url_str, depth, e.to_string());
                    return;
                }
            };

            if self.classifier.is_block_status(response.status) {
                let mirror = self
                    .classifier
                    .alt_domain(&domain)
                    .filter(|_| retries_left > 0)
                    .and_then(|alt| swap_domain(&url, &domain, alt));

                self.emit(CrawlEvent::PageBlocked {
                    url: url_str.clone(),
                    status: response.status,
                    mirror: mirror.as_ref().map(|m| m.to_string()),
                });

                match mirror {
                    Some(mirror) => {
                        self.advance(&url_str, PageState::Blocked);
                        self.crawl_with_retries(mirror, depth, retries_left - 1).await;
                    }
                    None => self.advance(&url_str, PageState::Failed),
                }
                return;
            }

            self.advance(&url_str, PageState::Fetched);
            let text = response.body.into_text();
            let (links, scripts) = self.extract(&text);

            let mut children = Vec::new();
            for href in &links {
                let Some(link) = resolve_link(href, &url) else {
                    continue;
                };
                if self.consider(&link, Discovery::Link) == Some(Classification::Follow)
                    && depth < self.settings.max_depth
                {
                    children.push(link);
                }
            }

            self.extract_embedded_state(&url, &scripts);

            self.emit(CrawlEvent::PageProcessed {
                url: url_str.clone(),
                depth,
                links: links.len(),
            });

            join_all(
                children
                    .into_iter()
                    .map(|child| self.crawl_page(child, depth + 1)),
            )
            .await;

            self.advance(&url_str, PageState::Processed);
        }
        .boxed()
    }

    fn fail_page(&self, url: &str, depth: u32, error: String) {
        self.advance(url, PageState::Failed);
        self.emit(CrawlEvent::PageFailed {
            url: url.to_string(),
            depth,
            error,
        });
    }

    /// Parses page text; the document never outlives this call
    fn extract(&self, text: &str) -> (Vec<String>, Vec<ScriptBlock>) {
        let document = self.deps.parser.parse(text);
        let scripts = document.script_blocks_where(&extractor::is_state_block);
        (document.links(), scripts)
    }

    /// Records products named by URL fields of embedded state payloads
    fn extract_embedded_state(&self, page_url: &Url, scripts: &[ScriptBlock]) {
        for block in scripts {
            let value = match extractor::parse_block(block) {
                Ok(value) => value,
                Err(error) => {
                    self.emit(CrawlEvent::JsonBlockSkipped {
                        url: page_url.to_string(),
                        error,
                    });
                    continue;
                }
            };

            for candidate in extractor::collect_url_fields(&value, self.settings.max_json_depth) {
                if let Some(url) = resolve_link(&candidate, page_url) {
                    self.consider(&url, Discovery::EmbeddedJson);
                }
            }
        }
    }
}
