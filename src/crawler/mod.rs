//! Crawler module for product discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` seam
//! - HTML parsing, link extraction and embedded-state extraction
//! - Request scheduling and per-domain spacing
//! - Recursive sitemap resolution
//! - The per-shard crawl engine and the worker coordinator

mod coordinator;
mod engine;
mod extractor;
mod fetcher;
mod observer;
mod parser;
mod scheduler;
mod sitemap;

pub use coordinator::{
    partition, plan_shards, run_crawl, run_crawl_with, CrawlOutcome, ShardMessage, ShardOutcome,
    ShardPlan, ShardStatus,
};
pub use engine::{CrawlEngine, EngineDeps, EngineSettings};
pub use extractor::{
    balanced_json_prefix, collect_url_fields, locate_assigned_json, parse_block, STATE_MARKERS,
    URL_KEYS,
};
pub use fetcher::{
    build_http_client, request_headers, Body, BodyMode, FetchError, FetchRequest, FetchResponse,
    Fetcher, HttpFetcher,
};
pub use observer::{CrawlEvent, CrawlObserver, Discovery, MemoryObserver, TracingObserver};
pub use parser::{Document, DocumentParser, HtmlParser, ScriptBlock};
pub use scheduler::{throttled_fetch, Admission, Scheduler, Throttle, Unthrottled};
pub use sitemap::{decode_payload, parse_sitemap, SitemapNode};
