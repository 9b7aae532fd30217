//! Product-Ripple: a product-page discovery crawler
//!
//! This crate discovers product-detail-page URLs across a fixed set of e-commerce
//! domains using robots.txt sitemap declarations, recursive XML sitemaps and
//! depth-bounded link traversal, then classifies every discovered URL against
//! domain-specific and generic product patterns.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Product-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Failed to decode body of {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Malformed sitemap {url}: {message}")]
    SitemapParse { url: String, message: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: state::PageState,
        to: state::PageState,
    },

    #[error("Shard {shard} failed: {message}")]
    ShardFailed { shard: usize, message: String },

    #[error("Result writer error: {0}")]
    Writer(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlEngine, CrawlOutcome};
pub use state::{PageState, ProductSnapshot, ProductStore};
pub use url::{extract_domain, Classification, UrlClassifier};
