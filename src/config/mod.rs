//! Configuration module for Product-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A catalog of the supported shops is compiled in, so a configuration file is
//! only needed to override it.
//!
//! # Example
//!
//! ```no_run
//! use product_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DomainConfig, GenericRules, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{
    builtin_config, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
