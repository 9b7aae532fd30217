//! State module for tracking crawl progress
//!
//! This module provides the state owned by one crawl engine.
//!
//! # Components
//!
//! - `PageState`: the lifecycle of a dispatched page (dispatched, fetched, processed, ...)
//! - `Frontier`: visited set, page states and seen sitemaps
//! - `ProductStore`: confirmed product URLs per domain
//! - `DomainState`: per-domain request spacing used by the scheduler

mod domain_state;
mod frontier;
mod page_state;
mod products;

// Re-export main types
pub use domain_state::DomainState;
pub use frontier::{Frontier, FrontierStats};
pub use page_state::PageState;
pub use products::{merge_snapshots, ProductSnapshot, ProductStore};
