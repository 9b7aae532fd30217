//! URL handling module for Product-Ripple
//!
//! This module provides domain extraction, link resolution, the skip-extension
//! check and the product URL classifier.

mod classifier;
mod domain;
mod resolve;

// Re-export main functions
pub use classifier::{Classification, UrlClassifier};
pub use domain::{domain_of, extract_domain, swap_domain};
pub use resolve::{has_skip_extension, resolve_link};
