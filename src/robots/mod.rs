//! Robots.txt handling module
//!
//! Robots files are used for discovery only: they point at sitemaps and, for
//! domains with category rules, at allow-listed category paths.

mod parser;

pub use parser::RobotsDirectives;

use url::Url;

/// Builds the absolute entry-point URL for an `Allow:` path
///
/// The path is resolved against the robots.txt URL, so scheme, host and port
/// follow the site the robots file came from.
pub fn category_url(robots_url: &Url, path: &str) -> Option<Url> {
    if !path.starts_with('/') {
        return None;
    }
    robots_url.join(path).ok()
}
