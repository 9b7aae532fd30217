use crate::config::{Config, DomainConfig};
use crate::state::ProductStore;
use crate::url::resolve::has_skip_extension;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Outcome of classifying a discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Not worth fetching or recording
    Skip,
    /// A product detail page
    Product,
    /// Not a product, but a candidate for further traversal
    Follow,
}

/// Compiled rules for one domain
#[derive(Debug, Clone)]
struct DomainRules {
    product: Vec<Regex>,
    excluded: Vec<Regex>,
    category: Vec<Regex>,
    alt_domain: Option<String>,
}

impl DomainRules {
    fn compile(entry: &DomainConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            product: compile_all(&entry.product_patterns)?,
            excluded: compile_all(&entry.excluded_patterns)?,
            category: compile_all(&entry.category_patterns)?,
            alt_domain: entry.alt_domain.clone(),
        })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e))))
        .collect()
}

/// Decides whether URLs name product pages
///
/// The classifier is immutable once built and holds only compiled patterns, so
/// it can be shared between tasks behind an `Arc` without locking.
///
/// # Rule Order
///
/// 1. Skip-listed path extension → `Skip`
/// 2. Already recorded as a product for the domain → `Skip`
/// 3. Domain exclusion pattern → `Skip` (wins over product patterns)
/// 4. Domain product pattern → `Product`
/// 5. Generic product pattern → `Product`
/// 6. Otherwise → `Follow`
///
/// Unparsable URLs never classify as `Product`.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    domains: HashMap<String, DomainRules>,
    generic: Vec<Regex>,
    skip_extensions: Vec<String>,
    block_statuses: Vec<u16>,
}

impl UrlClassifier {
    /// Compiles every pattern in the configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut domains = HashMap::new();
        for entry in &config.domains {
            domains.insert(entry.name.clone(), DomainRules::compile(entry)?);
        }

        Ok(Self {
            domains,
            generic: compile_all(&config.generic.product_patterns)?,
            skip_extensions: config
                .generic
                .skip_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            block_statuses: config.generic.block_statuses.clone(),
        })
    }

    /// Classifies a URL discovered for `domain`
    ///
    /// # Examples
    ///
    /// ```
    /// use product_ripple::config::parse_config;
    /// use product_ripple::state::ProductStore;
    /// use product_ripple::url::{Classification, UrlClassifier};
    ///
    /// let config = parse_config(r#"
    /// [[domain]]
    /// name = "shop.com"
    /// product-patterns = ['/products/[a-z0-9-]+']
    /// excluded-patterns = ['collections']
    /// "#).unwrap();
    /// let classifier = UrlClassifier::from_config(&config).unwrap();
    /// let store = ProductStore::new();
    ///
    /// assert_eq!(
    ///     classifier.classify("https://shop.com/products/shoe-1", "shop.com", &store),
    ///     Classification::Product
    /// );
    /// assert_eq!(
    ///     classifier.classify("https://shop.com/collections/new", "shop.com", &store),
    ///     Classification::Skip
    /// );
    /// ```
    pub fn classify(&self, url: &str, domain: &str, known: &ProductStore) -> Classification {
        if has_skip_extension(url, &self.skip_extensions) {
            return Classification::Skip;
        }

        if known.contains(domain, url) {
            return Classification::Skip;
        }

        if self.is_excluded(url, domain) {
            return Classification::Skip;
        }

        if Url::parse(url).is_err() {
            return Classification::Follow;
        }

        if let Some(rules) = self.domains.get(domain) {
            if rules.product.iter().any(|p| p.is_match(url)) {
                return Classification::Product;
            }
        }

        if self.generic.iter().any(|p| p.is_match(url)) {
            return Classification::Product;
        }

        Classification::Follow
    }

    /// Returns true if the domain declares an exclusion pattern matching the URL
    pub fn is_excluded(&self, url: &str, domain: &str) -> bool {
        self.domains
            .get(domain)
            .map(|rules| rules.excluded.iter().any(|p| p.is_match(url)))
            .unwrap_or(false)
    }

    /// Returns true if the URL ends in a skip-listed extension
    pub fn has_skip_extension(&self, url: &str) -> bool {
        has_skip_extension(url, &self.skip_extensions)
    }

    /// Returns true if the domain declares category-path patterns
    pub fn has_category_rules(&self, domain: &str) -> bool {
        self.domains
            .get(domain)
            .map(|rules| !rules.category.is_empty())
            .unwrap_or(false)
    }

    /// Returns true if a robots.txt path matches one of the domain's category patterns
    pub fn is_category_path(&self, domain: &str, path: &str) -> bool {
        self.domains
            .get(domain)
            .map(|rules| rules.category.iter().any(|p| p.is_match(path)))
            .unwrap_or(false)
    }

    /// Mirror domain to retry against when `domain` blocks a request
    pub fn alt_domain(&self, domain: &str) -> Option<&str> {
        self.domains
            .get(domain)
            .and_then(|rules| rules.alt_domain.as_deref())
    }

    /// Returns true if the status is one the shops use to signal blocking
    pub fn is_block_status(&self, status: u16) -> bool {
        self.block_statuses.contains(&status)
    }

    /// Statuses treated as blocks
    pub fn block_statuses(&self) -> &[u16] {
        &self.block_statuses
    }
}
