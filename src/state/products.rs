use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Confirmed product URLs per domain, owned by one crawl engine
#[derive(Debug, Clone, Default)]
pub struct ProductStore {
    products: HashMap<String, HashSet<String>>,
}

/// Immutable export of a [`ProductStore`]: domain → sorted product URLs
pub type ProductSnapshot = BTreeMap<String, Vec<String>>;

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with an empty entry for each domain
    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            products: domains
                .into_iter()
                .map(|d| (d.into(), HashSet::new()))
                .collect(),
        }
    }

    /// Records a product URL; returns false if it was already known
    pub fn record(&mut self, domain: &str, url: &str) -> bool {
        self.products
            .entry(domain.to_string())
            .or_default()
            .insert(url.to_string())
    }

    pub fn contains(&self, domain: &str, url: &str) -> bool {
        self.products
            .get(domain)
            .map(|urls| urls.contains(url))
            .unwrap_or(false)
    }

    /// Number of products across all domains
    pub fn total(&self) -> usize {
        self.products.values().map(HashSet::len).sum()
    }

    /// Exports the store; URLs are sorted so snapshots compare deterministically
    pub fn snapshot(&self) -> ProductSnapshot {
        self.products
            .iter()
            .map(|(domain, urls)| {
                let mut urls: Vec<String> = urls.iter().cloned().collect();
                urls.sort();
                (domain.clone(), urls)
            })
            .collect()
    }
}

/// Set union of shard snapshots
///
/// Every domain in `domains` appears in the result, with an empty set when no
/// snapshot mentions it. Duplicate URLs across snapshots collapse.
pub fn merge_snapshots<'a, I>(
    domains: &[String],
    snapshots: I,
) -> BTreeMap<String, BTreeSet<String>>
where
    I: IntoIterator<Item = &'a ProductSnapshot>,
{
    let mut merged: BTreeMap<String, BTreeSet<String>> = domains
        .iter()
        .map(|d| (d.clone(), BTreeSet::new()))
        .collect();

    for snapshot in snapshots {
        for (domain, urls) in snapshot {
            merged
                .entry(domain.clone())
                .or_default()
                .extend(urls.iter().cloned());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_idempotent() {
        let mut store = ProductStore::new();
        assert!(store.record("shop.com", "https://shop.com/products/a"));
        assert!(!store.record("shop.com", "https://shop.com/products/a"));
        assert_eq!(store.total(), 1);
        assert!(store.contains("shop.com", "https://shop.com/products/a"));
        assert!(!store.contains("other.com", "https://shop.com/products/a"));
    }

    #[test]
    fn test_snapshot_includes_empty_domains() {
        let mut store = ProductStore::with_domains(["a.com", "b.com"]);
        store.record("a.com", "https://a.com/products/2");
        store.record("a.com", "https://a.com/products/1");

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot["a.com"],
            vec!["https://a.com/products/1", "https://a.com/products/2"]
        );
        assert!(snapshot["b.com"].is_empty());
    }

    #[test]
    fn test_merge_is_set_union() {
        let mut a = ProductSnapshot::new();
        a.insert("x.com".into(), vec!["u1".into(), "u2".into()]);
        let mut b = ProductSnapshot::new();
        b.insert("x.com".into(), vec!["u2".into(), "u3".into()]);

        let merged = merge_snapshots(&["x.com".to_string()], [&a, &b]);
        let urls: Vec<&str> = merged["x.com"].iter().map(String::as_str).collect();
        assert_eq!(urls, vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn test_merge_keeps_unreported_domains() {
        let mut a = ProductSnapshot::new();
        a.insert("x.com".into(), vec!["u1".into()]);

        let merged = merge_snapshots(&["x.com".to_string(), "y.com".to_string()], [&a]);
        assert_eq!(merged.len(), 2);
        assert!(merged["y.com"].is_empty());
    }
}
