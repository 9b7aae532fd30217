use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// File holding every product of every domain
pub const ALL_PRODUCTS_FILE: &str = "all_products.json";

/// File holding the run report
pub const REPORT_FILE: &str = "crawl_report.json";

/// One entry of a per-domain result file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_url: String,
}

/// One entry of the aggregate result file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainProductRecord {
    pub domain: String,
    pub product_url: String,
}

/// Result file name for a domain: dots become underscores
///
/// ```
/// use product_ripple::output::domain_file_name;
///
/// assert_eq!(domain_file_name("intl.nykaafashion.com"), "intl_nykaafashion_com_products.json");
/// ```
pub fn domain_file_name(domain: &str) -> String {
    format!("{}_products.json", domain.replace('.', "_"))
}

pub fn domain_records(urls: &BTreeSet<String>) -> Vec<ProductRecord> {
    urls.iter()
        .map(|url| ProductRecord {
            product_url: url.clone(),
        })
        .collect()
}

pub fn all_records(products: &BTreeMap<String, BTreeSet<String>>) -> Vec<DomainProductRecord> {
    products
        .iter()
        .flat_map(|(domain, urls)| {
            urls.iter().map(move |url| DomainProductRecord {
                domain: domain.clone(),
                product_url: url.clone(),
            })
        })
        .collect()
}
