use crate::crawler::{CrawlOutcome, ShardOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of a run, written next to the result files
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub config_hash: String,
    pub total_products: usize,
    pub products_by_domain: BTreeMap<String, usize>,
    pub failed_shards: usize,
    pub shards: Vec<ShardOutcome>,
}

impl CrawlReport {
    pub fn from_outcome(outcome: &CrawlOutcome) -> Self {
        let duration = outcome.finished_at - outcome.started_at;

        Self {
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            duration_seconds: duration.num_milliseconds() as f64 / 1000.0,
            config_hash: outcome.config_hash.clone(),
            total_products: outcome.total_products(),
            products_by_domain: outcome
                .products
                .iter()
                .map(|(domain, urls)| (domain.clone(), urls.len()))
                .collect(),
            failed_shards: outcome.failed_shards(),
            shards: outcome.shards.clone(),
        }
    }
}
