//! Worker coordination
//!
//! The enabled domains are split into contiguous shards. Each shard runs on its
//! own tokio task with its own engine (scheduler, frontier and product store
//! included), and reports back exactly once over an mpsc channel. The
//! coordinator waits for every task, unions the snapshots it received and hands
//! the merged result to the result writer. A shard that dies before reporting
//! is recorded as failed; the others still make it into the output.

use crate::config::Config;
use crate::crawler::engine::{CrawlEngine, EngineDeps, EngineSettings};
use crate::output::{self, WriterAck};
use crate::state::{merge_snapshots, FrontierStats, ProductSnapshot};
use crate::url::UrlClassifier;
use crate::{ConfigError, RippleError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

/// The work assigned to one shard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShardPlan {
    pub shard_id: usize,
    pub domains: Vec<String>,
    pub robots_urls: Vec<String>,
    pub sitemap_urls: Vec<String>,
    pub start_urls: Vec<String>,
}

/// What a finished shard sends back
#[derive(Debug, Clone)]
pub struct ShardMessage {
    pub shard_id: usize,
    pub snapshot: ProductSnapshot,
    pub stats: FrontierStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShardStatus {
    Completed { stats: FrontierStats },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardOutcome {
    pub shard_id: usize,
    pub domains: Vec<String>,
    #[serde(flatten)]
    pub status: ShardStatus,
}

/// Result of a complete crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
    pub shards: Vec<ShardOutcome>,
    /// Merged products; every enabled domain has an entry
    pub products: BTreeMap<String, BTreeSet<String>>,
    /// Acknowledgements from the result writer
    pub writes: Vec<WriterAck>,
}

impl CrawlOutcome {
    pub fn total_products(&self) -> usize {
        self.products.values().map(BTreeSet::len).sum()
    }

    pub fn failed_shards(&self) -> usize {
        self.shards
            .iter()
            .filter(|s| matches!(s.status, ShardStatus::Failed { .. }))
            .count()
    }
}

/// Splits items into at most `workers` contiguous, non-empty chunks
///
/// Chunks hold `ceil(len / workers)` items, so trailing workers may get fewer
/// items or none at all.
pub fn partition<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let per_shard = items.len().div_ceil(workers.max(1));
    items.chunks(per_shard).map(<[T]>::to_vec).collect()
}

/// Builds one plan per shard from the enabled domains
pub fn plan_shards(config: &Config, workers: usize) -> Vec<ShardPlan> {
    let domains: Vec<_> = config.enabled_domains().collect();

    partition(&domains, workers)
        .into_iter()
        .enumerate()
        .map(|(shard_id, entries)| {
            let mut plan = ShardPlan {
                shard_id,
                ..ShardPlan::default()
            };
            for entry in entries {
                plan.domains.push(entry.name.clone());
                plan.robots_urls.extend(entry.robots_urls.iter().cloned());
                plan.sitemap_urls.extend(entry.sitemap_urls.iter().cloned());
                plan.start_urls.extend(entry.start_urls.iter().cloned());
            }
            plan
        })
        .collect()
}

/// Runs a complete crawl with production collaborators and persists the results
pub async fn run_crawl(config: &Config, config_hash: &str) -> Result<CrawlOutcome, RippleError> {
    run_crawl_with(config, config_hash, |_| {
        EngineDeps::production(config).map_err(RippleError::from)
    })
    .await
}

/// Runs a complete crawl, building each shard's collaborators with `make_deps`
///
/// Fails only when the configuration leaves nothing to crawl; every other
/// problem is confined to the page, sitemap or shard it occurred in.
pub async fn run_crawl_with<F>(
    config: &Config,
    config_hash: &str,
    make_deps: F,
) -> Result<CrawlOutcome, RippleError>
where
    F: Fn(&ShardPlan) -> Result<EngineDeps, RippleError>,
{
    let started_at = Utc::now();

    let domains: Vec<String> = config.enabled_domains().map(|d| d.name.clone()).collect();
    if domains.is_empty() {
        return Err(ConfigError::Validation("no domains configured for crawling".to_string()).into());
    }

    let classifier = Arc::new(UrlClassifier::from_config(config)?);
    let settings = EngineSettings::from_config(config);
    let plans = plan_shards(config, config.crawler.worker_count());

    tracing::info!(
        "Crawling {} domains with {} shards",
        domains.len(),
        plans.len()
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<ShardMessage>();
    let mut tasks = JoinSet::new();
    let mut launch_failures: HashMap<usize, String> = HashMap::new();

    for plan in &plans {
        match make_deps(plan) {
            Ok(deps) => {
                tasks.spawn(run_shard(
                    plan.clone(),
                    settings.clone(),
                    classifier.clone(),
                    deps,
                    tx.clone(),
                ));
            }
            Err(e) => {
                launch_failures.insert(plan.shard_id, e.to_string());
            }
        }
    }
    drop(tx);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!("A shard panicked: {}", e);
            } else {
                tracing::error!("A shard was cancelled: {}", e);
            }
        }
    }

    let mut messages: BTreeMap<usize, ShardMessage> = BTreeMap::new();
    while let Some(message) = rx.recv().await {
        messages.insert(message.shard_id, message);
    }

    let shards: Vec<ShardOutcome> = plans
        .iter()
        .map(|plan| {
            let status = match messages.get(&plan.shard_id) {
                Some(message) => ShardStatus::Completed {
                    stats: message.stats.clone(),
                },
                None => {
                    let message = launch_failures
                        .remove(&plan.shard_id)
                        .unwrap_or_else(|| "exited without reporting results".to_string());
                    let error = RippleError::ShardFailed {
                        shard: plan.shard_id,
                        message: message.clone(),
                    };
                    tracing::error!("{} (domains: {})", error, plan.domains.join(", "));
                    ShardStatus::Failed { message }
                }
            };
            ShardOutcome {
                shard_id: plan.shard_id,
                domains: plan.domains.clone(),
                status,
            }
        })
        .collect();

    let products = merge_snapshots(&domains, messages.values().map(|m| &m.snapshot));

    let mut outcome = CrawlOutcome {
        started_at,
        finished_at: Utc::now(),
        config_hash: config_hash.to_string(),
        shards,
        products,
        writes: Vec::new(),
    };

    tracing::info!(
        "Merged {} products from {} of {} shards",
        outcome.total_products(),
        messages.len(),
        plans.len()
    );

    outcome.writes = output::persist_outcome(&outcome, Path::new(&config.output.directory)).await;
    Ok(outcome)
}

async fn run_shard(
    plan: ShardPlan,
    settings: EngineSettings,
    classifier: Arc<UrlClassifier>,
    deps: EngineDeps,
    results: mpsc::UnboundedSender<ShardMessage>,
) {
    let span = tracing::info_span!("shard", shard = plan.shard_id);
    async move {
        tracing::info!("Starting on {}", plan.domains.join(", "));

        let engine = CrawlEngine::new(settings, classifier, &plan.domains, deps);
        engine.run(&plan).await;

        let stats = engine.stats();
        tracing::info!(
            "Finished: {} pages visited, {} products",
            stats.pages_by_state.values().sum::<usize>(),
            stats.products
        );

        let message = ShardMessage {
            shard_id: plan.shard_id,
            snapshot: engine.snapshot(),
            stats,
        };
        if results.send(message).is_err() {
            tracing::error!("Coordinator stopped listening; results dropped");
        }
    }
    .instrument(span)
    .await
}
