//! Console summary of a finished crawl

use crate::crawler::{CrawlOutcome, ShardStatus};
use crate::state::PageState;
use std::collections::BTreeMap;

/// Page counts summed over every completed shard
pub fn pages_by_state(outcome: &CrawlOutcome) -> BTreeMap<PageState, usize> {
    let mut totals = BTreeMap::new();
    for shard in &outcome.shards {
        if let ShardStatus::Completed { stats } = &shard.status {
            for (state, count) in &stats.pages_by_state {
                *totals.entry(*state).or_insert(0) += count;
            }
        }
    }
    totals
}

/// Prints the outcome of a crawl to stdout
pub fn print_summary(outcome: &CrawlOutcome) {
    println!("=== Crawl Summary ===\n");

    let duration = outcome.finished_at - outcome.started_at;
    println!("Overview:");
    println!("  Duration: {:.1}s", duration.num_milliseconds() as f64 / 1000.0);
    println!("  Config hash: {}", outcome.config_hash);
    println!(
        "  Shards: {} ({} failed)",
        outcome.shards.len(),
        outcome.failed_shards()
    );
    println!("  Products found: {}", outcome.total_products());
    println!();

    let pages = pages_by_state(outcome);
    let total_pages: usize = pages.values().sum();
    println!("Pages by State:");
    for (state, count) in &pages {
        let percentage = if total_pages > 0 {
            (*count as f64 / total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Products by Domain:");
    for (domain, urls) in &outcome.products {
        println!("  {}: {}", domain, urls.len());
    }
    println!();

    let failed: Vec<_> = outcome
        .shards
        .iter()
        .filter_map(|shard| match &shard.status {
            ShardStatus::Failed { message } => Some((shard, message)),
            ShardStatus::Completed { .. } => None,
        })
        .collect();
    if !failed.is_empty() {
        println!("Failed Shards ({}):", failed.len());
        for (shard, message) in failed {
            println!(
                "  - shard {} [{}]: {}",
                shard.shard_id,
                shard.domains.join(", "),
                message
            );
        }
        println!();
    }

    let write_errors: Vec<_> = outcome.writes.iter().filter(|ack| !ack.is_ok()).collect();
    println!(
        "Output: {} files written, {} failed",
        outcome.writes.len() - write_errors.len(),
        write_errors.len()
    );
}
