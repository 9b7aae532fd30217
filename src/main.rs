//! Product-Ripple main entry point
//!
//! This is the command-line interface for the Product-Ripple crawler.

use anyhow::Context;
use clap::Parser;
use product_ripple::config::{builtin_config, load_config_with_hash, Config};
use product_ripple::crawler::{plan_shards, run_crawl};
use product_ripple::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Product-Ripple: a product-page discovery crawler
///
/// Product-Ripple reads robots.txt files and XML sitemaps and follows links up
/// to a bounded depth across a set of shops, collecting every URL that looks
/// like a product detail page.
#[derive(Parser, Debug)]
#[command(name = "product-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A product-page discovery crawler", long_about = None)]
struct Cli {
    /// Path to a TOML catalog; the built-in catalog is used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the result files are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Number of worker shards
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum link depth followed from a start page
    #[arg(long)]
    max_depth: Option<u32>,

    /// Show the shard plan without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => builtin_config().context("built-in catalog is invalid")?,
    };
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let outcome = run_crawl(&config, &config_hash).await.context("crawl failed")?;
    print_summary(&outcome);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("product_ripple=info,warn"),
            1 => EnvFilter::new("product_ripple=debug,info"),
            2 => EnvFilter::new("product_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = Some(workers.max(1));
    }
    if let Some(depth) = cli.max_depth {
        config.crawler.max_depth = depth;
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Product-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max concurrent requests: {}", config.crawler.concurrency());
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Workers: {}", config.crawler.worker_count());
    println!("  Output directory: {}", config.output.directory);

    let plans = plan_shards(config, config.crawler.worker_count());
    for plan in &plans {
        println!("\nShard {} ({} domains):", plan.shard_id, plan.domains.len());
        for domain in &plan.domains {
            println!("  - {}", domain);
        }
        println!(
            "  robots: {}, sitemaps: {}, start pages: {}",
            plan.robots_urls.len(),
            plan.sitemap_urls.len(),
            plan.start_urls.len()
        );
    }

    println!(
        "\n✓ Would crawl {} domains in {} shards",
        plans.iter().map(|p| p.domains.len()).sum::<usize>(),
        plans.len()
    );
}
