//! Integration tests for sharded crawls
//!
//! Several sites are crawled by independent shards; the merged output and the
//! report are checked on disk.

mod common;

use common::{config, deps, page, read_json, status, RoutingFetcher};
use product_ripple::crawler::{run_crawl_with, Fetcher, MemoryObserver, ShardStatus};
use product_ripple::RippleError;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

const SITES: &str = r#"
[crawler]
max-depth = 1
request-delay-ms = 0
workers = 2

[output]
directory = '{output}'

[generic]
product-patterns = ['/p/\d+']

[[domain]]
name = "alpha.test"
product-patterns = ['/products/[a-z0-9-]+']
start-urls = ["https://alpha.test/"]

[[domain]]
name = "beta.test"
product-patterns = ['/item/\d+']
start-urls = ["https://beta.test/"]

[[domain]]
name = "gamma.test"
start-urls = ["https://gamma.test/"]
"#;

async fn mount_sites(server: &MockServer) {
    page(
        server,
        "alpha.test",
        "/",
        r#"<a href="/products/lamp-1">Lamp</a><a href="/p/77">Generic</a>"#,
    )
    .await;
    page(
        server,
        "beta.test",
        "/",
        r#"<a href="/item/5">Item</a><a href="https://alpha.test/products/lamp-9">Cross</a>"#,
    )
    .await;
    status(server, "gamma.test", "/", 500).await;
}

#[tokio::test]
async fn test_shards_merge_into_per_domain_files() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sites(&server).await;

    let config = config(SITES, dir.path());
    let fetcher: Arc<dyn Fetcher> = Arc::new(RoutingFetcher::new(&server));
    let observer = Arc::new(MemoryObserver::new());

    let outcome = run_crawl_with(&config, "abc123", |_| {
        Ok(deps(fetcher.clone(), observer.clone()))
    })
    .await
    .unwrap();

    // ceil(3 / 2) = 2 domains in the first shard, 1 in the second
    assert_eq!(outcome.shards.len(), 2);
    assert_eq!(outcome.shards[0].domains, vec!["alpha.test", "beta.test"]);
    assert_eq!(outcome.failed_shards(), 0);

    // Generic patterns apply to every domain; beta's shard also owns alpha,
    // so the cross link is recorded under alpha
    let alpha: Vec<_> = outcome.products["alpha.test"].iter().cloned().collect();
    assert_eq!(
        alpha,
        vec![
            "https://alpha.test/p/77",
            "https://alpha.test/products/lamp-1",
            "https://alpha.test/products/lamp-9",
        ]
    );
    assert_eq!(outcome.products["beta.test"].len(), 1);
    assert!(outcome.products["gamma.test"].is_empty());

    let gamma = read_json(dir.path(), "gamma_test_products.json");
    assert_eq!(gamma, serde_json::json!([]));

    let all = read_json(dir.path(), "all_products.json");
    assert_eq!(all.as_array().unwrap().len(), 4);

    let report = read_json(dir.path(), "crawl_report.json");
    assert_eq!(report["config_hash"], "abc123");
    assert_eq!(report["failed_shards"], 0);
    assert_eq!(report["products_by_domain"]["beta.test"], 1);
    assert_eq!(report["shards"][1]["domains"], serde_json::json!(["gamma.test"]));

    assert!(outcome.writes.iter().all(|ack| ack.is_ok()));
    assert_eq!(outcome.writes.len(), 5);
}

#[tokio::test]
async fn test_failed_shard_keeps_empty_domain_files() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sites(&server).await;

    let config = config(SITES, dir.path());
    let fetcher: Arc<dyn Fetcher> = Arc::new(RoutingFetcher::new(&server));
    let observer = Arc::new(MemoryObserver::new());

    let outcome = run_crawl_with(&config, "abc123", |plan| {
        if plan.shard_id == 0 {
            Err(RippleError::Writer("client unavailable".to_string()))
        } else {
            Ok(deps(fetcher.clone(), observer.clone()))
        }
    })
    .await
    .unwrap();

    assert_eq!(outcome.failed_shards(), 1);
    match &outcome.shards[0].status {
        ShardStatus::Failed { message } => assert!(message.contains("client unavailable")),
        other => panic!("unexpected status {:?}", other),
    }

    assert_eq!(
        read_json(dir.path(), "alpha_test_products.json"),
        serde_json::json!([])
    );
    let report = read_json(dir.path(), "crawl_report.json");
    assert_eq!(report["failed_shards"], 1);
    assert_eq!(report["shards"][0]["status"], "failed");
}
