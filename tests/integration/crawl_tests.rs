//! Integration tests for the crawler
//!
//! These tests use wiremock to serve robots files, sitemaps and pages, and
//! run the full pipeline through the reqwest-backed fetcher.

mod common;

use common::{bytes, config, deps, page, read_json, status, text, RoutingFetcher};
use flate2::write::GzEncoder;
use flate2::Compression;
use product_ripple::crawler::{run_crawl_with, CrawlEvent, Fetcher, MemoryObserver};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOP: &str = r#"
[crawler]
max-depth = 2
request-delay-ms = 0
page-timeout-ms = 500
workers = 1

[output]
directory = '{output}'

[[domain]]
name = "shop.test"
product-patterns = ['/products/[a-z0-9-]+']
excluded-patterns = ['/account']
alt-domain = "mirror.test"
start-urls = ["https://shop.test/"]
robots-urls = ["https://shop.test/robots.txt"]

[[domain]]
name = "mirror.test"
enabled = false
product-patterns = ['/products/[a-z0-9-]+']
"#;

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn urls(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["product_url"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_pipeline_robots_sitemaps_and_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    text(
        &server,
        "shop.test",
        "/robots.txt",
        "User-agent: *\nDisallow: /account\nSitemap: https://shop.test/sitemap_index.xml\n",
    )
    .await;
    text(
        &server,
        "shop.test",
        "/sitemap_index.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://shop.test/sitemap-products.xml.gz</loc></sitemap>
</sitemapindex>"#,
    )
    .await;
    bytes(
        &server,
        "shop.test",
        "/sitemap-products.xml.gz",
        gzip(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://shop.test/products/boot-7</loc></url>
  <url><loc>https://shop.test/pages/about</loc></url>
</urlset>"#,
        ),
    )
    .await;
    page(
        &server,
        "shop.test",
        "/",
        r#"<html><body>
        <a href="/products/shoe-1">Shoe</a>
        <a href="/collections/new">New in</a>
        <a href="/account/login">Sign in</a>
        <a href="https://elsewhere.test/products/zzz">Partner</a>
        </body></html>"#,
    )
    .await;
    page(
        &server,
        "shop.test",
        "/collections/new",
        r#"<a href="/products/shirt-2">Shirt</a><a href="/products/shoe-1">Shoe again</a>"#,
    )
    .await;

    let config = config(SHOP, dir.path());
    let fetcher = Arc::new(RoutingFetcher::new(&server));
    let observer = Arc::new(MemoryObserver::new());
    let shared: Arc<dyn Fetcher> = fetcher.clone();

    let outcome = run_crawl_with(&config, "hash", |_| Ok(deps(shared.clone(), observer.clone())))
        .await
        .unwrap();

    assert_eq!(outcome.failed_shards(), 0);
    assert_eq!(
        outcome.products["shop.test"].iter().cloned().collect::<Vec<_>>(),
        vec![
            "https://shop.test/products/boot-7",
            "https://shop.test/products/shirt-2",
            "https://shop.test/products/shoe-1",
        ]
    );

    // Products are classified, never fetched; excluded and foreign links are dropped
    assert_eq!(fetcher.count("https://shop.test/products/shoe-1"), 0);
    assert_eq!(fetcher.count("https://shop.test/account/login"), 0);
    assert_eq!(fetcher.count("https://elsewhere.test/products/zzz"), 0);
    assert_eq!(fetcher.count("https://shop.test/collections/new"), 1);

    let per_domain = read_json(dir.path(), "shop_test_products.json");
    assert_eq!(urls(&per_domain).len(), 3);

    let all = read_json(dir.path(), "all_products.json");
    assert!(all
        .as_array()
        .unwrap()
        .iter()
        .all(|entry| entry["domain"] == "shop.test"));

    let report = read_json(dir.path(), "crawl_report.json");
    assert_eq!(report["total_products"], 3);
    assert_eq!(report["config_hash"], "hash");

    assert!(observer.events().iter().any(|e| matches!(
        e,
        CrawlEvent::SitemapResolved { leaves: 2, .. }
    )));
}

#[tokio::test]
async fn test_blocked_page_is_retried_on_mirror() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    status(&server, "shop.test", "/robots.txt", 404).await;
    status(&server, "shop.test", "/", 403).await;
    page(
        &server,
        "mirror.test",
        "/",
        r#"<a href="/products/jacket-2">Jacket</a>"#,
    )
    .await;

    let config = config(SHOP, dir.path());
    let fetcher = Arc::new(RoutingFetcher::new(&server));
    let observer = Arc::new(MemoryObserver::new());
    let shared: Arc<dyn Fetcher> = fetcher.clone();

    let outcome = run_crawl_with(&config, "hash", |_| Ok(deps(shared.clone(), observer.clone())))
        .await
        .unwrap();

    assert!(outcome.products["mirror.test"].contains("https://mirror.test/products/jacket-2"));
    assert!(outcome.products["shop.test"].is_empty());
    assert_eq!(fetcher.count("https://mirror.test/"), 1);

    let events = observer.events();
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::PageBlocked { status: 403, mirror: Some(m), .. } if m == "https://mirror.test/"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, CrawlEvent::RobotsFailed { .. })));
}

#[tokio::test]
async fn test_slow_page_times_out_without_stopping_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    status(&server, "shop.test", "/robots.txt", 404).await;
    page(
        &server,
        "shop.test",
        "/",
        r#"<a href="/collections/slow">Slow</a><a href="/collections/fast">Fast</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/collections/slow"))
        .and(header(common::HOST_HEADER, "shop.test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/products/never-seen">x</a>"#)
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    page(
        &server,
        "shop.test",
        "/collections/fast",
        r#"<a href="/products/quick-1">Quick</a>"#,
    )
    .await;

    let config = config(SHOP, dir.path());
    let observer = Arc::new(MemoryObserver::new());
    let fetcher: Arc<dyn Fetcher> = Arc::new(RoutingFetcher::new(&server));

    let outcome = run_crawl_with(&config, "hash", |_| Ok(deps(fetcher.clone(), observer.clone())))
        .await
        .unwrap();

    let found: Vec<_> = outcome.products["shop.test"].iter().cloned().collect();
    assert_eq!(found, vec!["https://shop.test/products/quick-1"]);
    assert!(observer.events().iter().any(|e| matches!(
        e,
        CrawlEvent::PageFailed { url, .. } if url == "https://shop.test/collections/slow"
    )));
}

#[tokio::test]
async fn test_embedded_state_products_over_http() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    status(&server, "shop.test", "/robots.txt", 404).await;
    page(
        &server,
        "shop.test",
        "/",
        r#"<html><head><script>
        window.__PRELOADED_STATE__ = {"grid": {"items": [
            {"productUrl": "/products/dress-9", "name": "Dress"},
            {"productUrl": "https://shop.test/products/skirt-4"}
        ]}};
        </script>
        <script type="application/json">{"related": [{"href": "/products/belt-3"}]}</script>
        <script>window.__INITIAL_STATE__ = {"broken": </script>
        </head><body></body></html>"#,
    )
    .await;

    let config = config(SHOP, dir.path());
    let observer = Arc::new(MemoryObserver::new());
    let fetcher: Arc<dyn Fetcher> = Arc::new(RoutingFetcher::new(&server));

    let outcome = run_crawl_with(&config, "hash", |_| Ok(deps(fetcher.clone(), observer.clone())))
        .await
        .unwrap();

    let found: Vec<_> = outcome.products["shop.test"].iter().cloned().collect();
    assert_eq!(
        found,
        vec![
            "https://shop.test/products/belt-3",
            "https://shop.test/products/dress-9",
            "https://shop.test/products/skirt-4",
        ]
    );
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, CrawlEvent::JsonBlockSkipped { .. })));
}
