//! Shared helpers for the integration tests
//!
//! Sites are addressed by their real names (`shop.test`, ...) and routed to a
//! single wiremock server. The original host travels in the `x-shop-host`
//! header so mocks can tell sites apart.

#![allow(dead_code)]

use async_trait::async_trait;
use product_ripple::config::{parse_config, Config};
use product_ripple::crawler::{
    EngineDeps, FetchError, FetchRequest, FetchResponse, Fetcher, HtmlParser, HttpFetcher,
    MemoryObserver, Scheduler,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HOST_HEADER: &str = "x-shop-host";

/// Forwards every request to the mock server through the real HTTP client
pub struct RoutingFetcher {
    inner: HttpFetcher,
    server: Url,
    pub requested: Mutex<Vec<String>>,
}

impl RoutingFetcher {
    pub fn new(server: &MockServer) -> Self {
        Self {
            inner: HttpFetcher::new().unwrap(),
            server: Url::parse(&server.uri()).unwrap(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, url: &str) -> usize {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for RoutingFetcher {
    async fn fetch(&self, mut request: FetchRequest) -> Result<FetchResponse, FetchError> {
        self.requested.lock().unwrap().push(request.url.clone());

        let original = Url::parse(&request.url).map_err(|e| FetchError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        let host = original.host_str().unwrap_or_default().to_string();

        let mut routed = self.server.clone();
        routed.set_path(original.path());
        routed.set_query(original.query());

        request.headers.push((HOST_HEADER.to_string(), host));
        let original_url = std::mem::replace(&mut request.url, routed.to_string());

        // Report errors against the address the crawler asked for
        self.inner.fetch(request).await.map_err(|e| match e {
            FetchError::Status { status, .. } => FetchError::Status {
                url: original_url,
                status,
            },
            other => other,
        })
    }
}

pub fn deps(fetcher: Arc<dyn Fetcher>, observer: Arc<MemoryObserver>) -> EngineDeps {
    EngineDeps {
        fetcher,
        parser: Arc::new(HtmlParser),
        throttle: Arc::new(Scheduler::new(4, Duration::from_millis(5))),
        observer,
    }
}

/// Parses a test catalog after substituting the output directory
pub fn config(template: &str, output_dir: &std::path::Path) -> Config {
    parse_config(&template.replace("{output}", output_dir.to_str().unwrap())).unwrap()
}

/// Serves an HTML page for `host` at `route`
pub async fn page(server: &MockServer, host: &str, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header(HOST_HEADER, host))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.as_bytes().to_vec(), "text/html"))
        .mount(server)
        .await;
}

/// Serves a plain-text or XML body for `host` at `route`
pub async fn text(server: &MockServer, host: &str, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header(HOST_HEADER, host))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn bytes(server: &MockServer, host: &str, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header(HOST_HEADER, host))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

pub async fn status(server: &MockServer, host: &str, route: &str, code: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header(HOST_HEADER, host))
        .respond_with(ResponseTemplate::new(code))
        .mount(server)
        .await;
}

pub fn read_json(dir: &std::path::Path, file: &str) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join(file)).unwrap();
    serde_json::from_str(&text).unwrap()
}
