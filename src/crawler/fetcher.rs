//! HTTP fetcher implementation
//!
//! This module defines the transport seam of the crawler and its reqwest-backed
//! implementation:
//! - `Fetcher`: the trait every fetch goes through (test doubles implement it too)
//! - `FetchRequest` / `FetchResponse`: per-request timeout, headers, body mode and
//!   accepted non-2xx statuses
//! - `HttpFetcher`: the production client
//! - Request header construction with user-agent rotation

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// How the response body should be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Decoded text (JSON bodies may be delivered as a parsed value)
    Text,
    /// Raw bytes, for payloads that need decompression
    Binary,
}

/// A single outbound request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub mode: BodyMode,
    /// Non-2xx statuses that should be returned as responses instead of errors
    pub accept_statuses: Vec<u16>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
            mode: BodyMode::Text,
            accept_statuses: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn binary(mut self) -> Self {
        self.mode = BodyMode::Binary;
        self
    }

    pub fn accept_statuses(mut self, statuses: &[u16]) -> Self {
        self.accept_statuses = statuses.to_vec();
        self
    }

    /// Returns true if the status counts as a usable response for this request
    pub fn accepts(&self, status: u16) -> bool {
        (200..300).contains(&status) || self.accept_statuses.contains(&status)
    }
}

/// Response body in whatever form the transport produced
#[derive(Debug, Clone)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl Body {
    /// Converts any body form into document text
    pub fn into_text(self) -> String {
        match self {
            Body::Text(text) => text,
            Body::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Body::Json(value) => value.to_string(),
        }
    }

    /// Converts any body form into raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Body::Text(text) => text.into_bytes(),
            Body::Binary(bytes) => bytes,
            Body::Json(value) => value.to_string().into_bytes(),
        }
    }
}

/// A response that passed the status check
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Body,
    pub content_type: Option<String>,
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// The transport seam used by the crawl engine
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Timeouts are applied per request, so the client itself only bounds
/// connection setup.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds browser-like request headers with a randomly chosen user agent
pub fn request_headers(agents: &[String]) -> Vec<(String, String)> {
    let mut headers = Vec::with_capacity(4);

    if let Some(agent) = agents.choose(&mut rand::thread_rng()) {
        headers.push(("User-Agent".to_string(), agent.clone()));
    }
    headers.push((
        "Accept".to_string(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
            .to_string(),
    ));
    headers.push(("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()));
    headers.push(("Referer".to_string(), "https://www.google.com/".to_string()));

    headers
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = build_http_client().map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn header_map(url: &str, headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("invalid header name '{}': {}", name, e),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("invalid header value: {}", e),
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

fn classify_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_body() || e.is_decode() {
        FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url.as_str();
        let headers = header_map(url, &request.headers)?;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        if !request.accepts(status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = match request.mode {
            BodyMode::Binary => {
                let bytes = response.bytes().await.map_err(|e| classify_error(url, e))?;
                Body::Binary(bytes.to_vec())
            }
            BodyMode::Text => {
                let text = response.text().await.map_err(|e| classify_error(url, e))?;
                let is_json = content_type
                    .as_deref()
                    .map(|ct| ct.contains("json"))
                    .unwrap_or(false);
                if is_json {
                    serde_json::from_str(&text)
                        .map(Body::Json)
                        .unwrap_or(Body::Text(text))
                } else {
                    Body::Text(text)
                }
            }
        };

        Ok(FetchResponse {
            status,
            body,
            content_type,
        })
    }
}
