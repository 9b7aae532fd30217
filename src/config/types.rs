use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Product-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub generic: GenericRules,
    #[serde(rename = "domain", default)]
    pub domains: Vec<DomainConfig>,
}

impl Config {
    /// Domains that are actually crawled (enabled entries), in configuration order
    pub fn enabled_domains(&self) -> impl Iterator<Item = &DomainConfig> {
        self.domains.iter().filter(|d| d.enabled)
    }

    /// Looks up the rules for a domain by name
    pub fn domain(&self, name: &str) -> Option<&DomainConfig> {
        self.domains.iter().find(|d| d.name == name)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link depth followed from a start page
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of in-flight fetches per shard (defaults to parallelism x 4)
    #[serde(default)]
    pub max_concurrent_requests: Option<usize>,

    /// Minimum spacing between requests to the same domain (milliseconds)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_robots_timeout_ms")]
    pub robots_timeout_ms: u64,

    #[serde(default = "default_sitemap_timeout_ms")]
    pub sitemap_timeout_ms: u64,

    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Number of worker shards (defaults to parallelism - 1, at least 1)
    #[serde(default)]
    pub workers: Option<usize>,

    /// How many chained mirror-domain retries a blocked page may trigger
    #[serde(default = "default_max_block_retries")]
    pub max_block_retries: u32,

    /// Nesting bound for sitemap indexes
    #[serde(default = "default_max_sitemap_depth")]
    pub max_sitemap_depth: u32,

    /// Nesting bound for the embedded JSON walk
    #[serde(default = "default_max_json_depth")]
    pub max_json_depth: usize,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.robots_timeout_ms)
    }

    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_millis(self.sitemap_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    /// Resolved global concurrency cap
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_requests
            .unwrap_or_else(|| available_parallelism() * 4)
            .max(1)
    }

    /// Resolved number of worker shards
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| available_parallelism().saturating_sub(1))
            .max(1)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_concurrent_requests: None,
            request_delay_ms: default_request_delay_ms(),
            robots_timeout_ms: default_robots_timeout_ms(),
            sitemap_timeout_ms: default_sitemap_timeout_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            workers: None,
            max_block_retries: default_max_block_retries(),
            max_sitemap_depth: default_max_sitemap_depth(),
            max_json_depth: default_max_json_depth(),
        }
    }
}

/// User agent rotation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Pool of User-Agent strings; one is picked at random per request
    #[serde(default = "default_agents")]
    pub agents: Vec<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the per-domain and aggregate result files
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// Rules shared by every domain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenericRules {
    /// Product patterns evaluated after the domain-specific ones
    #[serde(default)]
    pub product_patterns: Vec<String>,

    /// Path suffixes that never name an HTML page
    #[serde(default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,

    /// Statuses a site uses to signal anti-bot blocking
    #[serde(default = "default_block_statuses")]
    pub block_statuses: Vec<u16>,
}

impl Default for GenericRules {
    fn default() -> Self {
        Self {
            product_patterns: Vec::new(),
            skip_extensions: default_skip_extensions(),
            block_statuses: default_block_statuses(),
        }
    }
}

/// Per-domain crawl rules and entry points
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainConfig {
    /// Domain name without a leading "www." (e.g., "example.com")
    pub name: String,

    /// Whether the domain is crawled; disabled entries still contribute rules
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub product_patterns: Vec<String>,

    #[serde(default)]
    pub excluded_patterns: Vec<String>,

    /// Paths from robots.txt `Allow:` lines matching these are crawled as entry points
    #[serde(default)]
    pub category_patterns: Vec<String>,

    /// Mirror domain tried when this domain answers with a block status
    #[serde(default)]
    pub alt_domain: Option<String>,

    #[serde(default)]
    pub start_urls: Vec<String>,

    #[serde(default)]
    pub robots_urls: Vec<String>,

    #[serde(default)]
    pub sitemap_urls: Vec<String>,
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_max_depth() -> u32 {
    10
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_robots_timeout_ms() -> u64 {
    10_000
}

fn default_sitemap_timeout_ms() -> u64 {
    15_000
}

fn default_page_timeout_ms() -> u64 {
    15_000
}

fn default_max_block_retries() -> u32 {
    1
}

fn default_max_sitemap_depth() -> u32 {
    16
}

fn default_max_json_depth() -> usize {
    64
}

fn default_enabled() -> bool {
    true
}

fn default_output_directory() -> String {
    ".".to_string()
}

fn default_block_statuses() -> Vec<u16> {
    vec![403]
}

fn default_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/119.0".to_string(),
    ]
}

fn default_skip_extensions() -> Vec<String> {
    [
        ".png", ".jpeg", ".jpg", ".gif", ".pdf", ".svg", ".webp", ".css", ".js", ".mp3", ".mp4",
        ".mov", ".zip", ".rar",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
