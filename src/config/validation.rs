use crate::config::types::{Config, CrawlerConfig, DomainConfig, GenericRules, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_generic_rules(&config.generic)?;
    validate_domains(config)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests == Some(0) {
        return Err(ConfigError::Validation(
            "max_concurrent_requests must be >= 1".to_string(),
        ));
    }

    if config.workers == Some(0) {
        return Err(ConfigError::Validation("workers must be >= 1".to_string()));
    }

    for (name, value) in [
        ("robots_timeout_ms", config.robots_timeout_ms),
        ("sitemap_timeout_ms", config.sitemap_timeout_ms),
        ("page_timeout_ms", config.page_timeout_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.max_json_depth == 0 {
        return Err(ConfigError::Validation(
            "max_json_depth must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the user agent pool
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.agents cannot be empty".to_string(),
        ));
    }

    if config.agents.iter().any(|a| a.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agent.agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_generic_rules(rules: &GenericRules) -> Result<(), ConfigError> {
    validate_patterns("generic", &rules.product_patterns)?;

    for ext in &rules.skip_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "skip extension '{}' must look like '.ext'",
                ext
            )));
        }
    }

    for status in &rules.block_statuses {
        if !(100..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "block status {} is not an HTTP status code",
                status
            )));
        }
    }

    Ok(())
}

/// Validates every domain entry and the relations between them
fn validate_domains(config: &Config) -> Result<(), ConfigError> {
    if config.enabled_domains().next().is_none() {
        return Err(ConfigError::Validation(
            "no domains configured for crawling".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for entry in &config.domains {
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "domain '{}' is configured more than once",
                entry.name
            )));
        }
        validate_domain_entry(entry)?;
    }

    for entry in &config.domains {
        if let Some(alt) = &entry.alt_domain {
            if config.domain(alt).is_none() {
                return Err(ConfigError::Validation(format!(
                    "alt-domain '{}' of '{}' has no domain entry",
                    alt, entry.name
                )));
            }
            if alt == &entry.name {
                return Err(ConfigError::Validation(format!(
                    "domain '{}' cannot be its own alt-domain",
                    entry.name
                )));
            }
        }
    }

    Ok(())
}

fn validate_domain_entry(entry: &DomainConfig) -> Result<(), ConfigError> {
    validate_domain_string(&entry.name)?;

    validate_patterns(&entry.name, &entry.product_patterns)?;
    validate_patterns(&entry.name, &entry.excluded_patterns)?;
    validate_patterns(&entry.name, &entry.category_patterns)?;

    for seed in entry
        .start_urls
        .iter()
        .chain(&entry.robots_urls)
        .chain(&entry.sitemap_urls)
    {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP(S)",
                seed
            )));
        }
    }

    Ok(())
}

/// Checks that every pattern compiles as a regular expression
fn validate_patterns(owner: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("{}: '{}': {}", owner, pattern, e))
        })?;
    }
    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    if domain.starts_with("www.") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must be given without the 'www.' prefix",
            domain
        )));
    }

    Ok(())
}
