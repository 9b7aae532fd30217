use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// The catalog compiled into the binary
const BUILTIN_CATALOG: &str = include_str!("../../config/catalog.toml");

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use product_ripple::config::load_config;
///
/// let config = load_config(Path::new("catalog.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Returns the built-in catalog together with its hash
pub fn builtin_config() -> Result<(Config, String), ConfigError> {
    let config = parse_config(BUILTIN_CATALOG)?;
    Ok((config, hash_content(BUILTIN_CATALOG)))
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded in the crawl report so runs can be tied to the exact
/// rule set that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-depth = 3
max-concurrent-requests = 10
request-delay-ms = 250

[output]
directory = "./out"

[generic]
product-patterns = ['/item/[a-z0-9-]+']

[[domain]]
name = "example.com"
product-patterns = ['/products/[a-z0-9-]+']
excluded-patterns = ['cart']
start-urls = ["https://www.example.com/"]
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.concurrency(), 10);
        assert_eq!(config.crawler.request_delay_ms, 250);
        assert_eq!(config.crawler.page_timeout_ms, 15_000);
        assert_eq!(config.output.directory, "./out");
        assert_eq!(config.domains.len(), 1);
        assert!(config.domains[0].enabled);
        assert_eq!(config.generic.block_statuses, vec![403]);
        assert!(!config.user_agent.agents.is_empty());
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let (config, hash) = builtin_config().unwrap();
        let enabled: Vec<&str> = config.enabled_domains().map(|d| d.name.as_str()).collect();
        assert_eq!(
            enabled,
            vec!["virgio.com", "tatacliq.com", "westside.com", "nykaafashion.com"]
        );
        assert_eq!(
            config.domain("nykaafashion.com").unwrap().alt_domain.as_deref(),
            Some("intl.nykaafashion.com")
        );
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/catalog.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_without_domains_fails_fast() {
        let file = create_temp_config("[crawler]\nmax-depth = 2\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_config_with_hash_matches_file_hash() {
        let content = "[[domain]]\nname = \"example.com\"\n";
        let file = create_temp_config(content);

        let (_, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
