use crate::UrlError;
use url::Url;

/// Extracts the crawl domain from a URL
///
/// The host is lowercased and a leading `www.` is dropped, so
/// `https://www.Example.com/` and `https://example.com/` share one domain key.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use product_ripple::url::extract_domain;
///
/// let url = Url::parse("https://www.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://intl.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("intl.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    })
}

/// Parses a URL string and returns its crawl domain
pub fn domain_of(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    extract_domain(&url).ok_or(UrlError::MissingDomain)
}

/// Rewrites a URL so it points at a mirror domain
///
/// Only the host changes; scheme, port, path and query are kept. The mirror is
/// addressed by its bare domain name. Returns `None` when the URL's domain is
/// not `from`.
pub fn swap_domain(url: &Url, from: &str, to: &str) -> Option<Url> {
    if extract_domain(url).as_deref() != Some(from) {
        return None;
    }

    let mut mirrored = url.clone();
    mirrored.set_host(Some(to)).ok()?;
    Some(mirrored)
}
