use url::Url;

/// Resolves a raw href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is dropped so `/a#top` and `/a` dedup to
/// the same page.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}

/// Checks whether a URL names a non-HTML resource by its path suffix
///
/// The path of a parsable URL is compared case-insensitively; an unparsable
/// string falls back to a suffix check on the raw text.
pub fn has_skip_extension(url_str: &str, extensions: &[String]) -> bool {
    let candidate = match Url::parse(url_str) {
        Ok(url) => url.path().to_lowercase(),
        Err(_) => url_str.to_lowercase(),
    };

    extensions.iter().any(|ext| candidate.ends_with(ext.as_str()))
}
