//! Sitemap parsing and recursive resolution
//!
//! A sitemap document is either an index of further sitemaps or a set of page
//! URLs. Indexes are expanded recursively; leaf URLs are classified and the
//! products among them recorded. Every node fails on its own: a bad child never
//! stops its siblings or parent.

use crate::crawler::engine::CrawlEngine;
use crate::crawler::observer::{CrawlEvent, Discovery};
use crate::crawler::scheduler::throttled_fetch;
use crate::url::extract_domain;
use crate::RippleError;
use flate2::read::GzDecoder;
use futures::future::{join_all, BoxFuture, FutureExt};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use std::io::Read;
use url::Url;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapNode {
    /// `<sitemapindex>`: locations of child sitemaps
    Index(Vec<String>),
    /// `<urlset>`: locations of pages
    UrlSet(Vec<String>),
}

/// Turns a fetched sitemap payload into XML text
///
/// Payloads are inflated when they carry the gzip magic bytes. A `.gz` URL
/// whose body is already plain (the transport decoded it) is used as is.
pub fn decode_payload(url: &str, bytes: Vec<u8>) -> Result<String, RippleError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut xml = String::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut xml)
            .map_err(|e| RippleError::Decode {
                url: url.to_string(),
                message: format!("gunzip failed: {}", e),
            })?;
        return Ok(xml);
    }

    if has_gzip_suffix(url) {
        tracing::debug!("{} has a .gz suffix but an uncompressed body", url);
    }

    String::from_utf8(bytes).map_err(|e| RippleError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn has_gzip_suffix(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase().ends_with(".gz"),
        Err(_) => url.to_ascii_lowercase().ends_with(".gz"),
    }
}

/// Parses sitemap XML
///
/// Only `<loc>` elements directly inside `<sitemap>` or `<url>` entries are
/// read, so extension tags such as `<image:loc>` are ignored. A document with
/// a single entry yields a list of one.
pub fn parse_sitemap(url: &str, xml: &str) -> Result<SitemapNode, RippleError> {
    let parse_error = |message: String| RippleError::SitemapParse {
        url: url.to_string(),
        message,
    };

    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut root: Option<Vec<u8>> = None;
    let mut locations = Vec::new();
    let mut current_loc: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if root.is_none() {
                    root = Some(name.clone());
                }
                if name == b"loc" && is_entry(stack.last()) {
                    current_loc = Some(String::new());
                }
                stack.push(name);
            }
            Ok(XmlEvent::End(e)) => {
                if e.local_name().as_ref() == b"loc" {
                    if let Some(loc) = current_loc.take() {
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            locations.push(loc.to_string());
                        }
                    }
                }
                stack.pop();
            }
            Ok(XmlEvent::Text(t)) => {
                if let Some(loc) = current_loc.as_mut() {
                    let text = t.unescape().map_err(|e| parse_error(e.to_string()))?;
                    loc.push_str(&text);
                }
            }
            Ok(XmlEvent::CData(c)) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(XmlEvent::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(parse_error(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    match root.as_deref() {
        Some(b"sitemapindex") => Ok(SitemapNode::Index(locations)),
        Some(b"urlset") => Ok(SitemapNode::UrlSet(locations)),
        Some(other) => Err(parse_error(format!(
            "unexpected root element <{}>",
            String::from_utf8_lossy(other)
        ))),
        None => Err(parse_error("empty document".to_string())),
    }
}

fn is_entry(parent: Option<&Vec<u8>>) -> bool {
    matches!(parent.map(Vec::as_slice), Some(b"url") | Some(b"sitemap"))
}

impl CrawlEngine {
    /// Fetches a sitemap and expands it
    ///
    /// Each sitemap URL is resolved at most once per engine, and indexes nested
    /// deeper than the configured limit are not followed.
    pub fn resolve_sitemap(&self, url: String, depth: u32) -> BoxFuture<'_, ()> {
        async move {
            if depth > self.settings.max_sitemap_depth {
                self.emit(CrawlEvent::SitemapSkipped {
                    url,
                    reason: format!("nested deeper than {}", self.settings.max_sitemap_depth),
                });
                return;
            }
            if !self.frontier().try_claim_sitemap(&url) {
                self.emit(CrawlEvent::SitemapSkipped {
                    url,
                    reason: "already resolved".to_string(),
                });
                return;
            }

            let node = match self.fetch_sitemap(&url).await {
                Ok(node) => node,
                Err(e) => {
                    self.emit(CrawlEvent::SitemapFailed {
                        url,
                        error: e.to_string(),
                    });
                    return;
                }
            };

            match node {
                SitemapNode::Index(children) => {
                    self.emit(CrawlEvent::SitemapResolved {
                        url,
                        children: children.len(),
                        leaves: 0,
                    });
                    join_all(
                        children
                            .into_iter()
                            .map(|child| self.resolve_sitemap(child, depth + 1)),
                    )
                    .await;
                }
                SitemapNode::UrlSet(leaves) => {
                    self.emit(CrawlEvent::SitemapResolved {
                        url,
                        children: 0,
                        leaves: leaves.len(),
                    });
                    for leaf in leaves {
                        match Url::parse(&leaf) {
                            Ok(leaf) => {
                                self.consider(&leaf, Discovery::Sitemap);
                            }
                            Err(e) => tracing::debug!("Skipping sitemap entry {}: {}", leaf, e),
                        }
                    }
                }
            }
        }
        .boxed()
    }

    async fn fetch_sitemap(&self, url: &str) -> Result<SitemapNode, RippleError> {
        let domain = extract_domain(&Url::parse(url)?).unwrap_or_default();
        let request = self.request(url, self.settings.sitemap_timeout).binary();
        let response = throttled_fetch(
            self.deps.throttle.as_ref(),
            self.deps.fetcher.as_ref(),
            &domain,
            request,
        )
        .await?;

        let xml = decode_payload(url, response.body.into_bytes())?;
        parse_sitemap(url, &xml)
    }
}
