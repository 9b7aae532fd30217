//! Robots.txt directive parser
//!
//! Only the directives used for discovery are read: `Sitemap:` lines feed the
//! sitemap resolver and `Allow:` lines are candidate category entry points.
//! Disallow rules are not interpreted.

/// Discovery-relevant directives from one robots.txt file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsDirectives {
    /// Values of `Sitemap:` lines, in file order
    pub sitemaps: Vec<String>,
    /// Values of `Allow:` lines, in file order
    pub allows: Vec<String>,
}

impl RobotsDirectives {
    /// Parses robots.txt content
    ///
    /// Directive names are matched case-insensitively, comments and blank values
    /// are ignored, and lines without a colon are skipped.
    ///
    /// # Example
    ///
    /// ```
    /// use product_ripple::robots::RobotsDirectives;
    ///
    /// let robots = RobotsDirectives::from_content(
    ///     "User-agent: *\nAllow: /clothing/\nSitemap: https://shop.com/sitemap.xml",
    /// );
    /// assert_eq!(robots.sitemaps, vec!["https://shop.com/sitemap.xml"]);
    /// assert_eq!(robots.allows, vec!["/clothing/"]);
    /// ```
    pub fn from_content(content: &str) -> Self {
        let mut directives = Self::default();

        for line in content.lines() {
            // Strip trailing comments
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim().to_ascii_lowercase().as_str() {
                "sitemap" => directives.sitemaps.push(value.to_string()),
                "allow" => directives.allows.push(value.to_string()),
                _ => {}
            }
        }

        directives
    }
}
