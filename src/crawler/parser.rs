//! HTML document parsing
//!
//! The crawl engine only needs two things from a page: its raw hrefs and the text
//! of its script blocks. Both are exposed through the `Document` trait so the
//! engine can be driven by a test double instead of a real HTML parser.

use scraper::{Html, Selector};

/// One `<script>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    /// Value of the `type` attribute, if present
    pub script_type: Option<String>,

    /// Concatenated text content
    pub text: String,
}

impl ScriptBlock {
    /// Returns true for `<script type="application/json">` blocks
    pub fn is_json_typed(&self) -> bool {
        self.script_type
            .as_deref()
            .map(|t| t.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }
}

/// A parsed page
pub trait Document {
    /// Raw `href` values of every anchor, in document order
    fn links(&self) -> Vec<String>;

    /// Every script block, in document order
    fn script_blocks(&self) -> Vec<ScriptBlock>;

    /// Script blocks accepted by `predicate`
    fn script_blocks_where(&self, predicate: &dyn Fn(&ScriptBlock) -> bool) -> Vec<ScriptBlock> {
        self.script_blocks()
            .into_iter()
            .filter(|block| predicate(block))
            .collect()
    }
}

/// Turns page text into a [`Document`]
pub trait DocumentParser: Send + Sync {
    fn parse(&self, html: &str) -> Box<dyn Document>;
}

/// `scraper`-backed parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl DocumentParser for HtmlParser {
    fn parse(&self, html: &str) -> Box<dyn Document> {
        Box::new(HtmlDocument {
            html: Html::parse_document(html),
        })
    }
}

struct HtmlDocument {
    html: Html,
}

impl Document for HtmlDocument {
    fn links(&self) -> Vec<String> {
        let mut links = Vec::new();

        if let Ok(selector) = Selector::parse("a[href]") {
            for element in self.html.select(&selector) {
                // Download links point at files, not pages
                if element.value().attr("download").is_some() {
                    continue;
                }
                if let Some(href) = element.value().attr("href") {
                    links.push(href.to_string());
                }
            }
        }

        links
    }

    fn script_blocks(&self) -> Vec<ScriptBlock> {
        let Ok(selector) = Selector::parse("script") else {
            return Vec::new();
        };

        self.html
            .select(&selector)
            .map(|element| ScriptBlock {
                script_type: element.value().attr("type").map(|t| t.to_string()),
                text: element.text().collect::<String>(),
            })
            .filter(|block| !block.text.trim().is_empty())
            .collect()
    }
}
