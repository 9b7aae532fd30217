//! Embedded page-state extraction
//!
//! Storefronts ship their initial state as JSON inside script blocks, either as a
//! typed `application/json` block or as an assignment such as
//! `window.__PRELOADED_STATE__ = {...};`. This module isolates those payloads and
//! walks them for URL-bearing fields.

use crate::crawler::parser::ScriptBlock;
use serde_json::Value;

/// Global variables that storefronts assign their state to
pub const STATE_MARKERS: [&str; 2] = ["__PRELOADED_STATE__", "__INITIAL_STATE__"];

/// Object keys whose string values are treated as links
pub const URL_KEYS: [&str; 5] = ["productUrl", "product_url", "url", "href", "link"];

/// Returns true if the block may carry embedded state
pub fn is_state_block(block: &ScriptBlock) -> bool {
    block.is_json_typed() || STATE_MARKERS.iter().any(|m| block.text.contains(m))
}

/// Returns the longest prefix of `text` that is one balanced JSON object or array
///
/// Brackets inside string literals (including escaped quotes) are ignored.
/// Returns `None` if `text` does not start with `{` or `[`, or never closes.
pub fn balanced_json_prefix(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if first != '{' && first != '[' {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..idx + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Finds the JSON value assigned to `marker` in a script
///
/// Accepts `marker = {...}`, `marker={...}` and `window["marker"] = {...}`.
/// Mentions that are not assignments (guards, deletes) are passed over.
pub fn locate_assigned_json<'a>(script: &'a str, marker: &str) -> Option<&'a str> {
    script.match_indices(marker).find_map(|(idx, _)| {
        let rest = &script[idx + marker.len()..];
        let rest = rest.trim_start_matches(|c: char| c == '"' || c == '\'' || c == ']');
        let rest = rest.trim_start().strip_prefix('=')?;
        // `==` and `===` are comparisons
        if rest.starts_with('=') {
            return None;
        }
        balanced_json_prefix(rest.trim_start())
    })
}

/// Isolates the JSON text carried by a script block
pub fn block_payload(block: &ScriptBlock) -> Option<&str> {
    let assigned = STATE_MARKERS
        .iter()
        .find_map(|marker| locate_assigned_json(&block.text, marker));
    if assigned.is_some() {
        return assigned;
    }

    if block.is_json_typed() {
        let trimmed = block.text.trim();
        return (!trimmed.is_empty()).then_some(trimmed);
    }

    None
}

/// Parses the JSON payload of a block
pub fn parse_block(block: &ScriptBlock) -> Result<Value, String> {
    let payload = block_payload(block).ok_or_else(|| "no JSON payload found".to_string())?;
    serde_json::from_str(payload).map_err(|e| e.to_string())
}

/// Collects the string values of URL-bearing keys
///
/// The walk is iterative; containers nested deeper than `max_depth` levels
/// below the root are not entered.
pub fn collect_url_fields(root: &Value, max_depth: usize) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];

    while let Some((value, depth)) = stack.pop() {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if let Value::String(s) = child {
                        if URL_KEYS.contains(&key.as_str()) {
                            found.push(s.clone());
                        }
                    } else if is_container(child) && depth < max_depth {
                        stack.push((child, depth + 1));
                    }
                }
            }
            Value::Array(items) => {
                for child in items.iter().filter(|c| is_container(c)) {
                    if depth < max_depth {
                        stack.push((child, depth + 1));
                    }
                }
            }
            _ => {}
        }
    }

    found
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(text: &str) -> ScriptBlock {
        ScriptBlock {
            script_type: None,
            text: text.to_string(),
        }
    }

    fn json_script(text: &str) -> ScriptBlock {
        ScriptBlock {
            script_type: Some("application/json".to_string()),
            text: text.to_string(),
        }
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_balanced_prefix_stops_at_close() {
        assert_eq!(
            balanced_json_prefix(r#"{"a": {"b": [1, 2]}}; window.x = 1;"#),
            Some(r#"{"a": {"b": [1, 2]}}"#)
        );
    }

    #[test]
    fn test_balanced_prefix_ignores_brackets_in_strings() {
        let text = r#"{"name": "a } tricky \" ] one"} trailing"#;
        assert_eq!(
            balanced_json_prefix(text),
            Some(r#"{"name": "a } tricky \" ] one"}"#)
        );
    }

    #[test]
    fn test_balanced_prefix_rejects_unclosed_and_non_json() {
        assert_eq!(balanced_json_prefix(r#"{"a": 1"#), None);
        assert_eq!(balanced_json_prefix("undefined;"), None);
        assert_eq!(balanced_json_prefix(""), None);
    }

    #[test]
    fn test_locate_assigned_json_whitespace_variants() {
        for text in [
            r#"window.__PRELOADED_STATE__ = {"a":1};"#,
            r#"window.__PRELOADED_STATE__={"a":1}"#,
            "window.__PRELOADED_STATE__ =\n  {\"a\":1}\n",
            r#"window["__PRELOADED_STATE__"] = {"a":1};"#,
        ] {
            assert_eq!(
                locate_assigned_json(text, "__PRELOADED_STATE__"),
                Some(r#"{"a":1}"#),
                "failed on {}",
                text
            );
        }
    }

    #[test]
    fn test_marker_without_assignment() {
        assert_eq!(
            locate_assigned_json("if (window.__INITIAL_STATE__) {}", "__INITIAL_STATE__"),
            None
        );
        assert_eq!(
            locate_assigned_json("if (x.__INITIAL_STATE__ === {}) {}", "__INITIAL_STATE__"),
            None
        );
    }

    #[test]
    fn test_guarded_assignment_uses_later_mention() {
        let text = r#"if (!window.__PRELOADED_STATE__) { window.__PRELOADED_STATE__ = {"url": "/products/a"}; }"#;
        assert_eq!(
            locate_assigned_json(text, "__PRELOADED_STATE__"),
            Some(r#"{"url": "/products/a"}"#)
        );

        let value = parse_block(&script(text)).unwrap();
        assert_eq!(value, json!({"url": "/products/a"}));
    }

    #[test]
    fn test_falls_through_to_next_marker() {
        let block = script(
            r#"delete window.__PRELOADED_STATE__; window.__INITIAL_STATE__ = {"url":"/products/b"};"#,
        );
        assert_eq!(parse_block(&block).unwrap(), json!({"url": "/products/b"}));
        assert_eq!(
            collect_url_fields(&parse_block(&block).unwrap(), 8),
            vec!["/products/b"]
        );
    }

    #[test]
    fn test_block_selection() {
        assert!(is_state_block(&json_script("{}")));
        assert!(is_state_block(&script("window.__INITIAL_STATE__ = {};")));
        assert!(!is_state_block(&script("console.log('hi');")));
    }

    #[test]
    fn test_parse_block_variants() {
        let value = parse_block(&json_script(r#" {"url": "/p/1"} "#)).unwrap();
        assert_eq!(value, json!({"url": "/p/1"}));

        let value =
            parse_block(&script(r#"window.__INITIAL_STATE__ = {"href": "/p/2"};"#)).unwrap();
        assert_eq!(value, json!({"href": "/p/2"}));

        assert!(parse_block(&json_script("{not json}")).is_err());
        assert!(parse_block(&script("var x = 1;")).is_err());
    }

    #[test]
    fn test_collect_url_fields_nested() {
        let value = json!({
            "productUrl": "/p/top",
            "page": {
                "items": [
                    {"url": "/p/1", "name": "one"},
                    {"link": "/p/2", "href": 42},
                    "loose string",
                    [{"product_url": "/p/3"}]
                ]
            },
            "title": "/not/a/url/key"
        });
        assert_eq!(
            sorted(collect_url_fields(&value, 64)),
            vec!["/p/1", "/p/2", "/p/3", "/p/top"]
        );
    }

    #[test]
    fn test_collect_url_fields_depth_bound() {
        let value = json!({"url": "/p/0", "a": {"url": "/p/1", "b": {"url": "/p/2"}}});
        assert_eq!(sorted(collect_url_fields(&value, 0)), vec!["/p/0"]);
        assert_eq!(sorted(collect_url_fields(&value, 1)), vec!["/p/0", "/p/1"]);
        assert_eq!(
            sorted(collect_url_fields(&value, 2)),
            vec!["/p/0", "/p/1", "/p/2"]
        );
    }

    #[test]
    fn test_collect_url_fields_deep_nesting_does_not_overflow() {
        let mut value = json!({"url": "/deep"});
        for _ in 0..5_000 {
            value = Value::Array(vec![value]);
        }
        assert!(collect_url_fields(&value, 64).is_empty());
        drop_deep(value);
    }

    // serde_json drops nested values recursively; unwind iteratively in the test
    fn drop_deep(mut value: Value) {
        while let Value::Array(mut items) = value {
            value = items.pop().unwrap_or(Value::Null);
        }
    }
}
