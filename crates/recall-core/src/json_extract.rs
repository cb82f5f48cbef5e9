//! Tolerant JSON Extraction (C4)
//!
//! LLM output that's supposed to be a single JSON object arrives wrapped in
//! markdown fences, preceded by commentary, or salted with `//` / `/* */`
//! comments a strict parser won't accept. This module recovers the object
//! anyway, falling back to reconstructing one from loosely-structured
//! markdown when no braces are present at all.
//!
//! Pure and deterministic: no IO, no randomness, same input always produces
//! the same output.

use serde_json::{Map, Value};

use crate::error::JsonExtractError;

/// Strip a leading/trailing ```` ```json ```` or ```` ``` ```` fence, if present.
fn strip_markdown_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening fence line.
    let rest = rest
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Scan `text` for the first top-level `{...}` object, honoring string and
/// escape state so braces inside string literals don't confuse the scan.
/// Returns the matched slice, or `None` if no balanced object is found.
fn find_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        let ch = b as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strip `//` and `/* ... */` comments that lie outside any string literal.
/// LLMs occasionally annotate generated JSON like it's a source file.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push(c);
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Extract a JSON object from free-form text, tolerating markdown fences
/// and inline comments. Returns the parsed object map.
///
/// Falls back to [`extract_from_markdown`] when no `{...}` is found at all.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, JsonExtractError> {
    let stripped = strip_markdown_fence(text);

    if let Some(candidate) = find_json_object(stripped) {
        let cleaned = strip_comments(candidate);
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned) {
            return Ok(map);
        }
    }

    extract_from_markdown(stripped).ok_or(JsonExtractError::NoContentFound)
}

/// Field names this module recognizes in a markdown-formatted fallback,
/// mapped to the keys of the returned object.
const SIMPLE_FIELDS: &[(&str, &str)] = &[
    ("Title", "title"),
    ("Summary", "summary_detailed"),
    ("Tags", "tags"),
    ("Key Topics", "key_topics"),
];

/// Reconstruct a JSON object from bolded/starred markdown field labels
/// (`**Title:** ...`, `Summary: ...`) when the model didn't produce JSON at
/// all. Recognizes a nested `Key Entities:` block with `People:` /
/// `Domains:` / `Assets:` sub-lists and flat `- item` / `[a, b, c]` lists
/// for everything else.
pub fn extract_from_markdown(text: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    let mut found_any = false;

    for (label, key) in SIMPLE_FIELDS {
        if let Some(value) = extract_labeled_value(text, label) {
            found_any = true;
            match *key {
                "tags" | "key_topics" => {
                    map.insert(key.to_string(), Value::Array(parse_list(&value)));
                }
                _ => {
                    map.insert(key.to_string(), Value::String(value));
                }
            }
        }
    }

    if let Some(entities) = extract_key_entities(text) {
        found_any = true;
        map.insert("key_entities".to_string(), entities);
    }

    found_any.then_some(map)
}

/// Find a line of the form `**Label:** value` or `Label: value` (bold
/// markers optional) and return the trimmed value up to the end of line.
fn extract_labeled_value(text: &str, label: &str) -> Option<String> {
    for line in text.lines() {
        let line = line.trim();
        let stripped = line.trim_start_matches('*').trim_start();
        let prefix = format!("{label}:");
        if let Some(rest) = stripped.strip_prefix(&prefix) {
            let value = rest.trim().trim_start_matches("**").trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Parse a value as either a bracketed `[a, b, c]` list or a set of
/// following `- item` bullet lines, falling back to a single-element list
/// of the raw string.
fn parse_list(value: &str) -> Vec<Value> {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        return inner
            .split(',')
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .map(Value::String)
            .collect();
    }

    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Value::String)
        .collect()
}

/// Extract the nested `Key Entities:` block with its `People:` / `Domains:`
/// / `Assets:` sub-lists, each rendered as `- item` bullet lines.
fn extract_key_entities(text: &str) -> Option<Value> {
    let lower = text.to_lowercase();
    let start = lower.find("key entities")?;
    let section = &text[start..];

    let mut people = Vec::new();
    let mut domains = Vec::new();
    let mut assets = Vec::new();
    let mut current: Option<&mut Vec<String>> = None;

    for line in section.lines().skip(1) {
        let trimmed = line.trim().trim_start_matches('*').trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("People:") {
            current = Some(&mut people);
            push_inline_items(rest, &mut current);
        } else if let Some(rest) = trimmed.strip_prefix("Domains:") {
            current = Some(&mut domains);
            push_inline_items(rest, &mut current);
        } else if let Some(rest) = trimmed.strip_prefix("Assets:") {
            current = Some(&mut assets);
            push_inline_items(rest, &mut current);
        } else if let Some(item) = trimmed.strip_prefix('-') {
            if let Some(bucket) = current.as_deref_mut() {
                let item = item.trim();
                if !item.is_empty() {
                    bucket.push(item.to_string());
                }
            }
        } else if !trimmed.starts_with("Key Entities") {
            // A non-bullet, non-sub-label line ends the section.
            break;
        }
    }

    if people.is_empty() && domains.is_empty() && assets.is_empty() {
        return None;
    }

    Some(serde_json::json!({
        "people": people,
        "domains": domains,
        "assets": assets,
    }))
}

fn push_inline_items(rest: &str, current: &mut Option<&mut Vec<String>>) {
    let rest = rest.trim();
    if rest.is_empty() {
        return;
    }
    if let Some(bucket) = current.as_deref_mut() {
        for item in parse_list(rest) {
            if let Value::String(s) = item {
                bucket.push(s);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_json() {
        let text = r#"{"title": "x", "tags": ["a", "b"]}"#;
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["title"], "x");
    }

    #[test]
    fn strips_markdown_fence() {
        let text = "```json\n{\"title\": \"x\"}\n```";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["title"], "x");
    }

    #[test]
    fn strips_leading_commentary_and_comments() {
        let text = "Here you go:\n{\n  // the title\n  \"title\": \"x\" /* done */\n}";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["title"], "x");
    }

    #[test]
    fn handles_nested_braces_and_strings_with_braces() {
        let text = r#"{"title": "uses {curly} in a string", "nested": {"a": 1}}"#;
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["title"], "uses {curly} in a string");
    }

    #[test]
    fn falls_back_to_markdown_fields() {
        let text = "**Title:** Evening walk\nSummary: Talked about the park.\nTags: [park, walk]";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["title"], "Evening walk");
        assert_eq!(obj["tags"], serde_json::json!(["park", "walk"]));
    }

    #[test]
    fn falls_back_to_nested_key_entities() {
        let text = "Title: x\nKey Entities:\nPeople:\n- Alice\n- Bob\nDomains:\n- health";
        let obj = extract_json_object(text).unwrap();
        let entities = &obj["key_entities"];
        assert_eq!(entities["people"], serde_json::json!(["Alice", "Bob"]));
        assert_eq!(entities["domains"], serde_json::json!(["health"]));
    }

    #[test]
    fn no_content_errors() {
        let text = "nothing useful here";
        assert!(matches!(
            extract_json_object(text),
            Err(JsonExtractError::NoContentFound)
        ));
    }
}
