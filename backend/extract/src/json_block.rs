//! Locating a JSON object inside free text.
//!
//! Models wrap JSON in markdown fences, prefix it with prose, or append
//! commentary. Fenced code blocks are searched first, then the whole
//! text. The scanner walks brace depth while honouring string literals and
//! escapes, and stops at the first balanced span that parses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```").unwrap());

/// Index of the brace closing the one at `start`, if balanced.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// First object that parses, trying each `{` in order.
fn scan_objects(text: &str) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'{')
        .find_map(|(start, _)| {
            let end = matching_brace(bytes, start)?;
            match serde_json::from_str::<Value>(&text[start..=end]) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            }
        })
}

/// The first well-formed JSON object embedded in `text`, preferring
/// fenced code blocks over bare text.
pub fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    FENCE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| scan_objects(body.as_str()))
        .or_else(|| scan_objects(text))
}
