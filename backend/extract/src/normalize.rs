//! Value normalization shared by both parser passes.

use skuforge_core::Field;

/// Values models use to say "I don't know" (compared case-insensitively).
const UNKNOWN_MARKERS: &[&str] = &[
    "unknown",
    "n/a",
    "na",
    "none",
    "null",
    "nil",
    "-",
    "--",
    "?",
    "not available",
    "not visible",
    "not identifiable",
    "unidentifiable",
    "cannot be determined",
];

/// Trim and collapse all internal whitespace, newlines included.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip markdown emphasis, quotes and trailing separators around a value.
pub fn strip_decoration(value: &str) -> &str {
    value
        .trim()
        .trim_end_matches(',')
        .trim_matches(|c: char| matches!(c, '*' | '_' | '`' | '"' | '\''))
        .trim()
}

pub fn is_unknown_marker(value: &str) -> bool {
    let v = value.trim().trim_end_matches('.');
    v.is_empty() || UNKNOWN_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(v))
}

/// Capitalize the first letter of every word, lowercase the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alnum = false;
    for c in value.chars() {
        if prev_alnum {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alnum = c.is_alphanumeric() || c == '\'';
    }
    out
}

/// Keep a SKU usable as a file name: separators and reserved characters
/// become `_`. Returns `None` when nothing usable is left.
pub fn sanitize_sku(value: &str) -> Option<String> {
    let cleaned: String = collapse_whitespace(value)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned)
    }
}

/// Normalize a raw value for `field`. `None` means "treat as unset".
pub fn normalize_value(field: Field, raw: &str) -> Option<String> {
    let value = collapse_whitespace(strip_decoration(raw));
    if is_unknown_marker(&value) {
        return None;
    }
    match field {
        Field::Brand | Field::Material | Field::Color => Some(title_case(&value)),
        Field::Sku => sanitize_sku(&value),
        _ => Some(value),
    }
}
