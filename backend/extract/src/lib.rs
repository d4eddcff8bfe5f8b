//! Response parser: turns a vision model reply into a [`ProductRecord`].
//!
//! The reply format is not guaranteed, so parsing runs in two passes:
//! - strict: the first embedded JSON object whose keys resolve to fields
//! - line-based: `label: value` lines, unmatched lines kept as notes
//!
//! The outcome stays tagged with the pass that produced it.

pub mod aliases;
pub mod json_block;
pub mod normalize;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use skuforge_core::{Field, PipelineError, ProductRecord};
use tracing::debug;

use crate::normalize::{collapse_whitespace, normalize_value, strip_decoration};

/// Result of parsing one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Extracted from an embedded JSON object.
    Structured(ProductRecord),
    /// Extracted from `label: value` lines.
    LineBased(ProductRecord),
    /// Nothing recognizable; the raw reply is kept for inspection.
    Unparsable { raw: String },
}

impl ParseOutcome {
    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            ParseOutcome::Structured(r) | ParseOutcome::LineBased(r) => Some(r),
            ParseOutcome::Unparsable { .. } => None,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            ParseOutcome::Structured(_) => "structured",
            ParseOutcome::LineBased(_) => "line_based",
            ParseOutcome::Unparsable { .. } => "unparsable",
        }
    }

    pub fn into_record(self) -> Result<ProductRecord, PipelineError> {
        match self {
            ParseOutcome::Structured(r) | ParseOutcome::LineBased(r) => Ok(r),
            ParseOutcome::Unparsable { raw } => Err(PipelineError::UnparsableResponse { raw }),
        }
    }
}

/// Fields collected by one pass before they become a record.
#[derive(Default)]
struct Draft {
    values: Vec<(Field, String)>,
    extra_notes: Vec<String>,
    matched_keys: usize,
}

impl Draft {
    /// Record a value for a recognized key. The first real value wins the
    /// field; later values for a filled field are kept in the notes.
    fn offer(&mut self, field: Field, label: &str, raw: &str) {
        self.matched_keys += 1;
        let Some(value) = normalize_value(field, raw) else {
            return;
        };
        if !self.values.iter().any(|(f, _)| *f == field) {
            self.values.push((field, value));
        } else if field == Field::Notes {
            self.extra_notes.push(value);
        } else {
            let text = collapse_whitespace(strip_decoration(raw));
            self.extra_notes.push(format!("{}: {}", label_for(label), text));
        }
    }

    fn note(&mut self, text: impl Into<String>) {
        let text = collapse_whitespace(&text.into());
        if !text.is_empty() {
            self.extra_notes.push(text);
        }
    }

    /// Number of fields populated from recognized keys.
    fn populated(&self) -> usize {
        self.values.len()
    }

    fn into_record(self, default_sku: &str) -> ProductRecord {
        let mut record = ProductRecord::new(default_sku);
        let mut notes = Vec::new();
        for (field, value) in self.values {
            if field == Field::Notes {
                notes.push(value);
            } else {
                record.set(field, value);
            }
        }
        notes.extend(self.extra_notes);
        if !notes.is_empty() {
            record.set(Field::Notes, notes.join("; "));
        }
        record
    }
}

/// Parse a raw model reply. `default_sku` fills the SKU when the model gave none.
pub fn parse_response(raw: &str, default_sku: &str) -> ParseOutcome {
    if let Some(object) = json_block::first_json_object(raw) {
        let draft = structured_pass(&object);
        if draft.matched_keys > 0 {
            debug!(fields = draft.populated(), "Parsed model reply as JSON");
            return finish(draft, raw, default_sku, ParseOutcome::Structured);
        }
    }

    let draft = line_pass(raw);
    debug!(fields = draft.populated(), "Parsed model reply line by line");
    finish(draft, raw, default_sku, ParseOutcome::LineBased)
}

fn finish(
    draft: Draft,
    raw: &str,
    default_sku: &str,
    tag: fn(ProductRecord) -> ParseOutcome,
) -> ParseOutcome {
    if draft.populated() == 0 {
        return ParseOutcome::Unparsable { raw: raw.to_string() };
    }
    tag(draft.into_record(default_sku))
}

// ---------------------------------------------------------------------------
// Structured pass
// ---------------------------------------------------------------------------

fn structured_pass(object: &Map<String, Value>) -> Draft {
    let mut draft = Draft::default();
    for (key, value) in object {
        let text = value_text(value);
        match aliases::resolve(key) {
            Some(field) => draft.offer(field, key, &text),
            None if !normalize::is_unknown_marker(&text) => {
                draft.note(format!("{}: {}", label_for(key), text));
            }
            None => {}
        }
    }
    draft
}

/// Flatten a JSON value to display text.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|t| !normalize::is_unknown_marker(t))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k, value_text(v)))
            .filter(|(_, t)| !normalize::is_unknown_marker(t))
            .map(|(k, t)| format!("{}: {}", label_for(k), t))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// "sub_category" -> "Sub category"
fn label_for(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Line pass
// ---------------------------------------------------------------------------

static LIST_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•+]|\d{1,2}[.)]|#{1,6})\s+").unwrap());

const MAX_LABEL_CHARS: usize = 40;

fn line_pass(raw: &str) -> Draft {
    let mut draft = Draft::default();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") || matches!(line, "{" | "}" | "[" | "]") {
            continue;
        }
        match split_label(line) {
            Some((label, value)) => match aliases::resolve(label) {
                Some(field) => draft.offer(field, label, value),
                None => draft.note(strip_list_marker(line)),
            },
            None => draft.note(strip_list_marker(line)),
        }
    }
    draft
}

fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Split `**Label:** value` style lines into label and value.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let line = strip_list_marker(line);
    let colon = line.find([':', '：'])?;
    let label = strip_decoration(&line[..colon]);
    if label.is_empty() || label.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    let sep_len = line[colon..].chars().next().map(char::len_utf8).unwrap_or(1);
    Some((label, &line[colon + sep_len..]))
}
