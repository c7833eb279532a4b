//! Canonicalisation of identifier spellings.
//!
//! Configuration documents, payloads and fixture files spell the same column in different
//! ways (`order-id`, `order_id`, `ORDER_ID`). Everything that compares names goes through
//! this module so that the spellings agree.

use serde_json::{Map, Value};

/// Returns the canonical form of a column name: trimmed, lower-cased, hyphens replaced by
/// underscores.
pub fn canonical(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Replaces hyphens with underscores, preserving case.
pub fn underscored(name: &str) -> String {
    name.trim().replace('-', "_")
}

/// Returns the distinct surface variants of a name: original, underscored, hyphenated.
///
/// The original spelling always comes first so an exact key wins over a converted one.
pub fn variants(name: &str) -> Vec<String> {
    let original = name.trim();
    let mut out: Vec<String> = Vec::with_capacity(3);

    for candidate in [
        original.to_string(),
        original.replace('-', "_"),
        original.replace('_', "-"),
    ] {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }

    out
}

/// Semantic role of an identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdRole {
    /// The column carries the event identifier.
    EventId,
    /// The column carries the order identifier.
    OrderId,
}

impl IdRole {
    /// Classifies a column name by its canonical spelling.
    pub fn of(column: &str) -> Option<IdRole> {
        match canonical(column).as_str() {
            "id" | "event_id" | "eventid" => Some(IdRole::EventId),
            "orderid" | "order_id" => Some(IdRole::OrderId),
            _ => None,
        }
    }
}

/// Returns the comparable text of a JSON scalar, or [`None`] when there is none.
///
/// Strings are trimmed; numbers and booleans are rendered. Null, arrays and objects carry no
/// identifier text. Empty text is reported as [`None`] since empty means absent.
pub fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    if text.is_empty() { None } else { Some(text) }
}

/// Returns the first non-empty text found under any of the given keys.
pub fn first_text<'a, I>(object: &Map<String, Value>, keys: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .find_map(|key| object.get(key).and_then(text_value))
}

/// Returns the row's value at `column`, probing every surface variant of the name.
pub fn probe(row: &Map<String, Value>, column: &str) -> Option<String> {
    let variants = variants(column);
    first_text(row, variants.iter().map(String::as_str))
}

/// Returns `true` when the row has a key under any variant of any of the given names.
pub fn has_any_variant(row: &Map<String, Value>, names: &[&str]) -> bool {
    names
        .iter()
        .flat_map(|name| variants(name))
        .any(|variant| row.contains_key(&variant))
}
