use serde_json::Value;
use std::cmp::Ordering;

use crate::compare::Comparator;
use crate::normalize::{canonical, variants};
use crate::schema::{ColumnRule, ComparisonSchema, looks_like_json};
use crate::types::{ColumnResult, Record, Status, ValidationReport};

/// Relative tolerance for numeric comparison.
const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Column by column comparator.
///
/// Every expected column is looked up in the fetched record by its exact name, then by its
/// separator variants and finally by a case-insensitive canonical match. When several records
/// were fetched, the one with the fewest failing columns is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldComparator;

impl FieldComparator {
    pub fn new() -> Self {
        Self
    }

    fn compare_record(
        &self,
        actual: &Record,
        expected: &Record,
        schema: &ComparisonSchema,
    ) -> Vec<ColumnResult> {
        let mut results = Vec::with_capacity(expected.len());

        for (column, expected_value) in expected {
            let result = match locate(actual, column) {
                Some(actual_value) => {
                    compare_values(column, expected_value, actual_value, schema.rules.get(column))
                }
                None if expected_value.is_null() => ColumnResult::pass(column, None, None),
                None if schema.is_optional(column) => ColumnResult::skipped(
                    column,
                    display(expected_value),
                    "optional column not present in actual record",
                ),
                None => ColumnResult::fail(
                    column,
                    display(expected_value),
                    None,
                    "column not present in actual record",
                ),
            };
            results.push(result);
        }

        for field in &schema.required_fields {
            if locate(expected, field).is_some() {
                continue;
            }

            let result = match locate(actual, field) {
                Some(value) if !value.is_null() => ColumnResult::pass(field, None, display(value)),
                _ => ColumnResult::fail(
                    field,
                    None,
                    None,
                    "required column missing or null in actual record",
                ),
            };
            results.push(result);
        }

        results
    }
}

impl Comparator for FieldComparator {
    fn compare(
        &self,
        source: &str,
        event_id: &str,
        collection: &str,
        actual: &[Record],
        expected: &Record,
        schema: &ComparisonSchema,
    ) -> ValidationReport {
        let best = actual
            .iter()
            .map(|candidate| self.compare_record(candidate, expected, schema))
            .min_by_key(|results| {
                results
                    .iter()
                    .filter(|result| result.status == Status::Fail)
                    .count()
            });

        match best {
            Some(results) => ValidationReport::new(source, event_id, collection, results, vec![]),
            None => ValidationReport::new(
                source,
                event_id,
                collection,
                vec![],
                vec![format!("no records found in {collection} for the lookup criteria")],
            ),
        }
    }
}

/// Finds the value of `column` in `record`.
fn locate<'a>(record: &'a Record, column: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(column) {
        return Some(value);
    }
    if let Some(value) = variants(column).iter().find_map(|variant| record.get(variant)) {
        return Some(value);
    }

    let wanted = canonical(column);
    record
        .iter()
        .find(|(key, _)| canonical(key) == wanted)
        .map(|(_, value)| value)
}

fn compare_values(
    column: &str,
    expected: &Value,
    actual: &Value,
    rule: Option<&ColumnRule>,
) -> ColumnResult {
    let shown_expected = display(expected);
    let shown_actual = display(actual);

    match (expected.is_null(), actual.is_null()) {
        (true, true) => return ColumnResult::pass(column, None, None),
        (true, false) => {
            return ColumnResult::fail(column, None, shown_actual, "expected null");
        }
        (false, true) => {
            return ColumnResult::fail(column, shown_expected, None, "actual value is null");
        }
        (false, false) => {}
    }

    if rule.is_some() || (looks_like_json(expected) && looks_like_json(actual)) {
        return match compare_json(expected, actual, rule) {
            Ok(()) => ColumnResult::pass(column, shown_expected, shown_actual),
            Err(reason) => ColumnResult::fail(column, shown_expected, shown_actual, reason),
        };
    }

    let expected_text = shown_expected.unwrap_or_default();
    let actual_text = shown_actual.unwrap_or_default();

    let equal = match (as_number(&expected_text), as_number(&actual_text)) {
        (Some(e), Some(a)) => numbers_equal(e, a),
        _ => expected_text.trim() == actual_text.trim(),
    };

    if equal {
        ColumnResult::pass(column, Some(expected_text), Some(actual_text))
    } else {
        ColumnResult::fail(column, Some(expected_text), Some(actual_text), "value mismatch")
    }
}

/// Compares two nested values, applying the column rule if any.
fn compare_json(expected: &Value, actual: &Value, rule: Option<&ColumnRule>) -> Result<(), String> {
    let mut expected = parse_nested(expected).ok_or("expected value is not valid JSON")?;
    let mut actual = parse_nested(actual).ok_or("actual value is not valid JSON")?;

    let unordered = rule.is_some_and(|rule| rule.unordered_arrays);
    if let Some(rule) = rule {
        for path in &rule.required {
            if !path_exists(&actual, &split_path(path)) {
                return Err(format!("required path `{path}` missing in actual value"));
            }
        }
        for path in &rule.ignore {
            let segments = split_path(path);
            remove_path(&mut expected, &segments);
            remove_path(&mut actual, &segments);
        }
    }

    if unordered {
        sort_arrays(&mut expected);
        sort_arrays(&mut actual);
    }

    if expected == actual {
        Ok(())
    } else {
        Err("nested value mismatch".to_string())
    }
}

fn parse_nested(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) => serde_json::from_str(text.trim()).ok(),
        other => Some(other.clone()),
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|segment| !segment.is_empty()).collect()
}

fn path_exists(value: &Value, segments: &[&str]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return true;
    };

    match value {
        Value::Object(object) => object
            .get(*head)
            .is_some_and(|child| path_exists(child, rest)),
        Value::Array(items) => items.iter().any(|item| path_exists(item, segments)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

fn remove_path(value: &mut Value, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    match value {
        Value::Object(object) => {
            if rest.is_empty() {
                object.shift_remove(*head);
            } else if let Some(child) = object.get_mut(*head) {
                remove_path(child, rest);
            }
        }
        Value::Array(items) => {
            for item in items {
                remove_path(item, segments);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn sort_arrays(value: &mut Value) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                sort_arrays(item);
            }
            items.sort_by_cached_key(|item| item.to_string());
        }
        Value::Object(object) => {
            for child in object.values_mut() {
                sort_arrays(child);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn as_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn numbers_equal(a: f64, b: f64) -> bool {
    match a.partial_cmp(&b) {
        Some(Ordering::Equal) => true,
        _ => (a - b).abs() <= NUMERIC_TOLERANCE * a.abs().max(b.abs()).max(1.0),
    }
}

/// Renders a value for reports. Null has no rendering.
fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
