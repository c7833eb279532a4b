use serde_json::{Map, Value};
use std::fmt;

use crate::lookup::LookupDescriptor;
use crate::normalize::{IdRole, probe};
use crate::payload::PayloadRecord;

/// Ordered column to value criteria used to query one collection.
///
/// Values are never empty. Order follows the lookup descriptor, which keeps the generated
/// query and the diagnostics deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupCriteria {
    entries: Vec<(String, String)>,
}

impl LookupCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column unless it is already present or the value is blank.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        if value.trim().is_empty() || self.get(&column).is_some() {
            return;
        }

        self.entries.push((column, value));
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LookupCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (column, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}={value}")?;
        }
        f.write_str("}")
    }
}

/// Builds the lookup criteria for one (payload record, fixture row) pair.
///
/// For every descriptor column the payload supplies the value when the column carries an
/// identifier the record has; otherwise the fixture row's value is used. When nothing
/// resolves, only the role columns are retried. An empty result means the pair cannot be
/// looked up.
pub fn build(
    descriptor: &LookupDescriptor,
    record: &PayloadRecord,
    row: &Map<String, Value>,
) -> LookupCriteria {
    let mut criteria = LookupCriteria::new();
    for column in descriptor.columns() {
        if let Some(value) = resolve_value(column, record, row) {
            criteria.insert(column.as_str(), value);
        }
    }

    if criteria.is_empty() {
        for column in [descriptor.id_column(), descriptor.order_id_column()]
            .into_iter()
            .flatten()
        {
            if let Some(value) = resolve_value(column, record, row) {
                criteria.insert(column, value);
            }
        }
    }

    criteria
}

fn resolve_value(column: &str, record: &PayloadRecord, row: &Map<String, Value>) -> Option<String> {
    let from_payload = match IdRole::of(column) {
        Some(IdRole::EventId) => record.event_id(),
        Some(IdRole::OrderId) => record.order_id(),
        None => None,
    };

    from_payload
        .map(str::to_string)
        .or_else(|| probe(row, column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_payload_supplies_both_roles() {
        let descriptor = LookupDescriptor::resolve(
            Some(&json!({"idColumn": "id", "orderIdColumn": "order_id"})),
            None,
            None,
        );
        let record = PayloadRecord::new("E1", "O9");
        let row = row(json!({"id": "E1", "order_id": "stale", "amount": "10"}));

        let criteria = build(&descriptor, &record, &row);

        assert_eq!(criteria.to_string(), "{id=E1, order_id=O9}");
    }

    #[test]
    fn test_row_fills_missing_payload_identifier() {
        let descriptor = LookupDescriptor::resolve(None, None, None);
        let record = PayloadRecord::new("E1", "");
        let row = row(json!({"id": "E1", "orderid": "O3"}));

        let criteria = build(&descriptor, &record, &row);

        assert_eq!(criteria.iter().collect::<Vec<_>>(), [("id", "E1"), ("orderid", "O3")]);
    }

    #[test]
    fn test_non_role_columns_come_from_row_variants() {
        let descriptor = LookupDescriptor::resolve(Some(&json!(["tenant-code", "id"])), None, None);
        let record = PayloadRecord::new("E1", "");
        let row = row(json!({"tenant_code": "T1"}));

        let criteria = build(&descriptor, &record, &row);

        assert_eq!(criteria.to_string(), "{tenant-code=T1, id=E1}");
    }

    #[test]
    fn test_unresolved_columns_are_skipped_never_blank() {
        let descriptor = LookupDescriptor::resolve(Some(&json!(["sku", "batch"])), None, None);
        let record = PayloadRecord::new("E1", "O1");
        let row = row(json!({"sku": "  ", "batch": null, "other": "x"}));

        let criteria = build(&descriptor, &record, &row);

        assert!(criteria.is_empty());
        assert_eq!(criteria.values().filter(|v| v.is_empty()).count(), 0);
    }

    #[test]
    fn test_empty_record_and_no_overlap_yields_empty_criteria() {
        let descriptor = LookupDescriptor::resolve(None, None, None);
        let record = PayloadRecord::new("", "");
        let row = row(json!({"amount": "10"}));

        assert!(build(&descriptor, &record, &row).is_empty());
    }

    #[test]
    fn test_insert_ignores_blank_and_duplicate_columns() {
        let mut criteria = LookupCriteria::new();
        criteria.insert("id", "E1");
        criteria.insert("id", "E2");
        criteria.insert("orderid", " ");

        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria.get("id"), Some("E1"));
    }
}
