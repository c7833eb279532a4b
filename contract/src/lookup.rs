//! Resolution of the columns used to look a record up in the backing store.
//!
//! A [`LookupDescriptor`] is derived per collection from, in order, the per-collection lookup
//! document, the global lookup document, a sample fixture row and finally the built-in
//! defaults. Column lists accumulate across sources while the role slots keep the first
//! value that was set.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::normalize::{IdRole, canonical, has_any_variant};

/// Columns used when no configuration contributed any.
pub const DEFAULT_LOOKUP_COLUMNS: [&str; 2] = ["id", "orderid"];

/// Event-id spellings probed on a sample fixture row.
const SAMPLE_EVENT_KEYS: [&str; 2] = ["id", "event_id"];

/// Order-id spellings probed on a sample fixture row.
const SAMPLE_ORDER_KEYS: [&str; 2] = ["orderid", "order_id"];

/// One lookup configuration node as written in a lookup document.
///
/// Lookup documents accept a bare column name, a list of column names or an object with
/// explicit role columns. Everything else is unsupported and contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupNode {
    /// A single column name.
    Column(String),
    /// A list of column names. Non-string entries are dropped on conversion.
    Columns(Vec<String>),
    /// An object with optional role columns and extra columns.
    Spec {
        id_column: Option<String>,
        order_id_column: Option<String>,
        columns: Vec<String>,
    },
    /// A node of any other shape.
    Unsupported,
}

impl From<&Value> for LookupNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(name) => match non_empty(name) {
                Some(name) => LookupNode::Column(name),
                None => LookupNode::Unsupported,
            },
            Value::Array(items) => LookupNode::Columns(string_items(items)),
            Value::Object(object) => LookupNode::Spec {
                id_column: object.get("idColumn").and_then(scalar_name),
                order_id_column: object.get("orderIdColumn").and_then(scalar_name),
                columns: object
                    .get("columns")
                    .and_then(Value::as_array)
                    .map(|items| string_items(items))
                    .unwrap_or_default(),
            },
            Value::Null | Value::Bool(_) | Value::Number(_) => LookupNode::Unsupported,
        }
    }
}

/// The resolved lookup columns of one collection and their semantic roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupDescriptor {
    columns: Vec<String>,
    id_column: Option<String>,
    order_id_column: Option<String>,
}

impl LookupDescriptor {
    /// Resolves a descriptor from the available sources.
    ///
    /// `per_collection` is the content of the collection's own lookup document, `global` the
    /// entry for this collection in the global lookup document. `sample` is consulted only when
    /// neither contributed a column. Never fails: with nothing configured the defaults apply.
    pub fn resolve(
        per_collection: Option<&Value>,
        global: Option<&Value>,
        sample: Option<&Map<String, Value>>,
    ) -> Self {
        let mut builder = DescriptorBuilder::default();

        for node in [per_collection, global].into_iter().flatten() {
            builder.apply(LookupNode::from(node));
        }

        if builder.columns.is_empty() {
            if let Some(row) = sample {
                if has_any_variant(row, &SAMPLE_EVENT_KEYS) {
                    builder.columns.push(DEFAULT_LOOKUP_COLUMNS[0].to_string());
                }
                if has_any_variant(row, &SAMPLE_ORDER_KEYS) {
                    builder.columns.push(DEFAULT_LOOKUP_COLUMNS[1].to_string());
                }
            }
        }

        if builder.columns.is_empty() {
            builder
                .columns
                .extend(DEFAULT_LOOKUP_COLUMNS.iter().map(|c| c.to_string()));
        }

        builder.finish()
    }

    /// Returns the lookup columns in resolution order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the column carrying the event identifier, if any.
    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    /// Returns the column carrying the order identifier, if any.
    pub fn order_id_column(&self) -> Option<&str> {
        self.order_id_column.as_deref()
    }

    /// Returns the columns that map to a payload identifier, with their roles.
    pub fn mapped_columns(&self) -> impl Iterator<Item = (&str, IdRole)> {
        self.columns
            .iter()
            .filter_map(|column| IdRole::of(column).map(|role| (column.as_str(), role)))
    }
}

impl fmt::Display for LookupDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.columns.join(", "))
    }
}

#[derive(Debug, Default)]
struct DescriptorBuilder {
    columns: Vec<String>,
    id_column: Option<String>,
    order_id_column: Option<String>,
}

impl DescriptorBuilder {
    fn apply(&mut self, node: LookupNode) {
        match node {
            LookupNode::Column(column) => self.columns.push(column),
            LookupNode::Columns(columns) => self.columns.extend(columns),
            LookupNode::Spec {
                id_column,
                order_id_column,
                columns,
            } => {
                if let Some(column) = id_column {
                    self.id_column.get_or_insert_with(|| column.clone());
                    self.columns.push(column);
                }
                if let Some(column) = order_id_column {
                    self.order_id_column.get_or_insert_with(|| column.clone());
                    self.columns.push(column);
                }
                self.columns.extend(columns);
            }
            LookupNode::Unsupported => {}
        }
    }

    fn finish(self) -> LookupDescriptor {
        let mut seen = HashSet::new();
        let columns: Vec<String> = self
            .columns
            .into_iter()
            .filter(|column| seen.insert(canonical(column)))
            .collect();

        let mut id_column = self.id_column;
        let mut order_id_column = self.order_id_column;
        for column in &columns {
            match IdRole::of(column) {
                Some(IdRole::EventId) if id_column.is_none() => id_column = Some(column.clone()),
                Some(IdRole::OrderId) if order_id_column.is_none() => {
                    order_id_column = Some(column.clone())
                }
                _ => {}
            }
        }

        LookupDescriptor {
            columns,
            id_column,
            order_id_column,
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(non_empty)
        .collect()
}

fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => non_empty(name),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_without_configuration() {
        let descriptor = LookupDescriptor::resolve(None, None, None);

        assert_eq!(descriptor.columns(), ["id", "orderid"]);
        assert_eq!(descriptor.id_column(), Some("id"));
        assert_eq!(descriptor.order_id_column(), Some("orderid"));
    }

    #[test]
    fn test_node_shapes() {
        assert_eq!(
            LookupNode::from(&json!(" order_ref ")),
            LookupNode::Column("order_ref".to_string())
        );
        assert_eq!(
            LookupNode::from(&json!(["a", 1, " ", "b"])),
            LookupNode::Columns(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(LookupNode::from(&json!(12)), LookupNode::Unsupported);
        assert_eq!(LookupNode::from(&json!("")), LookupNode::Unsupported);
    }

    #[test]
    fn test_object_node_sets_roles() {
        let descriptor = LookupDescriptor::resolve(
            Some(&json!({"idColumn": "id", "orderIdColumn": "order_id"})),
            None,
            None,
        );

        assert_eq!(descriptor.columns(), ["id", "order_id"]);
        assert_eq!(descriptor.id_column(), Some("id"));
        assert_eq!(descriptor.order_id_column(), Some("order_id"));
    }

    #[test]
    fn test_sources_accumulate_and_first_role_wins() {
        let descriptor = LookupDescriptor::resolve(
            Some(&json!({"idColumn": "event_ref", "columns": ["tenant"]})),
            Some(&json!({"idColumn": "event_id", "columns": ["order-id", "tenant"]})),
            None,
        );

        assert_eq!(
            descriptor.columns(),
            ["event_ref", "tenant", "event_id", "order-id"]
        );
        assert_eq!(descriptor.id_column(), Some("event_ref"));
        assert_eq!(descriptor.order_id_column(), Some("order-id"));
    }

    #[test]
    fn test_dedup_by_canonical_form_keeps_first_spelling() {
        let descriptor =
            LookupDescriptor::resolve(Some(&json!(["order_id", "Order-Id", "id"])), None, None);

        assert_eq!(descriptor.columns(), ["order_id", "id"]);
    }

    #[test]
    fn test_sample_row_inference() {
        let row = json!({"event-id": "E1", "amount": 3});
        let descriptor = LookupDescriptor::resolve(None, None, row.as_object());
        assert_eq!(descriptor.columns(), ["id"]);

        let row = json!({"order_id": "O1"});
        let descriptor = LookupDescriptor::resolve(None, None, row.as_object());
        assert_eq!(descriptor.columns(), ["orderid"]);
        assert_eq!(descriptor.id_column(), None);
    }

    #[test]
    fn test_sample_ignored_when_configured() {
        let row = json!({"id": "E1", "order_id": "O1"});
        let descriptor = LookupDescriptor::resolve(Some(&json!("sku")), None, row.as_object());

        assert_eq!(descriptor.columns(), ["sku"]);
        assert_eq!(descriptor.mapped_columns().count(), 0);
    }

    #[test]
    fn test_unsupported_configuration_falls_back_to_defaults() {
        let descriptor = LookupDescriptor::resolve(Some(&json!(true)), Some(&json!([])), None);
        assert_eq!(descriptor.columns(), ["id", "orderid"]);
    }
}
