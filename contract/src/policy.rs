//! Per-collection column policies.
//!
//! A single shared policy document, keyed by collection name, lists the fields that are
//! required, optional or ignored when comparing records of that collection.

use serde_json::{Map, Value};

use crate::normalize::{underscored, variants};
use crate::schema::ComparisonSchema;

/// One entry of the shared policy document.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyNode<'a> {
    /// The entry is an object.
    Single(&'a Map<String, Value>),
    /// The entry is a one-element list wrapping an object.
    Wrapped(&'a Map<String, Value>),
    /// Any other shape. Yields no policy.
    Unsupported,
}

impl<'a> From<&'a Value> for PolicyNode<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(object) => PolicyNode::Single(object),
            Value::Array(items) => match items.as_slice() {
                [Value::Object(object)] => PolicyNode::Wrapped(object),
                _ => PolicyNode::Unsupported,
            },
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                PolicyNode::Unsupported
            }
        }
    }
}

impl<'a> PolicyNode<'a> {
    fn object(&self) -> Option<&'a Map<String, Value>> {
        match self {
            PolicyNode::Single(object) | PolicyNode::Wrapped(object) => Some(object),
            PolicyNode::Unsupported => None,
        }
    }
}

/// Required, optional and ignored fields of one collection.
///
/// Field names are stored with underscores as separator and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPolicy {
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub ignore: Vec<String>,
}

impl ColumnPolicy {
    /// Extracts the policy of `collection` from the shared policy document.
    ///
    /// A missing key or an unsupported entry shape yields an empty policy.
    pub fn from_document(document: &Value, collection: &str) -> Self {
        let Some(object) = document
            .get(collection)
            .map(PolicyNode::from)
            .and_then(|node| node.object())
        else {
            return ColumnPolicy::default();
        };

        let mut ignore = field_list(object, "ignore");
        ignore.extend(field_list(object, "ignored"));

        ColumnPolicy {
            required: dedup(field_list(object, "required")),
            optional: dedup(field_list(object, "optional")),
            ignore: dedup(ignore),
        }
    }

    /// Returns `true` if the policy has no rules at all.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty() && self.ignore.is_empty()
    }

    /// Appends the required and optional fields that the schema does not list yet.
    pub fn merge_into(&self, schema: &mut ComparisonSchema) {
        for field in &self.required {
            if !schema.required_fields.contains(field) {
                schema.required_fields.push(field.clone());
            }
        }
        for field in &self.optional {
            if !schema.optional_fields.contains(field) {
                schema.optional_fields.push(field.clone());
            }
        }
    }

    /// Returns a copy of the row without the ignored fields, under every separator variant.
    pub fn strip_ignored(&self, row: &Map<String, Value>) -> Map<String, Value> {
        let mut out = row.clone();
        for field in &self.ignore {
            for variant in variants(field) {
                out.shift_remove(&variant);
            }
        }

        out
    }
}

fn field_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(underscored)
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }

    out
}
