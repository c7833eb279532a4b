use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::normalize::{first_text, text_value};

/// Spellings under which a payload object may carry its event identifier, in priority order.
const EVENT_ID_KEYS: [&str; 3] = ["event-id", "id", "event_id"];

/// Spellings under which a payload object may carry its order identifier, in priority order.
const ORDER_ID_KEYS: [&str; 3] = ["order-id", "orderid", "order_id"];

/// Parent object holding the nested order identifier fallback.
const NESTED_ORDER_PARENT: &str = "data";

/// Key of the nested order identifier fallback.
const NESTED_ORDER_KEY: &str = "orderId";

/// A business record found in the payload.
///
/// An empty identifier means the payload did not carry it. At least one of the two is
/// always non-empty for extracted records. Records cannot be changed once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadRecord {
    event_id: String,
    order_id: String,
}

impl PayloadRecord {
    /// Creates a new record, trimming both identifiers.
    pub fn new(event_id: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into().trim().to_string(),
            order_id: order_id.into().trim().to_string(),
        }
    }

    /// Returns the event identifier if the payload carried one.
    pub fn event_id(&self) -> Option<&str> {
        (!self.event_id.is_empty()).then_some(self.event_id.as_str())
    }

    /// Returns the order identifier if the payload carried one.
    pub fn order_id(&self) -> Option<&str> {
        (!self.order_id.is_empty()).then_some(self.order_id.as_str())
    }
}

/// Identifiers seen anywhere in the payload, used to pre-filter fixture rows.
#[derive(Debug, Clone, Default)]
pub struct PayloadIds {
    pub event_ids: HashSet<String>,
    pub order_ids: HashSet<String>,
}

impl PayloadIds {
    /// Collects the identifier sets of all records.
    pub fn collect(records: &[PayloadRecord]) -> Self {
        let mut ids = PayloadIds::default();
        for record in records {
            if let Some(event_id) = record.event_id() {
                ids.event_ids.insert(event_id.to_string());
            }
            if let Some(order_id) = record.order_id() {
                ids.order_ids.insert(order_id.to_string());
            }
        }

        ids
    }
}

/// Extracts business records from an arbitrarily nested payload.
///
/// Arrays are flattened depth-first in order. Every object yields at most one record and
/// objects are not descended into. Duplicates are kept: each occurrence drives its own
/// scenario.
pub fn extract(root: &Value) -> Vec<PayloadRecord> {
    let mut records = Vec::new();
    collect(root, &mut records);
    records
}

fn collect(node: &Value, records: &mut Vec<PayloadRecord>) {
    match node {
        Value::Array(children) => {
            for child in children {
                collect(child, records);
            }
        }
        Value::Object(object) => {
            if let Some(record) = record_from_object(object) {
                records.push(record);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn record_from_object(object: &Map<String, Value>) -> Option<PayloadRecord> {
    let event_id = first_text(object, EVENT_ID_KEYS).unwrap_or_default();
    let order_id = first_text(object, ORDER_ID_KEYS)
        .or_else(|| nested_order_id(object))
        .unwrap_or_default();

    if event_id.is_empty() && order_id.is_empty() {
        return None;
    }

    Some(PayloadRecord::new(event_id, order_id))
}

fn nested_order_id(object: &Map<String, Value>) -> Option<String> {
    object
        .get(NESTED_ORDER_PARENT)
        .and_then(Value::as_object)
        .and_then(|parent| parent.get(NESTED_ORDER_KEY))
        .and_then(text_value)
}
