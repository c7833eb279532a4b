//! Comparison schema handed to the comparator, and nested column rules.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::bail;
use crate::error::{ContractResult, ErrorKind};

/// Suffix of column rule documents: `<collection>_<column>.schema.json`.
pub const COLUMN_RULE_SUFFIX: &str = ".schema.json";

/// Describes how the expected and actual records of one collection are compared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSchema {
    pub collection: String,
    /// Fields that must be present and non-null in the actual record.
    pub required_fields: Vec<String>,
    /// Fields whose absence from the actual record is not a failure.
    pub optional_fields: Vec<String>,
    /// Nested-value rules keyed by column name.
    pub rules: BTreeMap<String, ColumnRule>,
}

impl ComparisonSchema {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn is_optional(&self, column: &str) -> bool {
        self.optional_fields.iter().any(|field| field == column)
    }
}

/// Rule applied to a column holding a nested JSON value.
///
/// Paths are dot-separated object keys inside the nested value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnRule {
    /// Paths that must exist in the actual value.
    pub required: Vec<String>,
    /// Paths removed from both sides before comparing.
    #[serde(alias = "ignored")]
    pub ignore: Vec<String>,
    /// Compare arrays without regard to element order.
    pub unordered_arrays: bool,
}

/// Loads a column rule document. Any failure is fatal to the run.
pub fn load_column_rule(path: &Path) -> ContractResult<ColumnRule> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => bail!(
            ErrorKind::InvalidColumnRule,
            "Column rule could not be read",
            format!("{}: {err}", path.display()),
            source: err
        ),
    };

    match serde_json::from_str::<ColumnRule>(&content) {
        Ok(rule) => Ok(rule),
        Err(err) => bail!(
            ErrorKind::InvalidColumnRule,
            "Column rule is not valid",
            format!("{}: {err}", path.display()),
            source: err
        ),
    }
}

/// Returns `true` when an expected value holds, or is text that looks like, nested JSON.
pub fn looks_like_json(value: &Value) -> bool {
    match value {
        Value::Object(_) | Value::Array(_) => true,
        Value::String(s) => {
            let s = s.trim_start();
            s.starts_with('{') || s.starts_with('[')
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}
