//! Run-scoped configuration access and memoisation.
//!
//! Every verification run owns one [`RunContext`]. It reads the lookup, policy and column rule
//! documents from the schema directory lazily and caches what it resolves, so each collection
//! is resolved at most once per run and concurrent runs never share state.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::bail;
use crate::error::{ContractResult, ErrorKind};
use crate::lookup::LookupDescriptor;
use crate::policy::ColumnPolicy;
use crate::schema::{COLUMN_RULE_SUFFIX, ColumnRule, load_column_rule};

/// Suffix of per-collection lookup documents: `<collection>_lookup.json`.
const LOOKUP_FILE_SUFFIX: &str = "_lookup.json";

/// Global lookup document keyed by collection name.
const GLOBAL_LOOKUP_FILE: &str = "lookup.json";

/// Shared column policy document keyed by collection name.
const POLICY_FILE: &str = "table_columns.json";

#[derive(Debug)]
pub struct RunContext {
    schema_dir: PathBuf,
    infer_lookup_from_fixture: bool,
    global_lookup: Option<Option<Value>>,
    policy_document: Option<Option<Value>>,
    lookup_descriptors: HashMap<String, LookupDescriptor>,
    column_policies: HashMap<String, ColumnPolicy>,
    column_rules: HashMap<PathBuf, ColumnRule>,
}

impl RunContext {
    pub fn new(schema_dir: impl Into<PathBuf>, infer_lookup_from_fixture: bool) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            infer_lookup_from_fixture,
            global_lookup: None,
            policy_document: None,
            lookup_descriptors: HashMap::new(),
            column_policies: HashMap::new(),
            column_rules: HashMap::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Returns the lookup descriptor of `collection`, resolving it on first use.
    ///
    /// `sample` is only consulted when fixture inference is enabled for the run. Lookup
    /// documents that exist but cannot be parsed are a configuration error. The descriptor
    /// always has at least one column.
    pub fn lookup_descriptor(
        &mut self,
        collection: &str,
        sample: Option<&Map<String, Value>>,
    ) -> ContractResult<LookupDescriptor> {
        if let Some(descriptor) = self.lookup_descriptors.get(collection) {
            return Ok(descriptor.clone());
        }

        let per_collection =
            read_document(&self.schema_dir.join(format!("{collection}{LOOKUP_FILE_SUFFIX}")))?;

        if self.global_lookup.is_none() {
            self.global_lookup = Some(read_document(&self.schema_dir.join(GLOBAL_LOOKUP_FILE))?);
        }
        let global = self
            .global_lookup
            .as_ref()
            .and_then(Option::as_ref)
            .and_then(|root| root.as_object())
            .and_then(|root| root.get(collection));

        let sample = sample.filter(|_| self.infer_lookup_from_fixture);
        let descriptor = LookupDescriptor::resolve(per_collection.as_ref(), global, sample);

        debug_assert!(
            !descriptor.columns().is_empty(),
            "lookup resolution always falls back to the default columns"
        );

        debug!(collection, columns = %descriptor, "resolved lookup descriptor");
        self.lookup_descriptors
            .insert(collection.to_string(), descriptor.clone());

        Ok(descriptor)
    }

    /// Returns the column policy of `collection`, resolving it on first use.
    ///
    /// Problems with the shared policy document are logged and degrade to an empty policy.
    pub fn column_policy(&mut self, collection: &str) -> ColumnPolicy {
        if let Some(policy) = self.column_policies.get(collection) {
            return policy.clone();
        }

        if self.policy_document.is_none() {
            let path = self.schema_dir.join(POLICY_FILE);
            let document = read_document(&path).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "failed to load table policy, continuing without it");
                None
            });
            self.policy_document = Some(document);
        }

        let policy = self
            .policy_document
            .as_ref()
            .and_then(Option::as_ref)
            .map(|document| ColumnPolicy::from_document(document, collection))
            .unwrap_or_default();

        self.column_policies
            .insert(collection.to_string(), policy.clone());

        policy
    }

    /// Returns the rule for a nested column if a rule document exists for it.
    ///
    /// Rules are cached by path. A rule document that exists but fails to load is fatal.
    pub fn column_rule(
        &mut self,
        collection: &str,
        column: &str,
    ) -> ContractResult<Option<ColumnRule>> {
        let path = self
            .schema_dir
            .join(format!("{collection}_{column}{COLUMN_RULE_SUFFIX}"));

        if let Some(rule) = self.column_rules.get(&path) {
            return Ok(Some(rule.clone()));
        }
        if !path.is_file() {
            return Ok(None);
        }

        let rule = load_column_rule(&path)?;
        self.column_rules.insert(path, rule.clone());

        Ok(Some(rule))
    }
}

/// Reads an optional JSON document. A missing file is not an error.
fn read_document(path: &Path) -> ContractResult<Option<Value>> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => bail!(
            ErrorKind::ConfigError,
            "Configuration document could not be read",
            path.display(),
            source: err
        ),
    };

    match serde_json::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(err) => bail!(
            ErrorKind::ConfigError,
            "Configuration document is not valid JSON",
            format!("{}: {err}", path.display()),
            source: err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_lookup_without_documents_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = RunContext::new(dir.path(), false);

        let descriptor = ctx.lookup_descriptor("orders", None).unwrap();

        assert_eq!(descriptor.columns(), ["id", "orderid"]);
    }

    #[test]
    fn test_lookup_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "orders_lookup.json", r#"{"orderIdColumn": "order_ref", "columns": ["id"]}"#);
        let mut ctx = RunContext::new(dir.path(), false);

        let first = ctx.lookup_descriptor("orders", None).unwrap();
        // The document is gone but the cached descriptor is still served.
        fs::remove_file(dir.path().join("orders_lookup.json")).unwrap();
        let second = ctx.lookup_descriptor("orders", None).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.columns(), ["order_ref", "id"]);
        assert_eq!(second.order_id_column(), Some("order_ref"));
        assert_eq!(second.id_column(), Some("id"));
    }

    #[test]
    fn test_lookup_reads_global_document_entry() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lookup.json", r#"{"payments": ["payment_ref"], "orders": "order_id"}"#);
        let mut ctx = RunContext::new(dir.path(), false);

        assert_eq!(ctx.lookup_descriptor("orders", None).unwrap().columns(), ["order_id"]);
        assert_eq!(
            ctx.lookup_descriptor("payments", None).unwrap().columns(),
            ["payment_ref"]
        );
        assert_eq!(
            ctx.lookup_descriptor("refunds", None).unwrap().columns(),
            ["id", "orderid"]
        );
    }

    #[test]
    fn test_sample_only_used_when_inference_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let row = json!({"order_id": "O1"});

        let mut ctx = RunContext::new(dir.path(), false);
        assert_eq!(
            ctx.lookup_descriptor("orders", row.as_object()).unwrap().columns(),
            ["id", "orderid"]
        );

        let mut ctx = RunContext::new(dir.path(), true);
        assert_eq!(
            ctx.lookup_descriptor("orders", row.as_object()).unwrap().columns(),
            ["orderid"]
        );
    }

    #[test]
    fn test_unusable_lookup_documents_still_resolve_columns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "orders_lookup.json", r#"{"idColumn": null, "columns": [1, " "]}"#);
        write(dir.path(), "lookup.json", r#"{"orders": [], "payments": 42}"#);
        let mut ctx = RunContext::new(dir.path(), true);

        for collection in ["orders", "payments"] {
            let descriptor = ctx
                .lookup_descriptor(collection, json!({"amount": 1}).as_object())
                .unwrap();
            assert_eq!(descriptor.columns(), ["id", "orderid"]);
        }
    }

    #[test]
    fn test_invalid_lookup_document_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "orders_lookup.json", "{ nope");
        let mut ctx = RunContext::new(dir.path(), false);

        let err = ctx.lookup_descriptor("orders", None).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn test_invalid_policy_document_degrades_to_no_policy() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "table_columns.json", "[[[");
        let mut ctx = RunContext::new(dir.path(), false);

        assert!(ctx.column_policy("orders").is_empty());
    }

    #[test]
    fn test_policy_resolution() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "table_columns.json", r#"{"orders": {"ignore": ["amount"]}}"#);
        let mut ctx = RunContext::new(dir.path(), false);

        assert_eq!(ctx.column_policy("orders").ignore, ["amount"]);
        assert!(ctx.column_policy("payments").is_empty());
    }

    #[test]
    fn test_column_rule_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "orders_items.schema.json", r#"{"ignore": ["ts"]}"#);
        let mut ctx = RunContext::new(dir.path(), false);

        let rule = ctx.column_rule("orders", "items").unwrap().unwrap();
        assert_eq!(rule.ignore, ["ts"]);
        assert!(ctx.column_rule("orders", "meta").unwrap().is_none());
    }
}
