use contract::compare::FieldComparator;
use contract::error::ErrorKind;
use contract::fetch::memory::MemoryFetcher;
use contract::types::{Record, Status};
use contract::verifier::{Verifier, VerifierSettings};
use contract_telemetry::tracing::init_test_tracing;
use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;

/// Directory layout of a verification run inside a temporary directory.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(payload: Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("expected")).unwrap();
        fs::create_dir_all(dir.path().join("schemas")).unwrap();
        fs::write(dir.path().join("payload.json"), payload.to_string()).unwrap();

        Self { dir }
    }

    fn expected(&self, collection: &str, rows: Value) -> &Self {
        fs::write(
            self.dir
                .path()
                .join("expected")
                .join(format!("{collection}_expected_data.json")),
            rows.to_string(),
        )
        .unwrap();
        self
    }

    fn schema_file(&self, name: &str, content: &str) -> &Self {
        fs::write(self.dir.path().join("schemas").join(name), content).unwrap();
        self
    }

    fn report_dir(&self) -> PathBuf {
        self.dir.path().join("reports")
    }

    fn verifier(&self, fetcher: &MemoryFetcher) -> Verifier<MemoryFetcher, FieldComparator> {
        let mut settings = VerifierSettings::new(
            self.dir.path().join("payload.json"),
            self.dir.path().join("expected"),
            self.dir.path().join("schemas"),
        );
        settings.report_dir = self.report_dir();
        settings.source_label = "test-db".to_string();

        Verifier::new(settings, fetcher.clone(), FieldComparator::new())
    }
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_end_to_end_lookup_uses_payload_identifiers() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1", "order-id": "O9"}]));
    workspace
        .expected("orders", json!([{"id": "E1", "order_id": "O9", "amount": "10"}]))
        .schema_file(
            "orders_lookup.json",
            r#"{"idColumn": "id", "orderIdColumn": "order_id"}"#,
        );

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records(
        "orders",
        [record(json!({"id": "E1", "order_id": "O9", "amount": 10}))],
    );

    let outcome = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap();

    let queries = fetcher.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, "orders");
    assert_eq!(queries[0].1.to_string(), "{id=E1, order_id=O9}");

    assert_eq!(outcome.reports.len(), 1);
    let report = &outcome.reports[0];
    assert_eq!(report.status, Status::Pass);
    assert_eq!(report.source, "test-db");
    assert_eq!(report.event_id, "E1");
    assert_eq!(report.count(Status::Pass), 3);
    assert_eq!(outcome.matched_rows, 1);
    assert_eq!(outcome.queried_rows, 1);
}

#[test]
fn test_policy_ignored_fields_are_not_compared() {
    init_test_tracing();

    let workspace = Workspace::new(json!({"id": "E1", "order-id": "O9"}));
    workspace
        .expected("orders", json!([{"id": "E1", "order_id": "O9", "amount": "10"}]))
        .schema_file("table_columns.json", r#"{"orders": {"ignore": ["amount"]}}"#);

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records(
        "orders",
        [record(json!({"id": "E1", "orderid": "O9", "order_id": "O9", "amount": "99"}))],
    );

    let outcome = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap();

    let report = &outcome.reports[0];
    assert_eq!(report.status, Status::Pass);
    assert!(report.results.iter().all(|result| result.column != "amount"));
    assert_eq!(
        report
            .results
            .iter()
            .map(|result| result.column.as_str())
            .collect::<Vec<_>>(),
        ["id", "order_id"]
    );
}

#[test]
fn test_run_fails_on_mismatch_and_writes_pass_report() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace
        .expected("orders", json!([{"id": "E1", "status": "NEW"}]))
        .expected("payments", json!([{"id": "E1", "amount": "5.00"}]));

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records("orders", [record(json!({"id": "E1", "status": "CANCELLED"}))]);
    fetcher.insert_records("payments", [record(json!({"id": "E1", "amount": 5}))]);

    let err = workspace.verifier(&fetcher).run(&mut io::sink()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(err.detail().unwrap().contains("orders"));

    let reports: Vec<_> = fs::read_dir(workspace.report_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(reports.len(), 1);
    let content = fs::read_to_string(&reports[0]).unwrap();
    assert!(content.starts_with("table,columnname,order/id,expected,actual,status\n"));
    assert!(content.contains(r#""payments","amount","E1","5.00","5","PASS""#));
    assert!(!content.contains(r#""status""#));
}

#[test]
fn test_run_succeeds_when_every_report_passes() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"order-id": "O1"}]));
    workspace.expected("orders", json!([{"orderid": "O1", "total": "12.5"}]));

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records("orders", [record(json!({"orderid": "O1", "total": 12.5}))]);

    let outcome = workspace.verifier(&fetcher).run(&mut io::sink()).unwrap();

    assert!(outcome.is_success());
    assert_eq!(fetcher.queries()[0].1.to_string(), "{orderid=O1}");
}

#[test]
fn test_no_in_scope_fixture_rows_fails_before_fetching() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace.expected("orders", json!([{"id": "E2"}]));

    let fetcher = MemoryFetcher::new();
    let err = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoMatchingFixtures);
    assert!(fetcher.queries().is_empty());
}

#[test]
fn test_no_usable_criteria_in_whole_run_is_fatal() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace
        .expected("orders", json!([{"id": "E1", "amount": "3"}]))
        .schema_file("orders_lookup.json", r#"["sku"]"#);

    let fetcher = MemoryFetcher::new();
    let err = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoLookupCriteria);
    assert!(fetcher.queries().is_empty());
}

#[test]
fn test_row_without_criteria_is_skipped_not_fatal() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace
        .expected(
            "orders",
            json!([{"id": "E1", "sku": "S1"}, {"id": "E1", "note": "no sku"}]),
        )
        .schema_file("orders_lookup.json", r#"["sku"]"#);

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records("orders", [record(json!({"id": "E1", "sku": "S1"}))]);

    let outcome = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap();

    assert_eq!(outcome.matched_rows, 2);
    assert_eq!(outcome.queried_rows, 1);
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].collection, "orders");
    assert_eq!(outcome.skipped[0].scenario_id(), "E1");
    assert_eq!(fetcher.queries()[0].1.to_string(), "{sku=S1}");
}

#[test]
fn test_fetch_failure_aborts_with_collection_context() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace.expected("orders", json!([{"id": "E1"}]));

    let fetcher = MemoryFetcher::new();
    fetcher.fail_collection("orders");

    let err = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
    assert!(err.detail().unwrap().starts_with("collection orders"));
}

#[test]
fn test_missing_fetched_record_is_reported_as_failure() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace.expected("orders", json!([{"id": "E1"}]));

    let fetcher = MemoryFetcher::new();
    let outcome = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.reports[0].global_errors.len(), 1);
}

#[test]
fn test_column_rule_applies_to_nested_values() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace
        .expected(
            "orders",
            json!([{"id": "E1", "items": r#"[{"sku": "A", "ts": 1}]"#}]),
        )
        .schema_file("orders_items.schema.json", r#"{"ignore": ["ts"]}"#);

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records(
        "orders",
        [record(json!({"id": "E1", "items": [{"sku": "A", "ts": 2}]}))],
    );

    let outcome = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap();

    assert!(outcome.is_success(), "{:?}", outcome.reports);
}

#[test]
fn test_invalid_column_rule_is_fatal() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace
        .expected("orders", json!([{"id": "E1", "items": {"sku": "A"}}]))
        .schema_file("orders_items.schema.json", "{ not json");

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records("orders", [record(json!({"id": "E1", "items": {"sku": "A"}}))]);

    let err = workspace.verifier(&fetcher).execute(&mut io::sink()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidColumnRule);
}

#[test]
fn test_payload_without_records_is_fatal() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"foo": 1}, [{"bar": "x"}]]));
    workspace.expected("orders", json!([{"id": "E1"}]));

    let err = workspace
        .verifier(&MemoryFetcher::new())
        .execute(&mut io::sink())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPayloadRecords);
    assert!(err.kind().is_configuration());
}

#[test]
fn test_run_renders_progress_and_cases_to_writer() {
    init_test_tracing();

    let workspace = Workspace::new(json!([{"id": "E1"}]));
    workspace.expected("orders", json!([{"id": "E1", "status": "NEW"}]));

    let fetcher = MemoryFetcher::new();
    fetcher.insert_records("orders", [record(json!({"id": "E1", "status": "OLD"}))]);

    let mut out = Vec::new();
    let err = workspace.verifier(&fetcher).run(&mut out).unwrap_err();
    let rendered = String::from_utf8(out).unwrap();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(rendered.contains("Contract verification"));
    assert!(rendered.contains("scenario 1/1"));
    assert!(rendered.contains("table orders (1 expected row(s))"));
    assert!(rendered.contains("Run summary"));
    assert!(rendered.contains("Failed / skipped cases:"));
    assert!(rendered.contains("value mismatch"));
}
