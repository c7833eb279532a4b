//! Orchestration of a verification run.
//!
//! The [`Verifier`] loads the payload and the expected fixtures, correlates them, fetches the
//! live records row by row through a [`RecordFetcher`] and hands each pair to a
//! [`Comparator`]. Processing is strictly sequential: payload record, then collection, then
//! expected row.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::bail;
use crate::compare::Comparator;
use crate::context::RunContext;
use crate::criteria;
use crate::error::{ContractResult, ErrorKind};
use crate::fetch::RecordFetcher;
use crate::fixtures::{ExpectedTable, load_expected_tables};
use crate::payload::{self, PayloadIds, PayloadRecord};
use crate::report;
use crate::schema::looks_like_json;
use crate::types::{Record, ValidationReport};

/// Label of the backing store used when none is configured.
pub const DEFAULT_SOURCE_LABEL: &str = "phpmyadmin";

/// Widest cell printed in the failed and skipped cases table by default.
pub const DEFAULT_MAX_CELL_WIDTH: usize = 60;

/// Inputs and options of one verification run.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// JSON payload describing the business events under test.
    pub payload_path: PathBuf,
    /// Directory of the expected fixture files, or any file inside it.
    pub expected_path: PathBuf,
    /// Directory holding the lookup, policy and column rule documents.
    pub schema_dir: PathBuf,
    /// Directory the CSV pass report is written to.
    pub report_dir: PathBuf,
    pub source_label: String,
    /// Infers lookup columns from the first fixture row when nothing is configured.
    pub infer_lookup_from_fixture: bool,
    pub max_cell_width: usize,
}

impl VerifierSettings {
    /// Creates settings with default options. Reports are written to `schema_dir`'s parent
    /// `reports` directory unless changed.
    pub fn new(
        payload_path: impl Into<PathBuf>,
        expected_path: impl Into<PathBuf>,
        schema_dir: impl Into<PathBuf>,
    ) -> Self {
        let schema_dir = schema_dir.into();
        let report_dir = schema_dir
            .parent()
            .map(|parent| parent.join("reports"))
            .unwrap_or_else(|| PathBuf::from("reports"));

        Self {
            payload_path: payload_path.into(),
            expected_path: expected_path.into(),
            schema_dir,
            report_dir,
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            infer_lookup_from_fixture: false,
            max_cell_width: DEFAULT_MAX_CELL_WIDTH,
        }
    }
}

/// An expected row that could not be looked up because no criteria resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub collection: String,
    pub record: PayloadRecord,
    pub row: Record,
    pub reason: String,
}

impl SkippedRow {
    /// Identifier shown for the scenario the row belongs to.
    pub fn scenario_id(&self) -> &str {
        scenario_id(&self.record)
    }
}

/// Everything a verification run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub reports: Vec<ValidationReport>,
    pub skipped: Vec<SkippedRow>,
    /// Expected rows that matched a payload record and survived column policies.
    pub matched_rows: usize,
    /// Matched rows for which lookup criteria resolved and a fetch was made.
    pub queried_rows: usize,
}

impl RunOutcome {
    pub fn failed_reports(&self) -> impl Iterator<Item = &ValidationReport> {
        self.reports.iter().filter(|report| report.is_failed())
    }

    pub fn is_success(&self) -> bool {
        self.failed_reports().next().is_none()
    }
}

/// Drives a verification run over a fetcher and a comparator.
#[derive(Debug)]
pub struct Verifier<F, C> {
    settings: VerifierSettings,
    fetcher: F,
    comparator: C,
}

impl<F, C> Verifier<F, C>
where
    F: RecordFetcher,
    C: Comparator,
{
    pub fn new(settings: VerifierSettings, fetcher: F, comparator: C) -> Self {
        Self {
            settings,
            fetcher,
            comparator,
        }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Runs the verification and returns every report.
    ///
    /// Progress is rendered to `out`. Configuration problems and an empty correlation fail
    /// before anything is fetched. A fetch error aborts the run. Failing reports are not an error
    /// here; see [`Verifier::run`].
    pub fn execute<W: Write>(&self, out: &mut W) -> ContractResult<RunOutcome> {
        let settings = &self.settings;
        let mut ctx = RunContext::new(&settings.schema_dir, settings.infer_lookup_from_fixture);

        emit(
            out,
            &report::run_header(
                &settings.payload_path,
                &settings.expected_path,
                &settings.schema_dir,
                &settings.source_label,
            ),
        )?;

        let payload = load_payload(&settings.payload_path)?;
        let records = payload::extract(&payload);
        if records.is_empty() {
            bail!(
                ErrorKind::NoPayloadRecords,
                "Payload contains no records with an event or order id",
                settings.payload_path.display()
            );
        }
        let ids = PayloadIds::collect(&records);
        info!(
            records = records.len(),
            event_ids = ids.event_ids.len(),
            order_ids = ids.order_ids.len(),
            "extracted payload records"
        );

        let mut tables = load_expected_tables(&settings.expected_path, &ids, &mut ctx)?;
        if tables.iter().all(|table| table.rows.is_empty()) {
            bail!(
                ErrorKind::NoMatchingFixtures,
                "No expected row refers to an identifier of the payload",
                settings.expected_path.display()
            );
        }

        let mut outcome = RunOutcome::default();
        let total = records.len();
        for (index, record) in records.iter().enumerate() {
            info!(
                scenario = index + 1,
                total,
                event_id = record.event_id().unwrap_or_default(),
                order_id = record.order_id().unwrap_or_default(),
                "verifying payload record"
            );
            emit(out, &report::scenario_header(index + 1, total, record))?;

            for table in tables.iter_mut() {
                self.verify_table(&mut ctx, table, record, &mut outcome, out)?;
            }
        }

        if outcome.matched_rows == 0 {
            bail!(
                ErrorKind::NoMatchingFixtures,
                "No expected row matched any payload record"
            );
        }
        if outcome.queried_rows == 0 {
            bail!(
                ErrorKind::NoLookupCriteria,
                "No expected row produced usable lookup criteria",
                format!("{} matched row(s) skipped", outcome.skipped.len())
            );
        }

        Ok(outcome)
    }

    /// Runs the verification, renders the summary to `out` and writes the pass report.
    ///
    /// Fails with [`ErrorKind::ValidationFailed`] when any report failed, after everything has
    /// been rendered.
    pub fn run<W: Write>(&self, out: &mut W) -> ContractResult<RunOutcome> {
        let outcome = self.execute(out)?;

        emit(out, &report::run_summary(&outcome))?;
        emit(
            out,
            &report::case_table(&outcome, self.settings.max_cell_width),
        )?;
        out.flush()?;

        match report::write_pass_report(&self.settings.report_dir, &outcome.reports) {
            Ok(path) => info!(path = %path.display(), "wrote pass report"),
            Err(err) => error!(error = %err, "failed to write pass report"),
        }

        if let Some(failed) = outcome.failed_reports().next() {
            bail!(
                ErrorKind::ValidationFailed,
                "Verification failed",
                format!(
                    "{} of {} report(s) failed, first failing collection: {}",
                    outcome.failed_reports().count(),
                    outcome.reports.len(),
                    failed.collection
                )
            );
        }

        Ok(outcome)
    }

    fn verify_table<W: Write>(
        &self,
        ctx: &mut RunContext,
        table: &mut ExpectedTable,
        record: &PayloadRecord,
        outcome: &mut RunOutcome,
        out: &mut W,
    ) -> ContractResult<()> {
        let matched: Vec<Record> = table.matched_rows(record).into_iter().cloned().collect();
        if matched.is_empty() {
            info!(collection = %table.collection, "no expected rows for record, skipping table");
            return Ok(());
        }

        let policy = ctx.column_policy(&table.collection);
        policy.merge_into(&mut table.schema);
        emit(out, &report::table_header(&table.collection, matched.len()))?;

        for row in matched {
            let row = policy.strip_ignored(&row);
            if row.is_empty() {
                warn!(collection = %table.collection, "expected row has no columns left after ignoring fields");
                continue;
            }
            outcome.matched_rows += 1;

            let criteria = criteria::build(&table.lookup, record, &row);
            if criteria.is_empty() {
                let row_json = Value::Object(row.clone());
                warn!(
                    collection = %table.collection,
                    lookup = %table.lookup,
                    row = %row_json,
                    "no lookup criteria could be built, skipping row"
                );
                outcome.skipped.push(SkippedRow {
                    collection: table.collection.clone(),
                    record: record.clone(),
                    row,
                    reason: format!("no value for lookup columns {}", table.lookup),
                });
                continue;
            }
            outcome.queried_rows += 1;

            info!(collection = %table.collection, %criteria, "fetching actual records");
            let actual = self
                .fetcher
                .fetch_records(&table.collection, &criteria)
                .map_err(|err| err.with_context(format!("collection {}", table.collection)))?;

            for (column, value) in &row {
                if !looks_like_json(value) || table.schema.rules.contains_key(column) {
                    continue;
                }
                if let Some(rule) = ctx.column_rule(&table.collection, column)? {
                    table.schema.rules.insert(column.clone(), rule);
                }
            }

            let report = self.comparator.compare(
                &self.settings.source_label,
                scenario_id(record),
                &table.collection,
                &actual,
                &row,
                &table.schema,
            );
            emit(out, &report::report_summary(&report))?;
            info!(
                collection = %table.collection,
                status = %report.status,
                actual_records = actual.len(),
                "compared expected row"
            );
            outcome.reports.push(report);
        }

        Ok(())
    }
}

/// Reads and parses the payload document.
pub fn load_payload(path: &Path) -> ContractResult<Value> {
    if path.as_os_str().is_empty() || !path.is_file() {
        bail!(
            ErrorKind::MissingPayload,
            "Payload file does not exist",
            path.display()
        );
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => bail!(
            ErrorKind::InvalidPayload,
            "Payload file could not be read",
            path.display(),
            source: err
        ),
    };

    match serde_json::from_str(&content) {
        Ok(value) => Ok(value),
        Err(err) => bail!(
            ErrorKind::InvalidPayload,
            "Payload is not valid JSON",
            format!("{}: {err}", path.display()),
            source: err
        ),
    }
}

fn emit<W: Write>(out: &mut W, section: &str) -> ContractResult<()> {
    writeln!(out, "{section}")?;
    Ok(())
}

fn scenario_id(record: &PayloadRecord) -> &str {
    record.event_id().or(record.order_id()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = VerifierSettings::new("in/payload.json", "in/expected", "in/schemas");

        assert_eq!(settings.source_label, "phpmyadmin");
        assert_eq!(settings.max_cell_width, 60);
        assert!(!settings.infer_lookup_from_fixture);
        assert_eq!(settings.report_dir, PathBuf::from("in/reports"));
    }

    #[test]
    fn test_load_payload_errors() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_payload(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingPayload);

        let path = dir.path().join("payload.json");
        fs::write(&path, "{ broken").unwrap();
        let err = load_payload(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }

    #[test]
    fn test_scenario_id_prefers_event_id() {
        assert_eq!(scenario_id(&PayloadRecord::new("E1", "O1")), "E1");
        assert_eq!(scenario_id(&PayloadRecord::new("", "O1")), "O1");
    }
}
