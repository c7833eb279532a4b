//! Records and verification reports shared by the engine and its collaborators.

use serde_json::{Map, Value};
use std::fmt;

/// A single record as a JSON object: a fixture row or a row fetched from the backing store.
pub type Record = Map<String, Value>;

/// Verdict of one compared column or of a whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResult {
    pub column: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub status: Status,
    pub reason: Option<String>,
}

impl ColumnResult {
    pub fn pass(column: impl Into<String>, expected: Option<String>, actual: Option<String>) -> Self {
        Self {
            column: column.into(),
            expected,
            actual,
            status: Status::Pass,
            reason: None,
        }
    }

    pub fn fail(
        column: impl Into<String>,
        expected: Option<String>,
        actual: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            expected,
            actual,
            status: Status::Fail,
            reason: Some(reason.into()),
        }
    }

    pub fn skipped(column: impl Into<String>, expected: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            expected,
            actual: None,
            status: Status::Skipped,
            reason: Some(reason.into()),
        }
    }
}

/// Result of comparing one expected record against the fetched records of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Label of the backing store the records were fetched from.
    pub source: String,
    /// Identifier shown for the scenario, the event id or the order id of the record.
    pub event_id: String,
    pub collection: String,
    pub status: Status,
    pub results: Vec<ColumnResult>,
    /// Failures not tied to a single column.
    pub global_errors: Vec<String>,
}

impl ValidationReport {
    /// Creates a report, deriving its status from the results and global errors.
    pub fn new(
        source: impl Into<String>,
        event_id: impl Into<String>,
        collection: impl Into<String>,
        results: Vec<ColumnResult>,
        global_errors: Vec<String>,
    ) -> Self {
        let failed = !global_errors.is_empty()
            || results.iter().any(|result| result.status == Status::Fail);

        Self {
            source: source.into(),
            event_id: event_id.into(),
            collection: collection.into(),
            status: if failed { Status::Fail } else { Status::Pass },
            results,
            global_errors,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Fail
    }

    /// Returns the number of column results with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == status)
            .count()
    }
}
