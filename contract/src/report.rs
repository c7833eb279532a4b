//! Console rendering of verification progress and results, and the CSV pass report.

use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bail;
use crate::error::{ContractResult, ErrorKind};
use crate::payload::PayloadRecord;
use crate::types::{Status, ValidationReport};
use crate::verifier::RunOutcome;

/// Headers of the failed and skipped cases table.
const CASE_HEADERS: [&str; 7] = [
    "table",
    "columnname",
    "order/id",
    "expected",
    "actual",
    "status",
    "error message",
];

/// Header line of the CSV pass report.
const PASS_REPORT_HEADER: &str = "table,columnname,order/id,expected,actual,status";

const GLOBAL_COLUMN: &str = "<global>";
const LOOKUP_COLUMN: &str = "<lookup>";
const NULL_CELL: &str = "<null>";
const EMPTY_CELL: &str = "<empty>";
const ELLIPSIS: &str = "...";
const RULE: &str = "==============================================================";

pub fn run_header(payload: &Path, expected: &Path, schema_dir: &Path, source: &str) -> String {
    format!(
        "{RULE}\nContract verification\n  payload:    {}\n  expected:   {}\n  schema dir: {}\n  source db:  {source}\n{RULE}",
        payload.display(),
        expected.display(),
        schema_dir.display(),
    )
}

pub fn scenario_header(index: usize, total: usize, record: &PayloadRecord) -> String {
    format!(
        "\n--- scenario {index}/{total}: event id {} | order id {} ---",
        cell_text(record.event_id()),
        cell_text(record.order_id()),
    )
}

pub fn table_header(collection: &str, rows: usize) -> String {
    format!("  table {collection} ({rows} expected row(s))")
}

/// One line summarising a single report.
pub fn report_summary(report: &ValidationReport) -> String {
    let mut line = format!(
        "    [{}] {} id={} pass={} fail={} skipped={}",
        report.status,
        report.collection,
        report.event_id,
        report.count(Status::Pass),
        report.count(Status::Fail),
        report.count(Status::Skipped),
    );
    for error in &report.global_errors {
        let _ = write!(line, "\n      error: {error}");
    }

    line
}

/// Totals over all reports of a run.
pub fn run_summary(outcome: &RunOutcome) -> String {
    let failed_reports = outcome.failed_reports().count();
    let passed_reports = outcome.reports.len() - failed_reports;

    let mut columns = [0usize; 3];
    for result in outcome.reports.iter().flat_map(|report| &report.results) {
        match result.status {
            Status::Pass => columns[0] += 1,
            Status::Fail => columns[1] += 1,
            Status::Skipped => columns[2] += 1,
        }
    }

    format!(
        "\n{RULE}\nRun summary\n  reports: {} (pass {passed_reports}, fail {failed_reports})\n  columns: pass {}, fail {}, skipped {}\n  expected rows matched: {}, queried: {}, skipped without criteria: {}\n{RULE}",
        outcome.reports.len(),
        columns[0],
        columns[1],
        columns[2],
        outcome.matched_rows,
        outcome.queried_rows,
        outcome.skipped.len(),
    )
}

/// Renders every failed or skipped case of the run as a table.
///
/// Cells are flattened to one line and clipped to `max_cell_width` characters.
pub fn case_table(outcome: &RunOutcome, max_cell_width: usize) -> String {
    let mut rows: Vec<[String; 7]> = Vec::new();

    for report in &outcome.reports {
        for error in &report.global_errors {
            rows.push([
                report.collection.clone(),
                GLOBAL_COLUMN.to_string(),
                report.event_id.clone(),
                String::new(),
                String::new(),
                Status::Fail.to_string(),
                error.clone(),
            ]);
        }
        for result in report
            .results
            .iter()
            .filter(|result| result.status != Status::Pass)
        {
            rows.push([
                report.collection.clone(),
                result.column.clone(),
                report.event_id.clone(),
                cell_text(result.expected.as_deref()),
                cell_text(result.actual.as_deref()),
                result.status.to_string(),
                result.reason.clone().unwrap_or_default(),
            ]);
        }
    }

    for skipped in &outcome.skipped {
        rows.push([
            skipped.collection.clone(),
            LOOKUP_COLUMN.to_string(),
            skipped.scenario_id().to_string(),
            String::new(),
            String::new(),
            Status::Skipped.to_string(),
            skipped.reason.clone(),
        ]);
    }

    let mut out = String::from("\nFailed / skipped cases:\n");
    if rows.is_empty() {
        out.push_str("none");
        return out;
    }

    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| clip(cell, max_cell_width)).collect())
        .collect();

    let mut widths: Vec<usize> = CASE_HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    push_row(&mut out, CASE_HEADERS.iter().copied(), &widths);
    out.push('\n');
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&separator.join("-+-"));
    for row in &rows {
        out.push('\n');
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }

    out
}

/// Writes every passing column of the run as CSV into `report_dir`.
///
/// Returns the path of the written file.
pub fn write_pass_report(report_dir: &Path, reports: &[ValidationReport]) -> ContractResult<PathBuf> {
    let mut content = String::from(PASS_REPORT_HEADER);
    content.push('\n');

    for report in reports {
        for result in report
            .results
            .iter()
            .filter(|result| result.status == Status::Pass)
        {
            let cells = [
                report.collection.as_str(),
                result.column.as_str(),
                report.event_id.as_str(),
                result.expected.as_deref().unwrap_or_default(),
                result.actual.as_deref().unwrap_or_default(),
                result.status.as_str(),
            ];
            let line: Vec<String> = cells.iter().map(|cell| csv_cell(cell)).collect();
            content.push_str(&line.join(","));
            content.push('\n');
        }
    }

    if let Err(err) = fs::create_dir_all(report_dir) {
        bail!(
            ErrorKind::IoError,
            "Report directory could not be created",
            report_dir.display(),
            source: err
        );
    }

    let path = report_dir.join(format!("pass-report-{}.csv", Utc::now().timestamp_millis()));
    if let Err(err) = fs::write(&path, content) {
        bail!(
            ErrorKind::IoError,
            "Pass report could not be written",
            path.display(),
            source: err
        );
    }

    Ok(path)
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
}

/// Renders an optional value for a table cell.
fn cell_text(value: Option<&str>) -> String {
    match value {
        None => NULL_CELL.to_string(),
        Some("") => EMPTY_CELL.to_string(),
        Some(text) => text.to_string(),
    }
}

/// Flattens line breaks and clips the cell to at most `max` characters.
fn clip(cell: &str, max: usize) -> String {
    let flat = cell.replace("\r\n", " ").replace(['\r', '\n'], " ");
    if flat.chars().count() <= max {
        return flat;
    }

    if max < ELLIPSIS.len() {
        return flat.chars().take(max).collect();
    }

    let mut clipped: String = flat.chars().take(max - ELLIPSIS.len()).collect();
    clipped.push_str(ELLIPSIS);

    clipped
}

fn csv_cell(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}
