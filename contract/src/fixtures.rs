//! Loading of expected fixture files and their correlation with payload records.
//!
//! Every `<collection>_expected_data.json` file holds a JSON array of expected rows for one
//! collection. Only the rows that refer to an identifier present somewhere in the payload are
//! kept, and each payload record later selects its own rows from those.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bail;
use crate::context::RunContext;
use crate::error::{ContractResult, ErrorKind};
use crate::lookup::LookupDescriptor;
use crate::normalize::{IdRole, first_text, probe, underscored};
use crate::payload::{PayloadIds, PayloadRecord};
use crate::schema::ComparisonSchema;
use crate::types::Record;

/// Suffix of expected fixture files: `<collection>_expected_data.json`.
pub const EXPECTED_FILE_SUFFIX: &str = "_expected_data.json";

/// Keys under which a fixture row carries its event identifier.
const ROW_EVENT_KEYS: [&str; 3] = ["id", "event_id", "event-id"];

/// Keys under which a fixture row carries its order identifier.
const ROW_ORDER_KEYS: [&str; 3] = ["orderid", "order_id", "order-id"];

/// Expected rows of one collection together with how to look them up.
#[derive(Debug, Clone)]
pub struct ExpectedTable {
    pub collection: String,
    /// Rows that refer to at least one payload identifier, in file order.
    pub rows: Vec<Record>,
    /// Number of rows the fixture file contained before scoping.
    pub total_rows: usize,
    pub schema: ComparisonSchema,
    pub lookup: LookupDescriptor,
}

impl ExpectedTable {
    /// Returns the in-scope rows that belong to `record`.
    ///
    /// A row belongs to the record when its event id equals the record's event id, or its order
    /// id equals the record's order id. Identifiers the record does not carry never match. The
    /// result keeps file order and contains no structurally equal rows.
    pub fn matched_rows(&self, record: &PayloadRecord) -> Vec<&Record> {
        let mut matched: Vec<&Record> = Vec::new();
        for row in &self.rows {
            let by_event = record
                .event_id()
                .is_some_and(|id| first_text(row, ["id", "event_id"]).as_deref() == Some(id));
            let by_order = record
                .order_id()
                .is_some_and(|id| first_text(row, ["orderid", "order_id"]).as_deref() == Some(id));

            if (by_event || by_order) && !matched.contains(&row) {
                matched.push(row);
            }
        }

        matched
    }
}

/// Loads every expected fixture file and keeps the rows relevant to the payload.
///
/// `expected_path` may point at the fixture directory or at any file inside it.
pub fn load_expected_tables(
    expected_path: &Path,
    ids: &PayloadIds,
    ctx: &mut RunContext,
) -> ContractResult<Vec<ExpectedTable>> {
    let dir = expected_directory(expected_path)?;
    let files = list_expected_files(&dir)?;

    let mut tables = Vec::with_capacity(files.len());
    for (collection, path) in files {
        let rows = read_fixture_rows(&path)?;
        let total_rows = rows.len();
        let lookup = ctx.lookup_descriptor(&collection, rows.first())?;

        let rows: Vec<Record> = rows
            .into_iter()
            .filter(|row| in_scope(row, ids, &lookup))
            .collect();

        info!(
            collection = %collection,
            total_rows,
            in_scope_rows = rows.len(),
            lookup = %lookup,
            "loaded expected fixture"
        );

        tables.push(ExpectedTable {
            schema: ComparisonSchema::new(&collection),
            collection,
            rows,
            total_rows,
            lookup,
        });
    }

    Ok(tables)
}

/// Resolves the directory that holds the fixture files.
pub fn expected_directory(expected_path: &Path) -> ContractResult<PathBuf> {
    if expected_path.as_os_str().is_empty() || !expected_path.exists() {
        bail!(
            ErrorKind::MissingExpectedData,
            "Expected data path does not exist",
            expected_path.display()
        );
    }

    let dir = if expected_path.is_dir() {
        expected_path.to_path_buf()
    } else {
        match expected_path.parent() {
            Some(parent) if parent.is_dir() => parent.to_path_buf(),
            _ => bail!(
                ErrorKind::MissingExpectedData,
                "Expected data directory does not exist",
                expected_path.display()
            ),
        }
    };

    Ok(dir)
}

/// Lists the fixture files of `dir` as `(collection, path)` pairs sorted by file name.
pub fn list_expected_files(dir: &Path) -> ContractResult<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => bail!(
            ErrorKind::MissingExpectedData,
            "Expected data directory could not be read",
            dir.display(),
            source: err
        ),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if let Some(collection) = name.strip_suffix(EXPECTED_FILE_SUFFIX) {
            if !collection.is_empty() {
                files.push((collection.to_string(), path.clone()));
            }
        }
    }

    if files.is_empty() {
        bail!(
            ErrorKind::MissingExpectedData,
            "No expected data files found",
            format!("no *{EXPECTED_FILE_SUFFIX} files in {}", dir.display())
        );
    }

    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));

    Ok(files)
}

/// Reads one fixture file into rows with normalised keys.
fn read_fixture_rows(path: &Path) -> ContractResult<Vec<Record>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => bail!(
            ErrorKind::IoError,
            "Expected data file could not be read",
            path.display(),
            source: err
        ),
    };

    let root: Value = match serde_json::from_str(&content) {
        Ok(root) => root,
        Err(err) => bail!(
            ErrorKind::InvalidExpectedData,
            "Expected data file is not valid JSON",
            format!("{}: {err}", path.display()),
            source: err
        ),
    };

    let Value::Array(entries) = root else {
        bail!(
            ErrorKind::InvalidExpectedData,
            "Expected data file must contain a JSON array",
            path.display()
        );
    };

    let mut rows = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::Object(object) => rows.push(normalize_row(object)),
            other => {
                warn!(path = %path.display(), index, value = %other, "dropping non-object fixture entry");
            }
        }
    }

    Ok(rows)
}

/// Rewrites the keys of a fixture row to use underscores as separator.
///
/// When two spellings collide, the last one in the row wins.
pub fn normalize_row(row: Record) -> Record {
    let mut out = Record::with_capacity(row.len());
    for (key, value) in row {
        out.insert(underscored(&key), value);
    }

    out
}

/// Returns `true` when the row refers to an identifier present in the payload.
///
/// When the descriptor maps columns to identifier roles, only those columns decide. Otherwise
/// the row's own identifier fields are checked.
pub fn in_scope(row: &Record, ids: &PayloadIds, lookup: &LookupDescriptor) -> bool {
    let mut mapped = lookup.mapped_columns().peekable();
    if mapped.peek().is_some() {
        let matched = mapped.any(|(column, role)| {
            let Some(value) = probe(row, column) else {
                return false;
            };
            match role {
                IdRole::EventId => ids.event_ids.contains(&value),
                IdRole::OrderId => ids.order_ids.contains(&value),
            }
        });
        if !matched {
            let row = Value::Object(row.clone());
            debug!(%row, "fixture row out of scope");
        }
        return matched;
    }

    let by_event = first_text(row, ROW_EVENT_KEYS).is_some_and(|id| ids.event_ids.contains(&id));
    let by_order = first_text(row, ROW_ORDER_KEYS).is_some_and(|id| ids.order_ids.contains(&id));

    by_event || by_order
}
