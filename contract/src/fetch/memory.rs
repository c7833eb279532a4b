use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

use crate::bail;
use crate::criteria::LookupCriteria;
use crate::error::{ContractResult, ErrorKind};
use crate::fetch::RecordFetcher;
use crate::normalize::probe;
use crate::types::Record;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Vec<Record>>,
    queries: Vec<(String, LookupCriteria)>,
    failing: HashSet<String>,
}

/// In-memory record fetcher for tests and dry runs.
///
/// [`MemoryFetcher`] serves records registered per collection and remembers every query it
/// received, so tests can assert on the exact criteria the engine produced. A record matches
/// when each criteria column, probed through its separator variants, has the criteria value.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFetcher {
    /// Creates a new fetcher without any records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds records to `collection`.
    pub fn insert_records(&self, collection: &str, records: impl IntoIterator<Item = Record>) {
        self.lock()
            .records
            .entry(collection.to_string())
            .or_default()
            .extend(records);
    }

    /// Makes every later fetch of `collection` fail with a query error.
    pub fn fail_collection(&self, collection: &str) {
        self.lock().failing.insert(collection.to_string());
    }

    /// Returns a copy of all queries received so far, in order.
    pub fn queries(&self) -> Vec<(String, LookupCriteria)> {
        self.lock().queries.clone()
    }

    /// Clears all records, queries and injected failures.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.queries.clear();
        inner.failing.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordFetcher for MemoryFetcher {
    fn fetch_records(
        &self,
        collection: &str,
        criteria: &LookupCriteria,
    ) -> ContractResult<Vec<Record>> {
        let mut inner = self.lock();

        info!(collection, %criteria, "fetching records from memory");
        inner
            .queries
            .push((collection.to_string(), criteria.clone()));

        if inner.failing.contains(collection) {
            bail!(
                ErrorKind::SourceQueryFailed,
                "Query against in-memory store failed",
                collection
            );
        }

        let records = inner
            .records
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| {
                        criteria
                            .iter()
                            .all(|(column, value)| probe(record, column).as_deref() == Some(value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(records)
    }
}
