use crate::schema::ComparisonSchema;
use crate::types::{Record, ValidationReport};

/// Trait for comparing one expected record against the records fetched for it.
///
/// Comparison is pure and never fails: every problem is expressed in the returned report.
pub trait Comparator {
    /// Compares `expected` against the `actual` records of `collection`.
    ///
    /// `source` labels the backing store and `event_id` the scenario in the report.
    fn compare(
        &self,
        source: &str,
        event_id: &str,
        collection: &str,
        actual: &[Record],
        expected: &Record,
        schema: &ComparisonSchema,
    ) -> ValidationReport;
}
