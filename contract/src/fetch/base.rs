use crate::criteria::LookupCriteria;
use crate::error::ContractResult;
use crate::types::Record;

/// Trait for backing stores the engine reads live records from.
///
/// Fetching is a blocking call made once per expected row, in order. Implementations that talk
/// to an asynchronous client are expected to own their runtime and block on each query.
pub trait RecordFetcher {
    /// Returns every record of `collection` matching all criteria.
    ///
    /// Callers never pass empty criteria. Any error aborts the verification run.
    fn fetch_records(&self, collection: &str, criteria: &LookupCriteria)
    -> ContractResult<Vec<Record>>;
}

impl<F: RecordFetcher + ?Sized> RecordFetcher for &F {
    fn fetch_records(
        &self,
        collection: &str,
        criteria: &LookupCriteria,
    ) -> ContractResult<Vec<Record>> {
        (**self).fetch_records(collection, criteria)
    }
}
