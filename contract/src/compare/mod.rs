//! Comparison of expected records against fetched records.

mod base;
pub mod field;

pub use base::Comparator;
pub use field::FieldComparator;
