//! Data-driven contract verification.
//!
//! Correlates the business records of a JSON payload with expected fixture rows, resolves per
//! collection how each row is looked up in a backing store, fetches the live records through a
//! [`fetch::RecordFetcher`] and compares them field by field through a
//! [`compare::Comparator`].

pub mod compare;
pub mod context;
pub mod criteria;
pub mod error;
pub mod fetch;
pub mod fixtures;
pub mod lookup;
mod macros;
pub mod normalize;
pub mod payload;
pub mod policy;
pub mod report;
pub mod schema;
pub mod types;
pub mod verifier;
