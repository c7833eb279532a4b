//! Record fetching abstractions.
//!
//! This module provides the [`RecordFetcher`] trait through which the engine reads the live
//! records of a collection, and an in-memory implementation for tests and dry runs.

mod base;
pub mod memory;

pub use base::RecordFetcher;
