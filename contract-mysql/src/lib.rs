//! MySQL backing store for contract verification.
//!
//! Provides [`MySqlRecordFetcher`], a [`contract::fetch::RecordFetcher`] that looks records up
//! with parameterised `SELECT` statements over a [`sqlx`] pool.

pub mod convert;
mod error;
pub mod fetcher;
pub mod query;

pub use fetcher::MySqlRecordFetcher;
