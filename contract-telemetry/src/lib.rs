//! Tracing setup shared by the verification binaries and tests.

pub mod tracing;
