//! Configuration types of verification runs.

mod base;
mod connection;
mod verifier;

pub use base::ValidationError;
pub use connection::MySqlConnectionConfig;
pub use verifier::{PathsConfig, RunConfig, VerifierConfig};
