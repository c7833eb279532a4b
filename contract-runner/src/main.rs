//! Contract verification binary.
//!
//! Loads the run configuration, connects to the MySQL source database and verifies its records
//! against the expected fixtures. Exits with a non-zero code when the run cannot complete or any
//! report fails.

use clap::Parser;
use contract::compare::FieldComparator;
use contract::verifier::Verifier;
use contract_mysql::MySqlRecordFetcher;
use contract_telemetry::tracing::init_tracing;
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use crate::config::{Args, load_verifier_config, verifier_settings};
use crate::error::{RunnerError, RunnerResult};

mod config;
mod error;

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, initializes tracing and runs the verification.
fn run(args: &Args) -> RunnerResult<()> {
    let config = load_verifier_config(args)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(RunnerError::config)?;

    let fetcher = MySqlRecordFetcher::connect(
        &config.source,
        Duration::from_secs(config.run.acquire_timeout_secs),
    )?;

    let verifier = Verifier::new(verifier_settings(&config), fetcher, FieldComparator::new());
    let outcome = verifier.run(&mut io::stdout().lock())?;

    info!(
        reports = outcome.reports.len(),
        skipped = outcome.skipped.len(),
        "verification passed"
    );

    Ok(())
}
