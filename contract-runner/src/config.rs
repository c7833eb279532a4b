use clap::Parser;
use contract::verifier::VerifierSettings;
use contract_config::shared::VerifierConfig;
use contract_config::{Environment, load_config, load_config_from};
use std::path::PathBuf;

use crate::error::{RunnerError, RunnerResult};

/// Verifies the records of a MySQL database against expected JSON fixtures.
#[derive(Parser, Debug, Default)]
#[command(name = "contract-runner")]
#[command(about = "Verifies database records against expected JSON fixtures")]
pub struct Args {
    /// Directory holding base.yaml and the environment files (default: ./configuration)
    #[arg(long, env = "CONTRACT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// JSON payload with the business records under test
    #[arg(long, env = "CONTRACT_PAYLOAD")]
    pub payload: Option<PathBuf>,

    /// Directory of the expected fixture files, or a file inside it
    #[arg(long, env = "CONTRACT_EXPECTED")]
    pub expected: Option<PathBuf>,

    /// Directory of the lookup, policy and column rule documents
    #[arg(long, env = "CONTRACT_SCHEMA_DIR")]
    pub schema_dir: Option<PathBuf>,
}

impl Args {
    /// Replaces the configured paths with the ones given on the command line.
    fn apply(&self, config: &mut VerifierConfig) {
        if let Some(payload) = &self.payload {
            config.paths.payload = payload.clone();
        }
        if let Some(expected) = &self.expected {
            config.paths.expected = expected.clone();
        }
        if let Some(schema_dir) = &self.schema_dir {
            config.paths.schema_dir = schema_dir.clone();
        }
    }
}

/// Loads the configuration, applies command line overrides and validates the result.
pub fn load_verifier_config(args: &Args) -> RunnerResult<VerifierConfig> {
    let mut config = match &args.config_dir {
        Some(dir) => {
            let environment = Environment::load()?;
            load_config_from::<VerifierConfig>(dir, environment).map_err(RunnerError::config)?
        }
        None => load_config::<VerifierConfig>().map_err(RunnerError::config)?,
    };
    args.apply(&mut config);
    config.validate().map_err(RunnerError::config)?;

    Ok(config)
}

/// Builds the settings of a verification run from the loaded configuration.
pub fn verifier_settings(config: &VerifierConfig) -> VerifierSettings {
    let mut settings = VerifierSettings::new(
        &config.paths.payload,
        &config.paths.expected,
        &config.paths.schema_dir,
    );
    settings.report_dir = config.paths.report_dir.clone();
    settings.source_label = config.run.source_label.clone();
    settings.infer_lookup_from_fixture = config.run.infer_lookup_from_fixture;
    settings.max_cell_width = config.run.max_cell_width;

    settings
}
