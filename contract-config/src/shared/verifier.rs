use serde::Deserialize;
use std::path::PathBuf;

use crate::Config;
use crate::shared::{MySqlConnectionConfig, ValidationError};

/// Complete configuration of a verification run.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    /// Database the live records are fetched from.
    pub source: MySqlConnectionConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.paths.validate()?;
        self.run.validate()
    }
}

impl Config for VerifierConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

/// Locations of the run inputs and outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// JSON payload with the business records under test.
    pub payload: PathBuf,
    /// Directory of the `<collection>_expected_data.json` files, or a file inside it.
    pub expected: PathBuf,
    /// Directory of the lookup, policy and column rule documents.
    pub schema_dir: PathBuf,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

impl PathsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, path) in [
            ("paths.payload", &self.payload),
            ("paths.expected", &self.expected),
            ("paths.schema_dir", &self.schema_dir),
            ("paths.report_dir", &self.report_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::EmptyPath(name));
            }
        }

        Ok(())
    }
}

/// Narrowest cell width that still fits the `...` clipping marker.
pub const MIN_MAX_CELL_WIDTH: usize = 3;

/// Options of a verification run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Label of the source database shown in reports.
    pub source_label: String,
    /// Infer lookup columns from the first fixture row when none are configured.
    pub infer_lookup_from_fixture: bool,
    /// Widest cell printed in the failed and skipped cases table.
    pub max_cell_width: usize,
    /// Seconds to wait for a database connection.
    pub acquire_timeout_secs: u64,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_cell_width < MIN_MAX_CELL_WIDTH {
            return Err(ValidationError::MaxCellWidthTooSmall(MIN_MAX_CELL_WIDTH));
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ValidationError::AcquireTimeoutZero);
        }

        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_label: "phpmyadmin".to_string(),
            infer_lookup_from_fixture: false,
            max_cell_width: 60,
            acquire_timeout_secs: 10,
        }
    }
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> VerifierConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let config = config(json!({
            "source": {"host": "localhost", "port": 3306, "name": "shop", "username": "qa"},
            "paths": {"payload": "in/payload.json", "expected": "in/expected", "schema_dir": "in/schemas"}
        }));

        assert!(config.validate().is_ok());
        assert_eq!(config.run.source_label, "phpmyadmin");
        assert_eq!(config.run.max_cell_width, 60);
        assert_eq!(config.paths.report_dir, PathBuf::from("reports"));
        assert!(config.source.password.is_none());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = config(json!({
            "source": {"host": "localhost", "port": 0, "name": "shop", "username": "qa", "password": "pw"},
            "paths": {"payload": "", "expected": "e", "schema_dir": "s"},
            "run": {"max_cell_width": 0}
        }));

        assert_eq!(config.validate(), Err(ValidationError::PortZero));
        config.source.port = 3306;
        assert_eq!(
            config.validate(),
            Err(ValidationError::EmptyPath("paths.payload"))
        );
        config.paths.payload = PathBuf::from("p.json");
        assert_eq!(
            config.validate(),
            Err(ValidationError::MaxCellWidthTooSmall(3))
        );
        config.run.max_cell_width = 2;
        assert_eq!(
            config.validate(),
            Err(ValidationError::MaxCellWidthTooSmall(3))
        );
        config.run.max_cell_width = 3;
        assert!(config.validate().is_ok());
        assert_eq!(config.run.acquire_timeout_secs, 10);
    }
}
