use contract::error::ContractError;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Backtrace captured when a runner error is created.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the runner binary.
///
/// Wraps [`ContractError`] for verification errors and adds variants for setup failures.
#[derive(Debug)]
pub enum RunnerError {
    /// Verification error, including a failed verification.
    Contract(ContractError),
    /// Configuration or startup error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl RunnerError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            RunnerError::Contract(err) if err.kind().is_configuration() => {
                "verification setup error"
            }
            RunnerError::Contract(_) => "verification error",
            RunnerError::Config(_, _) => "configuration error",
            RunnerError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        match self {
            RunnerError::Contract(err) => err.backtrace(),
            RunnerError::Config(_, cb) => &cb.0,
            RunnerError::Io(_, cb) => &cb.0,
        }
    }

    /// Creates a configuration error from any error.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        RunnerError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("contract verification failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {}\n", self));

        let mut source = Error::source(self);
        let mut idx = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {idx}: {err}\n"));
            source = err.source();
            idx += 1;
        }

        // Contract errors already print their backtrace as part of the message.
        if should_render_backtrace() && !matches!(self, RunnerError::Contract(_)) {
            out.push_str("backtrace:\n");
            out.push_str(&self.backtrace().to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Contract(err) => write!(f, "{err}"),
            RunnerError::Config(source, _) => write!(f, "configuration error: {source}"),
            RunnerError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for RunnerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunnerError::Contract(err) => err.source(),
            RunnerError::Config(source, _) => Some(source.as_ref()),
            RunnerError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(err: std::io::Error) -> Self {
        RunnerError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<ContractError> for RunnerError {
    fn from(err: ContractError) -> Self {
        RunnerError::Contract(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract::contract_error;
    use contract::error::ErrorKind;
    use contract_config::shared::ValidationError;

    #[test]
    fn test_config_error_report_lists_cause() {
        let err = RunnerError::config(ValidationError::PortZero);
        let report = err.render_report();

        assert_eq!(err.category(), "configuration error");
        assert!(report.starts_with("contract verification failed\ncategory: configuration error\n"));
        assert!(report.contains("cause 1: "));
    }

    #[test]
    fn test_contract_error_categories() {
        let setup: RunnerError =
            contract_error!(ErrorKind::MissingPayload, "Payload file does not exist").into();
        let failed: RunnerError =
            contract_error!(ErrorKind::ValidationFailed, "Verification failed").into();

        assert_eq!(setup.category(), "verification setup error");
        assert_eq!(failed.category(), "verification error");
        assert!(failed.render_report().contains("Verification failed"));
    }
}
