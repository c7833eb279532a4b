//! Error types and result definitions for contract verification.
//!
//! [`ContractError`] carries a classification ([`ErrorKind`]), a static description, optional
//! dynamic detail, an optional source error and the callsite where it was created. Fatal
//! configuration and correlation failures as well as collaborator failures all flow through it.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for contract verification using [`ContractError`].
pub type ContractResult<T> = Result<T, ContractError>;

/// Main error type for contract verification.
#[derive(Debug, Clone)]
pub struct ContractError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Categories of failures that can occur during a verification run.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,
    MissingPayload,
    InvalidPayload,
    NoPayloadRecords,
    MissingExpectedData,
    InvalidExpectedData,
    InvalidColumnRule,

    // Correlation Errors
    NoMatchingFixtures,
    NoLookupCriteria,

    // Source Errors
    SourceConnectionFailed,
    SourceQueryFailed,

    // IO Errors
    IoError,

    // Outcome
    ValidationFailed,
}

impl ErrorKind {
    /// Returns `true` when the kind belongs to the configuration family.
    ///
    /// Configuration failures are raised before any record is fetched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigError
                | ErrorKind::MissingPayload
                | ErrorKind::InvalidPayload
                | ErrorKind::NoPayloadRecords
                | ErrorKind::MissingExpectedData
                | ErrorKind::InvalidExpectedData
        )
    }
}

impl ContractError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Prefixes the detail with some context, keeping kind and source untouched.
    ///
    /// Used to annotate collaborator failures with the collection being processed.
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        let detail = match self.detail.take() {
            Some(detail) => format!("{context}: {detail}"),
            None => context.to_string(),
        };
        self.detail = Some(Cow::Owned(detail));
        self
    }

    /// Creates a [`ContractError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        ContractError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for ContractError {
    fn eq(&self, other: &ContractError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        write_detail(self.detail.as_deref(), f, 1)?;
        write_backtrace(self.backtrace.as_ref(), f, 1)?;

        Ok(())
    }
}

impl error::Error for ContractError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Writes the captured backtrace with indentation.
fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty() && rendered_backtrace != "disabled backtrace" {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Creates a [`ContractError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for ContractError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> ContractError {
        ContractError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`ContractError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for ContractError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> ContractError {
        ContractError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`ContractError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for ContractError {
    #[track_caller]
    fn from(err: std::io::Error) -> ContractError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ContractError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_error;

    #[test]
    fn test_with_context_prefixes_detail() {
        let err = contract_error!(
            ErrorKind::SourceQueryFailed,
            "Database operation failed",
            "unknown column"
        )
        .with_context("collection orders");

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
        assert_eq!(err.detail(), Some("collection orders: unknown column"));
    }

    #[test]
    fn test_with_context_without_detail() {
        let err = contract_error!(ErrorKind::IoError, "I/O operation failed").with_context("orders");

        assert_eq!(err.detail(), Some("orders"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: ContractError = std::io::Error::other("disk gone").into();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("disk gone"));
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn test_configuration_family() {
        assert!(ErrorKind::MissingPayload.is_configuration());
        assert!(ErrorKind::InvalidExpectedData.is_configuration());
        assert!(!ErrorKind::InvalidColumnRule.is_configuration());
        assert!(!ErrorKind::NoMatchingFixtures.is_configuration());
        assert!(!ErrorKind::SourceQueryFailed.is_configuration());
    }

    #[test]
    fn test_display_contains_kind_and_detail() {
        let err = contract_error!(
            ErrorKind::NoMatchingFixtures,
            "No expected rows matched payload identifiers",
            "expected/"
        );
        let rendered = err.to_string();

        assert!(rendered.starts_with("[NoMatchingFixtures] No expected rows matched"));
        assert!(rendered.contains("Detail:\n    expected/"));
    }
}
