use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required path is empty.
    #[error("`{0}` cannot be empty")]
    EmptyPath(&'static str),
    /// The source database host is empty.
    #[error("`source.host` cannot be empty")]
    EmptyHost,
    /// The source database port is zero.
    #[error("`source.port` cannot be zero")]
    PortZero,
    /// The report cell width cannot hold a clipped cell.
    #[error("`run.max_cell_width` must be at least {0}")]
    MaxCellWidthTooSmall(usize),
    /// The connection acquire timeout is zero.
    #[error("`run.acquire_timeout_secs` cannot be zero")]
    AcquireTimeoutZero,
}
