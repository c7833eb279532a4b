use contract::contract_error;
use contract::error::{ContractError, ErrorKind};

/// Converts a failure while running a lookup query.
pub(crate) fn query_error(err: sqlx::Error) -> ContractError {
    let kind = match &err {
        sqlx::Error::Database(_) => ErrorKind::SourceQueryFailed,
        sqlx::Error::Io(_) => ErrorKind::IoError,
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => ErrorKind::SourceConnectionFailed,
        _ => ErrorKind::SourceQueryFailed,
    };

    contract_error!(kind, "Database operation failed", err.to_string(), source: err)
}

/// Converts a failure while establishing the connection pool.
pub(crate) fn connection_error(err: sqlx::Error) -> ContractError {
    contract_error!(
        ErrorKind::SourceConnectionFailed,
        "Could not connect to the source database",
        err.to_string(),
        source: err
    )
}
