//! Error types for the driver layer.

use sqlshim_core::CompileError;
use thiserror::Error;

/// Errors returned by every driver and façade operation.
#[derive(Debug, Error)]
pub enum DbError {
    /// Bad or missing connection parameters, or an unknown driver kind.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operation attempted before `connect` or after `disconnect`.
    #[error("not connected to database")]
    NotConnected,

    /// The engine could not open or create the store.
    #[error("connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// Failure reported by the engine while executing a statement.
    #[error("database error: {0}")]
    Engine(#[from] sqlx::Error),

    /// The call could not be turned into SQL.
    #[error("invalid statement: {0}")]
    Compile(#[from] CompileError),

    /// Transaction misuse: nested begin or reuse of a finished handle.
    #[error("transaction error: {0}")]
    TransactionState(String),
}

impl DbError {
    /// Whether the engine rejected the statement because of a constraint
    /// (UNIQUE, NOT NULL, CHECK, FOREIGN KEY, PRIMARY KEY).
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Engine(sqlx::Error::Database(err)) => {
                err.is_unique_violation()
                    || err.is_foreign_key_violation()
                    || err.is_check_violation()
                    || err.message().contains("constraint failed")
            }
            _ => false,
        }
    }
}

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(DbError::NotConnected.to_string(), "not connected to database");
        assert_eq!(
            DbError::Configuration("SQLite requires a location".into()).to_string(),
            "configuration error: SQLite requires a location"
        );
        let compile: DbError = CompileError::EmptySchema("t".into()).into();
        assert_eq!(compile.to_string(), "invalid statement: table \"t\" has no columns");
    }

    #[test]
    fn test_non_engine_errors_are_not_constraint_violations() {
        assert!(!DbError::NotConnected.is_constraint_violation());
        assert!(!DbError::Engine(sqlx::Error::RowNotFound).is_constraint_violation());
    }
}
