//! Error types for statement compilation.

use thiserror::Error;

/// Errors raised while turning structured calls into SQL.
///
/// These are detected before anything reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A table or column name failed the identifier allow-list.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A declared column type contains characters outside the type allow-list.
    #[error("invalid column type {sql_type:?} for column {column:?}")]
    InvalidType {
        /// Column carrying the type.
        column: String,
        /// The rejected type text.
        sql_type: String,
    },

    /// A table schema has no columns.
    #[error("table {0:?} has no columns")]
    EmptySchema(String),

    /// The same column name appears twice in one schema.
    #[error("column {column:?} is defined more than once in table {table:?}")]
    DuplicateColumn {
        /// Table being compiled.
        table: String,
        /// Repeated column name.
        column: String,
    },

    /// An operator object names more than one operator.
    #[error("condition on {field:?} has several operators: {}", .operators.join(", "))]
    AmbiguousCondition {
        /// Field the condition applies to.
        field: String,
        /// Operators found, in scan order.
        operators: Vec<&'static str>,
    },

    /// An operator object names no operator at all.
    #[error("condition on {0:?} has no operator")]
    EmptyCondition(String),

    /// An UPDATE without any assignment.
    #[error("update of table {0:?} has no assignments")]
    EmptyAssignments(String),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
