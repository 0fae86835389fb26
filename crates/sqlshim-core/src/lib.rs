//! # sqlshim-core
//!
//! Engine-agnostic building blocks of the sqlshim CRUD layer.
//!
//! This crate provides:
//! - [`SqlValue`], the value model that travels as bound parameters
//! - Identifier validation and quoting
//! - The condition, join and schema compilers
//! - Full statement compilation for insert, select, update and delete
//!
//! Nothing here talks to a database. Every compiler returns SQL text plus an
//! ordered parameter list which a driver hands to the engine unchanged.
//!
//! ## Example
//!
//! ```rust
//! use sqlshim_core::{Condition, Filter, SelectQuery, compile_select};
//!
//! let query = SelectQuery::new()
//!     .columns(["id", "username"])
//!     .filter(Filter::new().with("age", Condition::gte(18)));
//!
//! let (sql, params) = compile_select("users", &query).unwrap();
//! assert_eq!(sql, r#"SELECT "id", "username" FROM "users" WHERE "age" >= ?"#);
//! assert_eq!(params.len(), 1);
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Literal values are never interpolated; they are always bound. Identifiers
//! are checked against an allow-list and quoted, so a hostile table or column
//! name is rejected before any SQL is produced:
//!
//! ```rust
//! use sqlshim_core::{CompileError, Filter, compile_delete};
//!
//! let err = compile_delete("users; DROP TABLE users", &Filter::new()).unwrap_err();
//! assert!(matches!(err, CompileError::InvalidIdentifier(_)));
//! ```

pub mod condition;
pub mod error;
pub mod ident;
pub mod join;
pub mod record;
pub mod row;
pub mod schema;
pub mod statement;
pub mod value;

pub use condition::{compile_filter, CompareOp, Condition, Filter, OperatorSet};
pub use error::{CompileError, Result};
pub use ident::{quote_column, quote_identifier};
pub use join::{compile_joins, Join, JoinKind, JoinOn};
pub use record::Record;
pub use row::Row;
pub use schema::{compile_create_table, ColumnDefinition, DefaultValue, TableSchema};
pub use statement::{compile_delete, compile_insert, compile_select, compile_update, SelectQuery};
pub use value::{SqlValue, ToSqlValue};
