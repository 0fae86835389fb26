//! # sqlshim
//!
//! A uniform async CRUD and schema API over an embedded SQL engine.
//!
//! Callers describe tables, rows and filters as data; the driver compiles them
//! into parameterized SQL (see [`sqlshim_core`]) and runs them on a single
//! engine connection.
//!
//! ## Example
//!
//! ```rust
//! use sqlshim::{
//!     ColumnDefinition, ConnectionConfig, Database, Filter, Record, SelectQuery, TableSchema,
//! };
//!
//! # tokio_test::block_on(async {
//! let db = Database::new("sqlite")?;
//! db.connect(&ConnectionConfig::in_memory()).await?;
//!
//! let users = TableSchema::new("users")
//!     .column(ColumnDefinition::new("id", "INTEGER").primary_key().auto_increment())
//!     .column(ColumnDefinition::new("username", "TEXT").not_null().unique());
//! db.create_table(&users).await?;
//!
//! let inserted = db.insert("users", &Record::new().set("username", "alice")).await?;
//! assert_eq!(inserted.id, 1);
//!
//! let rows = db
//!     .select("users", &SelectQuery::new().filter(Filter::new().eq("username", "alice")))
//!     .await?;
//! assert_eq!(rows.len(), 1);
//!
//! db.disconnect().await?;
//! # Ok::<(), sqlshim::DbError>(())
//! # }).unwrap();
//! ```
//!
//! Failures are ordinary `Result`s. [`QueryResult`] turns any of them into
//! the `{success, data, error}` envelope when a flag-style result is wanted.

pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod output;
pub mod sqlite;

pub use config::{ConnectionConfig, DriverKind};
pub use database::{Database, Transaction};
pub use driver::{DatabaseDriver, TransactionHandle};
pub use error::{DbError, Result};
pub use output::{Changes, Inserted, Message, QueryResult};
pub use sqlite::{SqliteDriver, SqliteTransaction};

pub use sqlshim_core::{
    ColumnDefinition, CompareOp, CompileError, Condition, DefaultValue, Filter, Join, JoinKind,
    JoinOn, OperatorSet, Record, Row, SelectQuery, SqlValue, TableSchema, ToSqlValue,
};
