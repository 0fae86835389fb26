//! The driver abstraction implemented once per engine.

use std::future::Future;

use sqlshim_core::{Filter, Record, Row, SelectQuery, TableSchema};

use crate::config::{ConnectionConfig, DriverKind};
use crate::error::Result;
use crate::output::{Changes, Inserted, Message};

/// Connection lifecycle, schema creation and CRUD against one engine.
///
/// # Errors
///
/// Every operation other than `connect`, `disconnect` and `create_database`
/// fails with [`DbError::NotConnected`](crate::DbError::NotConnected) while
/// the driver is disconnected. Statements that cannot be compiled fail with
/// `DbError::Compile` and engine failures surface as `DbError::Engine`.
pub trait DatabaseDriver: Send + Sync {
    /// Handle returned by [`begin_transaction`](Self::begin_transaction).
    type Transaction: TransactionHandle;

    /// Which engine this driver talks to.
    fn kind(&self) -> DriverKind;

    /// Opens the engine handle, closing any previous one.
    fn connect(&self, config: &ConnectionConfig) -> impl Future<Output = Result<()>> + Send;

    /// Closes the engine handle. Calling it while disconnected is a no-op.
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Whether a connection is currently open.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Prepares a named database. Embedded engines have nothing to create.
    fn create_database(&self, name: &str) -> impl Future<Output = Result<Message>> + Send;

    /// Creates a table if it does not already exist.
    fn create_table(&self, schema: &TableSchema) -> impl Future<Output = Result<()>> + Send;

    /// Starts a transaction on the driver's single connection.
    fn begin_transaction(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;

    /// Inserts one row and returns the engine's row id for it.
    fn insert(&self, table: &str, record: &Record) -> impl Future<Output = Result<Inserted>> + Send;

    /// Returns the matching rows, in engine order.
    fn select(
        &self,
        table: &str,
        query: &SelectQuery,
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Applies `changes` to matching rows and reports how many changed.
    fn update(
        &self,
        table: &str,
        changes: &Record,
        filter: &Filter,
    ) -> impl Future<Output = Result<Changes>> + Send;

    /// Deletes matching rows and reports how many were removed.
    fn delete(&self, table: &str, filter: &Filter) -> impl Future<Output = Result<Changes>> + Send;
}

/// An open transaction. Each handle finishes at most once.
pub trait TransactionHandle: Send {
    /// Makes the transaction's writes permanent.
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Discards the transaction's writes.
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether commit or rollback has already succeeded.
    fn is_finished(&self) -> bool;
}
