//! Front façade selecting a driver by kind.

use std::str::FromStr;

use sqlshim_core::{Filter, Record, Row, SelectQuery, TableSchema};

use crate::config::{ConnectionConfig, DriverKind};
use crate::driver::{DatabaseDriver, TransactionHandle};
use crate::error::Result;
use crate::output::{Changes, Inserted, Message};
use crate::sqlite::{SqliteDriver, SqliteTransaction};

#[derive(Debug)]
enum Driver {
    Sqlite(SqliteDriver),
}

/// Database handle that forwards every call to the driver chosen at
/// construction.
///
/// ```rust
/// use sqlshim::{Database, DbError};
///
/// assert!(Database::new("sqlite").is_ok());
/// assert!(matches!(Database::new("oracle"), Err(DbError::Configuration(_))));
/// ```
#[derive(Debug)]
pub struct Database {
    driver: Driver,
}

/// A transaction opened through [`Database::begin_transaction`].
#[derive(Debug)]
pub enum Transaction {
    Sqlite(SqliteTransaction),
}

impl Database {
    /// Creates a disconnected database for the named driver kind.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Configuration` for an unknown kind.
    pub fn new(kind: &str) -> Result<Self> {
        Ok(Self::with_kind(DriverKind::from_str(kind)?))
    }

    /// Creates a disconnected database for a known driver kind.
    #[must_use]
    pub fn with_kind(kind: DriverKind) -> Self {
        let driver = match kind {
            DriverKind::Sqlite => Driver::Sqlite(SqliteDriver::new()),
        };
        Self { driver }
    }

    /// Which engine the selected driver talks to.
    #[must_use]
    pub fn kind(&self) -> DriverKind {
        match &self.driver {
            Driver::Sqlite(driver) => driver.kind(),
        }
    }

    /// Opens the connection, closing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Configuration` without a location and
    /// `DbError::Connection` when the engine cannot open it.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.connect(config).await,
        }
    }

    /// Closes the connection. A no-op while disconnected.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` when the engine fails to close cleanly.
    pub async fn disconnect(&self) -> Result<()> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.disconnect().await,
        }
    }

    /// Whether a connection is open.
    pub async fn is_connected(&self) -> bool {
        match &self.driver {
            Driver::Sqlite(driver) => driver.is_connected().await,
        }
    }

    /// Prepares a named database; embedded engines only acknowledge it.
    ///
    /// # Errors
    ///
    /// Never fails for SQLite.
    pub async fn create_database(&self, name: &str) -> Result<Message> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.create_database(name).await,
        }
    }

    /// Creates a table unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotConnected`, `DbError::Compile` for an invalid
    /// schema, or `DbError::Engine`.
    pub async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.create_table(schema).await,
        }
    }

    /// Starts a transaction on the connection.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotConnected`, or `DbError::TransactionState` while
    /// another transaction is open.
    pub async fn begin_transaction(&self) -> Result<Transaction> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.begin_transaction().await.map(Transaction::Sqlite),
        }
    }

    /// Inserts one row and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotConnected`, `DbError::Compile` for an invalid
    /// identifier, or `DbError::Engine` (e.g. a constraint violation).
    pub async fn insert(&self, table: &str, record: &Record) -> Result<Inserted> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.insert(table, record).await,
        }
    }

    /// Returns every matching row; no match is an empty vector.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotConnected`, `DbError::Compile`, or
    /// `DbError::Engine`.
    pub async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.select(table, query).await,
        }
    }

    /// Applies `changes` to matching rows. An empty filter matches all rows.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotConnected`, `DbError::Compile` (including empty
    /// `changes`), or `DbError::Engine`.
    pub async fn update(&self, table: &str, changes: &Record, filter: &Filter) -> Result<Changes> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.update(table, changes, filter).await,
        }
    }

    /// Deletes matching rows. An empty filter matches all rows.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotConnected`, `DbError::Compile`, or
    /// `DbError::Engine`.
    pub async fn delete(&self, table: &str, filter: &Filter) -> Result<Changes> {
        match &self.driver {
            Driver::Sqlite(driver) => driver.delete(table, filter).await,
        }
    }
}

impl FromStr for Database {
    type Err = crate::error::DbError;

    fn from_str(kind: &str) -> Result<Self> {
        Self::new(kind)
    }
}

impl TransactionHandle for Transaction {
    async fn commit(&mut self) -> Result<()> {
        match self {
            Self::Sqlite(tx) => tx.commit().await,
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        match self {
            Self::Sqlite(tx) => tx.rollback().await,
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            Self::Sqlite(tx) => tx.is_finished(),
        }
    }
}

impl Transaction {
    /// Commits without importing [`TransactionHandle`].
    ///
    /// # Errors
    ///
    /// Returns `DbError::TransactionState` on a finished handle and
    /// `DbError::NotConnected` after the connection it was opened on closed.
    pub async fn commit(&mut self) -> Result<()> {
        TransactionHandle::commit(self).await
    }

    /// Rolls back without importing [`TransactionHandle`].
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::commit`].
    pub async fn rollback(&mut self) -> Result<()> {
        TransactionHandle::rollback(self).await
    }
}
