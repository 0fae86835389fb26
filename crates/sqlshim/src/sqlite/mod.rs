//! SQLite driver built on a single sqlx connection.

mod codec;
mod transaction;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlshim_core::{
    compile_create_table, compile_delete, compile_insert, compile_select, compile_update, Filter,
    Record, Row, SelectQuery, TableSchema,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use transaction::SqliteTransaction;

use crate::config::{ConnectionConfig, DriverKind};
use crate::driver::DatabaseDriver;
use crate::error::{DbError, Result};
use crate::output::{Changes, Inserted, Message};
use codec::{execute, fetch_all};

const IN_MEMORY: &str = ":memory:";

/// Connection state shared between the driver and its transaction handles.
#[derive(Debug, Default)]
pub(crate) struct Session {
    conn: Option<SqliteConnection>,
    /// Bumped on every connect and disconnect so stale handles can tell.
    generation: u64,
    /// Present while a transaction is open. Its handle raises the flag when
    /// dropped unfinished.
    transaction: Option<Arc<AtomicBool>>,
}

impl Session {
    /// Returns the open connection, first rolling back a transaction whose
    /// handle was dropped unfinished.
    async fn connection(&mut self) -> Result<&mut SqliteConnection> {
        let conn = self.conn.as_mut().ok_or(DbError::NotConnected)?;
        let abandoned = self
            .transaction
            .as_ref()
            .is_some_and(|dropped| dropped.load(Ordering::Acquire));
        if abandoned {
            self.transaction = None;
            warn!("Rolling back abandoned transaction");
            match execute(conn, "ROLLBACK", Vec::new()).await {
                Ok(_) => {}
                Err(err) if is_no_active_transaction(&err) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(conn)
    }

    async fn close(&mut self) -> Result<bool> {
        let Some(conn) = self.conn.take() else {
            return Ok(false);
        };
        self.generation += 1;
        self.transaction = None;
        conn.close().await.map_err(DbError::Connection)?;
        Ok(true)
    }
}

/// Whether the engine refused COMMIT or ROLLBACK because it had already
/// ended the transaction on its own.
fn is_no_active_transaction(err: &DbError) -> bool {
    matches!(
        err,
        DbError::Engine(sqlx::Error::Database(db)) if db.message().contains("no transaction is active")
    )
}

/// SQLite driver.
///
/// Holds at most one connection; operations from concurrent tasks are
/// serialized on it.
#[derive(Debug, Default)]
pub struct SqliteDriver {
    session: Arc<Mutex<Session>>,
}

impl SqliteDriver {
    /// Creates a disconnected driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn open(location: &str) -> Result<SqliteConnection> {
        let options = if location == IN_MEMORY {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(DbError::Connection)?
        } else {
            SqliteConnectOptions::new()
                .filename(location)
                .create_if_missing(true)
        };
        options.connect().await.map_err(DbError::Connection)
    }
}

impl DatabaseDriver for SqliteDriver {
    type Transaction = SqliteTransaction;

    fn kind(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        let location = config.require_location()?;
        let mut session = self.session.lock().await;
        if session.close().await? {
            info!("Closed previous connection");
        }

        let conn = Self::open(location).await?;
        session.conn = Some(conn);
        session.generation += 1;
        info!(location, "Connected to SQLite database");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.close().await? {
            info!("Disconnected from SQLite database");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.session.lock().await.conn.is_some()
    }

    async fn create_database(&self, name: &str) -> Result<Message> {
        Ok(Message {
            message: format!("Database {name} ready"),
        })
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        let mut session = self.session.lock().await;
        let conn = session.connection().await?;
        let sql = compile_create_table(schema)?;
        execute(conn, &sql, Vec::new()).await?;
        info!(table = %schema.name, "Table ready");
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<SqliteTransaction> {
        let mut session = self.session.lock().await;
        session.connection().await?;
        if session.transaction.is_some() {
            return Err(DbError::TransactionState(
                "a transaction is already open on this connection".to_string(),
            ));
        }
        execute(session.connection().await?, "BEGIN TRANSACTION", Vec::new()).await?;
        let dropped = Arc::new(AtomicBool::new(false));
        session.transaction = Some(Arc::clone(&dropped));
        info!("Transaction started");
        Ok(SqliteTransaction::new(
            Arc::clone(&self.session),
            session.generation,
            dropped,
        ))
    }

    async fn insert(&self, table: &str, record: &Record) -> Result<Inserted> {
        let mut session = self.session.lock().await;
        let conn = session.connection().await?;
        let (sql, params) = compile_insert(table, record)?;
        let result = execute(conn, &sql, params).await?;
        Ok(Inserted {
            id: result.last_insert_rowid(),
        })
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>> {
        let mut session = self.session.lock().await;
        let conn = session.connection().await?;
        let (sql, params) = compile_select(table, query)?;
        fetch_all(conn, &sql, params).await
    }

    async fn update(&self, table: &str, changes: &Record, filter: &Filter) -> Result<Changes> {
        let mut session = self.session.lock().await;
        let conn = session.connection().await?;
        let (sql, params) = compile_update(table, changes, filter)?;
        let result = execute(conn, &sql, params).await?;
        Ok(Changes {
            changes: result.rows_affected(),
        })
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<Changes> {
        let mut session = self.session.lock().await;
        let conn = session.connection().await?;
        let (sql, params) = compile_delete(table, filter)?;
        let result = execute(conn, &sql, params).await?;
        Ok(Changes {
            changes: result.rows_affected(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::TransactionHandle;
    use sqlshim_core::{ColumnDefinition, Condition, SqlValue};

    fn items() -> TableSchema {
        TableSchema::new("items")
            .column(
                ColumnDefinition::new("id", "INTEGER")
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnDefinition::new("name", "TEXT").not_null())
            .column(ColumnDefinition::new("price", "REAL"))
            .column(ColumnDefinition::new("data", "BLOB"))
    }

    async fn connected() -> SqliteDriver {
        let driver = SqliteDriver::new();
        driver.connect(&ConnectionConfig::in_memory()).await.unwrap();
        driver.create_table(&items()).await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_decodes_storage_classes() {
        let driver = connected().await;
        let record = Record::new()
            .set("name", "widget")
            .set("price", 2.5)
            .set("data", vec![0xde_u8, 0xad]);
        driver.insert("items", &record).await.unwrap();

        let rows = driver.select("items", &SelectQuery::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get("name"), Some(&SqlValue::Text("widget".into())));
        assert_eq!(row.get("price"), Some(&SqlValue::Float(2.5)));
        assert_eq!(row.get("data"), Some(&SqlValue::Blob(vec![0xde, 0xad])));
    }

    #[tokio::test]
    async fn test_null_and_bool_params() {
        let driver = connected().await;
        let record = Record::new()
            .set("name", "flag")
            .set("price", SqlValue::Null)
            .set("data", true);
        driver.insert("items", &record).await.unwrap();

        let rows = driver
            .select(
                "items",
                &SelectQuery::new().filter(Filter::new().with("price", Condition::is_null())),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("price"), Some(&SqlValue::Null));
        assert_eq!(rows[0].get("data"), Some(&SqlValue::Int(1)));
    }

    #[tokio::test]
    async fn test_reconnect_bumps_generation() {
        let driver = connected().await;
        let before = driver.session.lock().await.generation;
        driver.connect(&ConnectionConfig::in_memory()).await.unwrap();
        let after = driver.session.lock().await.generation;
        assert!(after > before);
        assert!(driver.is_connected().await);
    }

    #[tokio::test]
    async fn test_disconnect_clears_transaction_flag() {
        let driver = connected().await;
        let _tx = driver.begin_transaction().await.unwrap();
        assert!(driver.session.lock().await.transaction.is_some());
        driver.disconnect().await.unwrap();
        assert!(driver.session.lock().await.transaction.is_none());
    }

    async fn end_transaction_behind_driver(driver: &SqliteDriver) {
        let mut session = driver.session.lock().await;
        let conn = session.conn.as_mut().unwrap();
        execute(conn, "ROLLBACK", Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back_before_next_statement() {
        let driver = connected().await;
        let tx = driver.begin_transaction().await.unwrap();
        driver
            .insert("items", &Record::new().set("name", "pending"))
            .await
            .unwrap();
        drop(tx);
        assert!(driver.session.lock().await.transaction.is_some());

        let rows = driver.select("items", &SelectQuery::new()).await.unwrap();
        assert!(rows.is_empty());
        assert!(driver.session.lock().await.transaction.is_none());
    }

    #[tokio::test]
    async fn test_commit_after_engine_rollback_clears_transaction() {
        let driver = connected().await;
        let mut tx = driver.begin_transaction().await.unwrap();
        end_transaction_behind_driver(&driver).await;

        let err = tx.commit().await.unwrap_err();
        assert!(err.to_string().contains("no transaction is active"));
        assert!(tx.is_finished());
        assert!(matches!(
            tx.rollback().await,
            Err(DbError::TransactionState(_))
        ));

        let mut next = driver.begin_transaction().await.unwrap();
        next.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_after_engine_rollback_succeeds() {
        let driver = connected().await;
        let mut tx = driver.begin_transaction().await.unwrap();
        end_transaction_behind_driver(&driver).await;

        tx.rollback().await.unwrap();
        assert!(driver.session.lock().await.transaction.is_none());
        let mut next = driver.begin_transaction().await.unwrap();
        next.rollback().await.unwrap();
    }
}
