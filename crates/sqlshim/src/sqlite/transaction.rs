use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::codec::execute;
use super::{is_no_active_transaction, Session};
use crate::driver::TransactionHandle;
use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    RolledBack,
    /// The connection it was opened on is gone.
    Orphaned,
}

/// Transaction handle bound to the connection it was opened on.
///
/// Dropping an open handle queues a rollback that runs before the next
/// statement on the connection.
#[derive(Debug)]
pub struct SqliteTransaction {
    session: Arc<Mutex<Session>>,
    generation: u64,
    dropped: Arc<AtomicBool>,
    state: State,
}

impl SqliteTransaction {
    pub(super) const fn new(
        session: Arc<Mutex<Session>>,
        generation: u64,
        dropped: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session,
            generation,
            dropped,
            state: State::Open,
        }
    }

    async fn finish(&mut self, statement: &str, next: State) -> Result<()> {
        match self.state {
            State::Open => {}
            State::Committed => {
                return Err(DbError::TransactionState(
                    "transaction already committed".to_string(),
                ))
            }
            State::RolledBack => {
                return Err(DbError::TransactionState(
                    "transaction already rolled back".to_string(),
                ))
            }
            State::Orphaned => return Err(DbError::NotConnected),
        }

        let mut session = self.session.lock().await;
        if session.generation != self.generation || session.conn.is_none() {
            self.state = State::Orphaned;
            return Err(DbError::NotConnected);
        }

        let outcome = execute(session.connection().await?, statement, Vec::new()).await;
        match outcome {
            Ok(_) => {
                session.transaction = None;
                self.state = next;
                info!(statement, "Transaction finished");
                Ok(())
            }
            Err(err) if is_no_active_transaction(&err) => {
                session.transaction = None;
                self.state = State::RolledBack;
                warn!(statement, "Transaction was already rolled back by the engine");
                if next == State::RolledBack {
                    Ok(())
                } else {
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }
}

impl TransactionHandle for SqliteTransaction {
    async fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT", State::Committed).await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK", State::RolledBack).await
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, State::Committed | State::RolledBack)
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.state == State::Open {
            self.dropped.store(true, Ordering::Release);
            warn!("Transaction dropped without commit or rollback, queued rollback");
        }
    }
}
