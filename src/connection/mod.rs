pub mod config;

use crate::core::{DbError, Result};
use crate::facade::{DatabaseRegistry, InMemoryDB};
use crate::result::QueryResult;
use crate::storage::Catalog;
use config::ConnectionSettings;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Database connection handle
///
/// Outside a transaction every `execute` auto-commits. Inside one,
/// statements run against a private copy-on-write snapshot of the catalog
/// that `commit` publishes and `rollback` throws away.
pub struct Connection {
    /// Unique connection ID
    id: u64,
    settings: ConnectionSettings,
    db: Arc<RwLock<InMemoryDB>>,
    state: ConnectionState,
    transaction: Option<ActiveTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Active,
    InTransaction,
    Closed,
}

struct ActiveTransaction {
    working: Catalog,
    base_version: u64,
    dirty: bool,
}

impl Connection {
    pub(crate) fn new(settings: ConnectionSettings, db: Arc<RwLock<InMemoryDB>>) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        debug!("Opened connection {} to {}", id, settings.to_url());
        Self {
            id,
            settings,
            db,
            state: ConnectionState::Active,
            transaction: None,
        }
    }

    /// Connect to the database named in `settings`, creating it in
    /// `registry` on first use.
    pub fn open(registry: &DatabaseRegistry, settings: ConnectionSettings) -> Result<Self> {
        settings.validate().map_err(DbError::ExecutionError)?;
        let db = registry.open_or_create(&settings.database)?;
        Ok(Self::new(settings, db))
    }

    /// Get connection ID
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Execute one or more SQL statements, returning the last result.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.ensure_open()?;

        match self.transaction.as_mut() {
            Some(txn) => {
                // A failing script leaves the transaction as it was.
                let mut working = txn.working.clone();
                let (result, mutated) = self.db.read()?.run(&mut working, sql)?;
                if mutated {
                    txn.working = working;
                    txn.dirty = true;
                }
                Ok(result)
            }
            None => self.db.write()?.execute(sql),
        }
    }

    /// Execute a statement and return the number of affected rows.
    pub fn exec(&mut self, sql: &str) -> Result<usize> {
        let result = self.execute(sql)?;
        Ok(result.rows_affected)
    }

    pub fn begin(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.state == ConnectionState::InTransaction {
            return Err(DbError::TransactionError("Transaction already active".into()));
        }

        let (working, base_version) = self.db.read()?.snapshot();
        self.transaction = Some(ActiveTransaction {
            working,
            base_version,
            dirty: false,
        });
        self.state = ConnectionState::InTransaction;
        Ok(())
    }

    /// Commit the current transaction.
    ///
    /// On a write conflict the transaction is rolled back and the conflict
    /// returned; the connection is back in auto-commit mode either way.
    pub fn commit(&mut self) -> Result<()> {
        let txn = self.take_transaction()?;
        if !txn.dirty {
            return Ok(());
        }

        let mut db = self.db.write()?;
        db.publish(txn.working, txn.base_version).inspect_err(|e| {
            warn!("Connection {}: commit failed, transaction rolled back: {}", self.id, e);
        })
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.take_transaction().map(|_| ())
    }

    pub fn is_in_transaction(&self) -> bool {
        self.state == ConnectionState::InTransaction
    }

    pub fn is_active(&self) -> bool {
        self.state != ConnectionState::Closed
    }

    /// Close the connection, rolling back any open transaction.
    pub fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::InTransaction {
            self.rollback()?;
        }
        if self.state != ConnectionState::Closed {
            debug!("Closed connection {}", self.id);
        }
        self.state = ConnectionState::Closed;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(DbError::ExecutionError("Connection is closed".into()));
        }
        Ok(())
    }

    fn take_transaction(&mut self) -> Result<ActiveTransaction> {
        if self.state != ConnectionState::InTransaction {
            return Err(DbError::TransactionError("No active transaction".into()));
        }
        self.state = ConnectionState::Active;
        self.transaction
            .take()
            .ok_or_else(|| DbError::TransactionError("No active transaction".into()))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Ensure connection is closed and transaction rolled back
        let _ = self.close();
    }
}
