//! Database layer for the playground tree engine.
//!
//! Every structural mutation runs inside [`Database::with_tx`], which opens an
//! `IMMEDIATE` transaction: the writer lock is taken before the first read, so
//! concurrent appends and reorders against the same sibling group serialize
//! across threads and across processes sharing the database file.

pub mod access;
pub mod collections;
pub mod duplicate;
pub mod folders;
pub mod hierarchy;
pub mod items;
pub mod kanban;
pub mod kanban_tasks;
pub mod positions;
pub mod rows;
pub mod workspaces;

use crate::error::{ApiError, ApiResult};
use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Default time to wait for another writer before failing.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Default upper bound on ancestor-walk length.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    max_depth: usize,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_timeout(path, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Open or create the database, waiting up to `busy_timeout` for locks.
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a sibling-group rewrite holds the writer lock
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;",
        )?;
        conn.busy_timeout(busy_timeout)?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            max_depth: DEFAULT_MAX_DEPTH,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            max_depth: DEFAULT_MAX_DEPTH,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Bound folder nesting; root folders sit at level 1.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ApiError::internal("database connection lock poisoned"))
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Connection) -> ApiResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a function inside one `IMMEDIATE` transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls back
    /// every read-dependent write made by `f`.
    pub fn with_tx<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> ApiResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a new time-ordered identifier.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
