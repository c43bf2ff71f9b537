use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use rusqlite::Connection;

use crate::error::{EntityStoreError, Result};
use crate::sql::{KeyValue, SqlStatement, insert_statement};
use crate::types::RowValues;

use super::params::Params;
use super::query::Cursor;
use super::transaction::{TransactionScope, rollback_with_busy_retries};

/// Counters describing how the store has been used.
///
/// `round_trips` counts statements sent to `SQLite` through a session (transaction
/// control excluded). The cursor counters only move when a query actually
/// produced a cursor.
#[derive(Debug, Default)]
pub struct StoreStats {
    round_trips: AtomicU64,
    cursors_opened: AtomicU64,
    cursors_released: AtomicU64,
}

impl StoreStats {
    #[must_use]
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cursors_opened(&self) -> u64 {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cursors_released(&self) -> u64 {
        self.cursors_released.load(Ordering::SeqCst)
    }

    /// Cursors opened but not yet released.
    #[must_use]
    pub fn open_cursors(&self) -> u64 {
        self.cursors_opened()
            .saturating_sub(self.cursors_released())
    }

    fn round_trip(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn cursor_opened(&self) {
        self.cursors_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn cursor_released(&self) {
        self.cursors_released.fetch_add(1, Ordering::SeqCst);
    }
}

/// The single `SQLite` connection behind one logical database.
///
/// The connection is opened eagerly and held for the life of the store. Callers
/// take a [`StoreSession`] to use it; sessions are serialized by the connection
/// lock, which is the only locking the store applies.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    holder: Mutex<Option<ThreadId>>,
    stats: StoreStats,
    location: String,
}

impl SqliteStore {
    /// Open (creating if needed) a file-backed database, creating parent directories.
    ///
    /// # Errors
    /// Returns `EntityStoreError::ConnectionError` if the directory or file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EntityStoreError::ConnectionError(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| {
            EntityStoreError::ConnectionError(format!(
                "Failed to open SQLite database {}: {e}",
                path.display()
            ))
        })?;
        Self::from_connection(conn, path.display().to_string())
    }

    /// # Errors
    /// Returns `EntityStoreError::ConnectionError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EntityStoreError::ConnectionError(format!("Failed to open in-memory SQLite: {e}"))
        })?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(EntityStoreError::SqliteError)?;
        Ok(Self {
            conn: Mutex::new(conn),
            holder: Mutex::new(None),
            stats: StoreStats::default(),
            location,
        })
    }

    /// Take the connection lock.
    ///
    /// A lock poisoned by a panicking holder is recovered; any transaction that
    /// holder left open is rolled back first.
    ///
    /// # Deadlocks
    /// The lock is not reentrant. A second session requested by the thread that
    /// already holds one is refused rather than left waiting on itself.
    ///
    /// # Errors
    /// Returns `EntityStoreError::ExecutionError` if the calling thread already
    /// holds a session on this store.
    pub fn session(&self) -> Result<StoreSession<'_>> {
        let me = thread::current().id();
        if *lock_recovering(&self.holder) == Some(me) {
            tracing::warn!(db = %self.location, "store re-entered while a session is held");
            return Err(EntityStoreError::ExecutionError(
                "store re-entered while a session is held".into(),
            ));
        }
        let conn = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(db = %self.location, "SQLite connection lock poisoned; recovering");
                let guard = poisoned.into_inner();
                if !guard.is_autocommit() {
                    if let Err(err) = rollback_with_busy_retries(&guard) {
                        tracing::error!(db = %self.location, error = %err, "rollback of abandoned transaction failed");
                    }
                }
                guard
            }
        };
        *lock_recovering(&self.holder) = Some(me);
        Ok(StoreSession {
            conn,
            holder: &self.holder,
            stats: &self.stats,
        })
    }

    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Path of the database file, or `:memory:`.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Exclusive use of the store's connection for the duration of a call.
pub struct StoreSession<'a> {
    conn: MutexGuard<'a, Connection>,
    holder: &'a Mutex<Option<ThreadId>>,
    stats: &'a StoreStats,
}

impl Drop for StoreSession<'_> {
    fn drop(&mut self) {
        // Cleared before the connection guard is released.
        *lock_recovering(self.holder) = None;
    }
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl StoreSession<'_> {
    /// Execute a statement that returns no rows.
    ///
    /// # Errors
    /// Returns `EntityStoreError::SqliteError` if preparing or executing fails.
    pub fn execute(&self, sql: &str, args: &[RowValues]) -> Result<usize> {
        self.stats.round_trip();
        let params = Params::convert(args);
        let refs = params.as_refs();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let affected = stmt.execute(&refs[..])?;
        Ok(affected)
    }

    /// Execute one or more `;`-separated statements without arguments.
    ///
    /// # Errors
    /// Returns `EntityStoreError::SqliteError` if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.stats.round_trip();
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a query and hand its cursor to `consume`.
    ///
    /// The cursor is opened right before `consume` runs and released as soon as
    /// it returns, whatever it returns.
    ///
    /// # Errors
    /// Returns `EntityStoreError::SqliteError` if preparing or starting the query
    /// fails, otherwise whatever `consume` returns.
    pub fn query<R, F>(&self, sql: &str, args: &[RowValues], consume: F) -> Result<R>
    where
        F: FnOnce(&mut Cursor<'_>) -> Result<R>,
    {
        self.stats.round_trip();
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Arc<Vec<String>> = Arc::new(
            stmt.column_names()
                .iter()
                .map(std::string::ToString::to_string)
                .collect(),
        );
        let params = Params::convert(args);
        let refs = params.as_refs();
        let rows = stmt.query(&refs[..])?;
        let mut cursor = Cursor::open(rows, columns, self.stats);
        consume(&mut cursor)
    }

    /// Insert a row built from column/value pairs.
    ///
    /// Returns the new row id, or `None` (the "no row inserted" sentinel) when
    /// `SQLite` rejected the row. The rejection is logged, not returned.
    #[must_use]
    pub fn insert(&self, table: &str, values: &[KeyValue]) -> Option<i64> {
        self.insert_statement(table, &insert_statement(table, values))
    }

    /// [`StoreSession::insert`] for an already built `INSERT`.
    #[must_use]
    pub fn insert_statement(&self, table: &str, statement: &SqlStatement) -> Option<i64> {
        match self.execute(&statement.sql, &statement.args) {
            Ok(_) => Some(self.conn.last_insert_rowid()),
            Err(err) => {
                tracing::warn!(table, error = %err, "insert rejected; no row inserted");
                None
            }
        }
    }

    /// Begin a transaction when `enabled`; otherwise a scope whose calls are no-ops.
    ///
    /// # Errors
    /// Returns `EntityStoreError::SqliteError` if `BEGIN` fails.
    pub fn begin_transaction(&self, enabled: bool) -> Result<TransactionScope<'_>> {
        TransactionScope::begin(&self.conn, enabled)
    }

    /// # Errors
    /// Returns `EntityStoreError::SqliteError` if the pragma cannot be read.
    pub fn user_version(&self) -> Result<i32> {
        self.stats.round_trip();
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// # Errors
    /// Returns `EntityStoreError::SqliteError` if the pragma cannot be written.
    pub fn set_user_version(&self, version: i32) -> Result<()> {
        self.execute_batch(&format!("PRAGMA user_version = {version}"))
    }

    /// Whether the connection is outside any transaction.
    #[must_use]
    pub fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }
}
