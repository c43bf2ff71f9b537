use std::thread;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{EntityStoreError, Result};

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

pub(crate) fn rollback_with_busy_retries(conn: &Connection) -> Result<()> {
    for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
        let result = conn
            .execute_batch("ROLLBACK")
            .map_err(EntityStoreError::SqliteError);

        match &result {
            Ok(()) => return result,
            Err(EntityStoreError::SqliteError(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
            {
                thread::sleep(delay);
            }
            _ => return result,
        }
    }

    Err(EntityStoreError::ExecutionError(
        "rollback retries exhausted".into(),
    ))
}

/// Begin / mark-successful / end envelope around a unit of work.
///
/// `end` commits when the scope was marked successful and rolls back otherwise.
/// A scope dropped without `end` rolls back. A disabled scope (transactions
/// turned off for the store) does nothing at any step, so work done under it is
/// applied statement by statement.
#[derive(Debug)]
pub struct TransactionScope<'c> {
    conn: Option<&'c Connection>,
    successful: bool,
}

impl<'c> TransactionScope<'c> {
    pub(crate) fn begin(conn: &'c Connection, enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(Self {
                conn: None,
                successful: false,
            });
        }
        conn.execute_batch("BEGIN EXCLUSIVE")?;
        Ok(Self {
            conn: Some(conn),
            successful: false,
        })
    }

    /// Whether this scope owns a real `SQLite` transaction.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.conn.is_some()
    }

    pub fn set_successful(&mut self) {
        self.successful = true;
    }

    /// Commit or roll back, depending on whether the scope was marked successful.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if `COMMIT` or `ROLLBACK` fails. A failed
    /// commit is followed by a rollback attempt so the connection is left usable.
    pub fn end(mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if !self.successful {
            return rollback_with_busy_retries(conn);
        }
        if let Err(err) = conn.execute_batch("COMMIT") {
            if !conn.is_autocommit() {
                if let Err(rollback_err) = rollback_with_busy_retries(conn) {
                    tracing::error!(error = %rollback_err, "rollback after failed commit failed");
                }
            }
            return Err(err.into());
        }
        Ok(())
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = rollback_with_busy_retries(conn) {
                tracing::error!(error = %err, "rollback of abandoned transaction failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER);").unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn unmarked_scope_rolls_back() {
        let conn = conn();
        let scope = TransactionScope::begin(&conn, true).unwrap();
        conn.execute_batch("INSERT INTO t VALUES (1);").unwrap();
        scope.end().unwrap();
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn marked_scope_commits() {
        let conn = conn();
        let mut scope = TransactionScope::begin(&conn, true).unwrap();
        conn.execute_batch("INSERT INTO t VALUES (1);").unwrap();
        scope.set_successful();
        scope.end().unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let conn = conn();
        {
            let _scope = TransactionScope::begin(&conn, true).unwrap();
            conn.execute_batch("INSERT INTO t VALUES (1);").unwrap();
        }
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn disabled_scope_applies_immediately() {
        let conn = conn();
        let scope = TransactionScope::begin(&conn, false).unwrap();
        assert!(!scope.is_active());
        conn.execute_batch("INSERT INTO t VALUES (1);").unwrap();
        scope.end().unwrap();
        assert_eq!(count(&conn), 1);
    }
}
