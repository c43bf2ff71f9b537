use crate::entity::{Entity, EntityDescriptor};
use crate::error::Result;
use crate::sql::{SqlStatement, build_create_table, quote_ident};
use crate::sqlite::StoreSession;
use crate::types::RowValues;

use super::EntityStore;

const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) AS c FROM sqlite_master WHERE type = 'table' AND name = ?";

// `sqlite_sequence` and friends belong to SQLite and cannot be dropped.
const LIST_TABLES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name";

impl EntityStore {
    /// Whether the table for `T` exists.
    ///
    /// Once a probe has seen the table, later calls answer from the descriptor
    /// without touching the database.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the catalog probe fails.
    pub fn table_is_exist<T: Entity>(&self) -> Result<bool> {
        let desc = self.describe::<T>();
        if desc.is_table_checked() {
            return Ok(true);
        }
        let session = self.store.session()?;
        self.table_exists_in(&session, &*desc)
    }

    /// Create the table for `T` unless it is already known to exist.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the probe or the `CREATE TABLE` fails.
    pub fn ensure_table_exists<T: Entity>(&self) -> Result<()> {
        let desc = self.describe::<T>();
        if desc.is_table_checked() {
            return Ok(());
        }
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)
    }

    /// Issue `CREATE TABLE IF NOT EXISTS` for `T` without consulting the cache.
    ///
    /// This is how a table dropped behind the store's back is brought back; the
    /// cache would otherwise keep reporting it as present.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the statement fails.
    pub fn create_table<T: Entity>(&self) -> Result<()> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.execute_in(&session, &build_create_table(&*desc))?;
        desc.mark_table_checked();
        Ok(())
    }

    /// Drop every user table in the database.
    ///
    /// Tables are retried until no more can be dropped, so foreign-key order
    /// does not matter. A table that still fails is logged and skipped; only a
    /// failure to list the tables is returned. Cached exists-flags are left
    /// untouched.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the catalog cannot be read.
    pub fn drop_db(&self) -> Result<()> {
        let session = self.store.session()?;
        self.drop_db_in(&session)
    }

    pub(super) fn table_exists_in<T>(
        &self,
        session: &StoreSession<'_>,
        desc: &EntityDescriptor<T>,
    ) -> Result<bool> {
        if desc.is_table_checked() {
            return Ok(true);
        }
        let probe = SqlStatement::new(
            TABLE_EXISTS_SQL,
            vec![RowValues::Text(desc.table_name().to_string())],
        );
        let count = self.query_in(session, &probe, |cursor| {
            Ok(cursor
                .next_values()?
                .and_then(|row| row.first().and_then(RowValues::coerce_i64))
                .unwrap_or(0))
        })?;
        if count > 0 {
            desc.mark_table_checked();
            return Ok(true);
        }
        Ok(false)
    }

    pub(super) fn ensure_table_in<T>(
        &self,
        session: &StoreSession<'_>,
        desc: &EntityDescriptor<T>,
    ) -> Result<()> {
        if self.table_exists_in(session, desc)? {
            return Ok(());
        }
        self.execute_in(session, &build_create_table(desc))?;
        desc.mark_table_checked();
        Ok(())
    }

    pub(super) fn drop_db_in(&self, session: &StoreSession<'_>) -> Result<()> {
        // Collect first: dropping while the catalog cursor is open locks the table.
        let names = self.query_in(session, &SqlStatement::without_args(LIST_TABLES_SQL), |cursor| {
            let mut names = Vec::new();
            while let Some(row) = cursor.next_values()? {
                if let Some(RowValues::Text(name)) = row.into_iter().next() {
                    names.push(name);
                }
            }
            Ok(names)
        })?;

        // A parent table referenced by rows of a child cannot go first, so keep
        // passing over what is left until a pass drops nothing.
        let mut remaining = names;
        loop {
            let before = remaining.len();
            let mut failures = Vec::new();
            remaining.retain(|name| {
                let drop = SqlStatement::without_args(format!("DROP TABLE {}", quote_ident(name)));
                match self.execute_in(session, &drop) {
                    Ok(()) => false,
                    Err(err) => {
                        failures.push((name.clone(), err));
                        true
                    }
                }
            });
            if remaining.is_empty() || remaining.len() == before {
                for (name, err) in failures {
                    tracing::error!(table = %name, error = %err, "drop table failed; continuing");
                }
                break;
            }
        }
        Ok(())
    }
}
