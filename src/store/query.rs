use crate::entity::{Column, Entity, EntityDescriptor};
use crate::error::Result;
use crate::results::DbModel;
use crate::sql::{
    DbModelSelector, Selector, SqlStatement, build_select_by_id, entity_to_example_filter,
};
use crate::sqlite::{Cursor, StoreSession};
use crate::types::RowValues;

use super::EntityStore;

impl EntityStore {
    /// Execute a statement that returns no rows.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the statement fails.
    pub fn exec_non_query(&self, stmt: &SqlStatement) -> Result<()> {
        let session = self.store.session()?;
        self.execute_in(&session, stmt)
    }

    /// # Errors
    /// Returns `EntityStoreError` if the statement fails.
    pub fn exec_non_query_sql(&self, sql: &str) -> Result<()> {
        self.exec_non_query(&SqlStatement::without_args(sql))
    }

    /// Run a query and hand its cursor to `consume`.
    ///
    /// The cursor lives only for the duration of `consume` and is released when
    /// it returns, on success and on error.
    ///
    /// # Deadlocks
    /// The store's connection is held while `consume` runs, so other threads
    /// wait for it. Store calls made from inside `consume` fail with
    /// `ExecutionError`; collect what the cursor yields and issue follow-up
    /// calls after this returns.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the query cannot be started, or whatever
    /// `consume` returns.
    pub fn exec_query<R, F>(&self, stmt: &SqlStatement, consume: F) -> Result<R>
    where
        F: FnOnce(&mut Cursor<'_>) -> Result<R>,
    {
        let session = self.store.session()?;
        self.query_in(&session, stmt, consume)
    }

    /// # Deadlocks
    /// Same as [`EntityStore::exec_query`]: do not call back into the store
    /// from `consume`.
    ///
    /// # Errors
    /// See [`EntityStore::exec_query`].
    pub fn exec_query_sql<R, F>(&self, sql: &str, consume: F) -> Result<R>
    where
        F: FnOnce(&mut Cursor<'_>) -> Result<R>,
    {
        self.exec_query(&SqlStatement::without_args(sql), consume)
    }

    /// Row whose key equals `id`, if any.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the table is missing, the query fails, or a
    /// column cannot be converted into its field.
    pub fn find_by_id<T: Entity>(&self, id: impl Into<RowValues>) -> Result<Option<T>> {
        let desc = self.describe::<T>();
        let stmt = build_select_by_id(&*desc, id.into());
        self.find_first_with(&*desc, &stmt)
    }

    /// First row matched by `selector`, fetched with `LIMIT 1`.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the table is missing, the query fails, or a
    /// column cannot be converted into its field.
    pub fn find_first<T: Entity>(&self, selector: &Selector<T>) -> Result<Option<T>> {
        let desc = self.describe::<T>();
        let stmt = selector.to_first_statement(desc.table_name());
        self.find_first_with(&*desc, &stmt)
    }

    /// Every row matched by `selector`, in cursor order.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the table is missing, the query fails, or a
    /// column cannot be converted into its field.
    pub fn find_all<T: Entity>(&self, selector: &Selector<T>) -> Result<Vec<T>> {
        let desc = self.describe::<T>();
        let stmt = selector.to_statement(desc.table_name());
        self.find_all_with(&*desc, &stmt)
    }

    /// First row whose columns equal every non-NULL field of `example`.
    ///
    /// # Errors
    /// See [`EntityStore::find_first`].
    pub fn find_first_like<T: Entity>(&self, example: &T) -> Result<Option<T>> {
        let desc = self.describe::<T>();
        let selector = Selector::<T>::new().filter(entity_to_example_filter(&*desc, example));
        self.find_first_with(&*desc, &selector.to_first_statement(desc.table_name()))
    }

    /// Every row whose columns equal the non-NULL fields of `example`.
    ///
    /// # Errors
    /// See [`EntityStore::find_all`].
    pub fn find_all_like<T: Entity>(&self, example: &T) -> Result<Vec<T>> {
        let desc = self.describe::<T>();
        let selector = Selector::<T>::new().filter(entity_to_example_filter(&*desc, example));
        self.find_all_with(&*desc, &selector.to_statement(desc.table_name()))
    }

    /// Number of rows matched by `selector`; limit and offset are ignored.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the table is missing or the query fails.
    pub fn count<T: Entity>(&self, selector: &Selector<T>) -> Result<i64> {
        let desc = self.describe::<T>();
        let stmt = selector.to_count_statement(desc.table_name());
        let session = self.store.session()?;
        self.query_in(&session, &stmt, |cursor| {
            Ok(cursor
                .next_values()?
                .and_then(|row| row.first().and_then(RowValues::coerce_i64))
                .unwrap_or(0))
        })
    }

    /// # Errors
    /// Returns `EntityStoreError` if the query fails.
    pub fn find_db_model_first(&self, selector: &DbModelSelector) -> Result<Option<DbModel>> {
        self.first_model(&selector.to_first_statement())
    }

    /// # Errors
    /// Returns `EntityStoreError` if the query fails.
    pub fn find_db_model_first_sql(&self, stmt: &SqlStatement) -> Result<Option<DbModel>> {
        self.first_model(stmt)
    }

    /// # Errors
    /// Returns `EntityStoreError` if the query fails.
    pub fn find_db_model_all(&self, selector: &DbModelSelector) -> Result<Vec<DbModel>> {
        self.all_models(&selector.to_statement())
    }

    /// # Errors
    /// Returns `EntityStoreError` if the query fails.
    pub fn find_db_model_all_sql(&self, stmt: &SqlStatement) -> Result<Vec<DbModel>> {
        self.all_models(stmt)
    }

    pub(super) fn execute_in(&self, session: &StoreSession<'_>, stmt: &SqlStatement) -> Result<()> {
        self.debug_sql(&stmt.sql, &stmt.args);
        session.execute(&stmt.sql, &stmt.args)?;
        Ok(())
    }

    pub(super) fn query_in<R, F>(
        &self,
        session: &StoreSession<'_>,
        stmt: &SqlStatement,
        consume: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut Cursor<'_>) -> Result<R>,
    {
        self.debug_sql(&stmt.sql, &stmt.args);
        session.query(&stmt.sql, &stmt.args, consume)
    }

    fn find_first_with<T: Entity>(
        &self,
        desc: &EntityDescriptor<T>,
        stmt: &SqlStatement,
    ) -> Result<Option<T>> {
        let session = self.store.session()?;
        self.query_in(&session, stmt, |cursor| {
            let mapping = ColumnMapping::new(desc, cursor);
            match cursor.next_values()? {
                Some(row) => mapping.hydrate(desc.table_name(), row).map(Some),
                None => Ok(None),
            }
        })
    }

    fn find_all_with<T: Entity>(
        &self,
        desc: &EntityDescriptor<T>,
        stmt: &SqlStatement,
    ) -> Result<Vec<T>> {
        let session = self.store.session()?;
        self.query_in(&session, stmt, |cursor| {
            let mapping = ColumnMapping::new(desc, cursor);
            let mut entities = Vec::new();
            while let Some(row) = cursor.next_values()? {
                entities.push(mapping.hydrate(desc.table_name(), row)?);
            }
            Ok(entities)
        })
    }

    fn first_model(&self, stmt: &SqlStatement) -> Result<Option<DbModel>> {
        let session = self.store.session()?;
        self.query_in(&session, stmt, |cursor| cursor.next_model())
    }

    fn all_models(&self, stmt: &SqlStatement) -> Result<Vec<DbModel>> {
        let session = self.store.session()?;
        self.query_in(&session, stmt, |cursor| {
            let mut models = Vec::new();
            while let Some(model) = cursor.next_model()? {
                models.push(model);
            }
            Ok(models)
        })
    }
}

/// Descriptor column for each cursor position, resolved once per query.
///
/// Result columns the entity does not declare are ignored; declared columns
/// missing from the result keep the value `T::default()` gave them.
struct ColumnMapping<'d, T> {
    columns: Vec<Option<&'d Column<T>>>,
}

impl<'d, T: Entity> ColumnMapping<'d, T> {
    fn new(desc: &'d EntityDescriptor<T>, cursor: &Cursor<'_>) -> Self {
        let columns = cursor
            .column_names()
            .iter()
            .map(|name| desc.find_column(name))
            .collect();
        Self { columns }
    }

    fn hydrate(&self, table: &str, row: Vec<RowValues>) -> Result<T> {
        let mut entity = T::default();
        for (value, column) in row.into_iter().zip(&self.columns) {
            let Some(column) = column else {
                continue;
            };
            column
                .assign(&mut entity, value)
                .map_err(|e| e.in_column(table, column.name()))?;
        }
        Ok(entity)
    }
}
