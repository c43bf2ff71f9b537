use crate::entity::{Entity, EntityDescriptor};
use crate::error::{EntityStoreError, Result};
use crate::sql::{
    WhereBuilder, build_delete, build_delete_by_id, build_delete_where, build_insert,
    build_update, build_update_where, entity_to_key_values, insert_statement,
};
use crate::sqlite::StoreSession;
use crate::types::RowValues;

use super::EntityStore;

impl EntityStore {
    /// Insert `entity`. The generated key, if any, is not written back.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the table cannot be created or the insert fails.
    pub fn save<T: Entity>(&self, entity: &T) -> Result<()> {
        self.save_all(std::slice::from_ref(entity))
    }

    /// Insert every entity, stopping at the first failure.
    ///
    /// With transactions enabled nothing is kept after a failure; without them
    /// the rows inserted before it remain.
    ///
    /// # Errors
    /// Returns the first failure.
    pub fn save_all<T: Entity>(&self, entities: &[T]) -> Result<()> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)?;
        self.in_transaction(&session, || {
            for entity in entities {
                self.execute_in(&session, &build_insert(&*desc, entity))?;
            }
            Ok(())
        })
    }

    /// Update `entity` when its key is populated, otherwise insert it and bind
    /// the generated key.
    ///
    /// # Errors
    /// Returns `EntityStoreError::BindingIdFailed` if the insert is rejected, or
    /// any failure of the update.
    pub fn save_or_update<T: Entity>(&self, entity: &mut T) -> Result<()> {
        self.save_or_update_all(std::slice::from_mut(entity))
    }

    /// [`EntityStore::save_or_update`] for each entity, in one envelope.
    ///
    /// # Errors
    /// Returns the first failure.
    pub fn save_or_update_all<T: Entity>(&self, entities: &mut [T]) -> Result<()> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)?;
        self.in_transaction(&session, || {
            for entity in entities.iter_mut() {
                if desc.id().has_value(entity) {
                    self.execute_in(&session, &build_update(&*desc, entity)?)?;
                } else if !self.save_binding_id_in(&session, &*desc, entity)? {
                    return Err(binding_failed(&*desc));
                }
            }
            Ok(())
        })
    }

    /// Insert `entity` and write the generated row id into its key field.
    ///
    /// Returns `false`, leaving the key untouched, when `SQLite` rejected the
    /// row or the entity has nothing to insert.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the table cannot be created or the key
    /// setter rejects the row id.
    pub fn save_binding_id<T: Entity>(&self, entity: &mut T) -> Result<bool> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)?;
        self.in_transaction(&session, || {
            self.save_binding_id_in(&session, &*desc, entity)
        })
    }

    /// [`EntityStore::save_binding_id`] for each entity; any rejected row fails
    /// the whole batch.
    ///
    /// # Errors
    /// Returns `EntityStoreError::BindingIdFailed` for the first rejected row.
    pub fn save_binding_id_all<T: Entity>(&self, entities: &mut [T]) -> Result<()> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)?;
        self.in_transaction(&session, || {
            for entity in entities.iter_mut() {
                if !self.save_binding_id_in(&session, &*desc, entity)? {
                    return Err(binding_failed(&*desc));
                }
            }
            Ok(())
        })
    }

    /// Update every non-key column of `entity`, matched on its key.
    ///
    /// # Errors
    /// Returns `EntityStoreError::MissingPrimaryKey` if the key is unset, or
    /// any failure of the update.
    pub fn update<T: Entity>(&self, entity: &T) -> Result<()> {
        self.update_all(std::slice::from_ref(entity))
    }

    /// # Errors
    /// Returns the first failure.
    pub fn update_all<T: Entity>(&self, entities: &[T]) -> Result<()> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)?;
        self.in_transaction(&session, || {
            for entity in entities {
                self.execute_in(&session, &build_update(&*desc, entity)?)?;
            }
            Ok(())
        })
    }

    /// Set `columns` (every non-key column when empty) from `entity` on the
    /// rows matching `filter`.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if no column would be set or the update fails.
    pub fn update_where<T: Entity>(
        &self,
        entity: &T,
        filter: &WhereBuilder,
        columns: &[&str],
    ) -> Result<()> {
        let desc = self.describe::<T>();
        let stmt = build_update_where(&*desc, entity, filter, columns)?;
        let session = self.store.session()?;
        self.ensure_table_in(&session, &*desc)?;
        self.in_transaction(&session, || self.execute_in(&session, &stmt))
    }

    /// Delete the row matching `entity`'s key.
    ///
    /// # Errors
    /// Returns `EntityStoreError::MissingPrimaryKey` if the key is unset, or
    /// any failure of the delete (including a missing table).
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<()> {
        self.delete_all(std::slice::from_ref(entity))
    }

    /// # Errors
    /// Returns the first failure.
    pub fn delete_all<T: Entity>(&self, entities: &[T]) -> Result<()> {
        let desc = self.describe::<T>();
        let session = self.store.session()?;
        self.in_transaction(&session, || {
            for entity in entities {
                self.execute_in(&session, &build_delete(&*desc, entity)?)?;
            }
            Ok(())
        })
    }

    /// # Errors
    /// Returns `EntityStoreError::MissingPrimaryKey` for a NULL `id`, or any
    /// failure of the delete.
    pub fn delete_by_id<T: Entity>(&self, id: impl Into<RowValues>) -> Result<()> {
        let desc = self.describe::<T>();
        let stmt = build_delete_by_id(&*desc, id.into())?;
        let session = self.store.session()?;
        self.in_transaction(&session, || self.execute_in(&session, &stmt))
    }

    /// Delete the rows of `T`'s table matching `filter`; an empty filter
    /// deletes them all.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the delete fails.
    pub fn delete_where<T: Entity>(&self, filter: &WhereBuilder) -> Result<()> {
        let desc = self.describe::<T>();
        let stmt = build_delete_where(desc.table_name(), filter);
        let session = self.store.session()?;
        self.in_transaction(&session, || self.execute_in(&session, &stmt))
    }

    fn save_binding_id_in<T: Entity>(
        &self,
        session: &StoreSession<'_>,
        desc: &EntityDescriptor<T>,
        entity: &mut T,
    ) -> Result<bool> {
        let values = entity_to_key_values(desc, entity);
        if values.is_empty() {
            return Ok(false);
        }
        let stmt = insert_statement(desc.table_name(), &values);
        self.debug_sql(&stmt.sql, &stmt.args);
        match session.insert_statement(desc.table_name(), &stmt) {
            Some(row_id) => {
                desc.bind_id(entity, row_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run `work` inside the store's transaction envelope.
    ///
    /// The scope is marked successful only when `work` succeeds and is always
    /// ended. When both `work` and ending fail, the error from `work` wins.
    fn in_transaction<R>(
        &self,
        session: &StoreSession<'_>,
        work: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        let mut tx = session.begin_transaction(self.config().allow_transaction)?;
        let outcome = work();
        if outcome.is_ok() {
            tx.set_successful();
        }
        match (outcome, tx.end()) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), Ok(())) | (Ok(_), Err(err)) => Err(err),
            (Err(err), Err(end_err)) => {
                tracing::error!(db = %self.config().db_name, error = %end_err, "ending transaction failed after an earlier error");
                Err(err)
            }
        }
    }
}

fn binding_failed<T>(desc: &EntityDescriptor<T>) -> EntityStoreError {
    EntityStoreError::BindingIdFailed {
        table: desc.table_name().to_string(),
    }
}
