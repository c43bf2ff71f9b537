//! The per-database orchestrator.
//!
//! An [`EntityStore`] owns one `SQLite` connection and the entity descriptors
//! used against it. Obtain one through [`EntityStore::acquire`]; the registry
//! hands the same instance to every caller naming the same database.

mod mutation;
mod query;
mod schema;

use std::sync::{Arc, RwLock};

use crate::config::{IN_MEMORY_NAME, StoreConfig};
use crate::entity::{Entity, EntityCache, EntityDescriptor};
use crate::error::{EntityStoreError, Result};
use crate::registry;
use crate::sqlite::{SqliteStore, StoreSession, StoreStats};
use crate::types::RowValues;

pub struct EntityStore {
    store: SqliteStore,
    config: RwLock<Arc<StoreConfig>>,
    entities: EntityCache,
}

impl EntityStore {
    /// Get the store registered under `config.db_name`, opening it on first use.
    ///
    /// An existing store keeps its connection and takes `config` as its new
    /// configuration.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if a new store cannot be opened or versioned.
    pub fn acquire(config: StoreConfig) -> Result<Arc<Self>> {
        registry::acquire(config)
    }

    /// Open the database and bring it to the configured version.
    pub(crate) fn open(config: StoreConfig) -> Result<Self> {
        if config.db_version < 1 {
            return Err(EntityStoreError::ConfigError(format!(
                "db_version must be at least 1, got {}",
                config.db_version
            )));
        }
        let store = if config.in_memory || config.db_name == IN_MEMORY_NAME {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(&config.database_path())?
        };
        tracing::info!(db = %config.db_name, location = %store.location(), "opened store");
        let this = Self {
            store,
            config: RwLock::new(Arc::new(config)),
            entities: EntityCache::default(),
        };
        this.apply_version()?;
        Ok(this)
    }

    fn apply_version(&self) -> Result<()> {
        let config = self.config();
        let session = self.store.session()?;
        let current = session.user_version()?;
        let target = config.db_version;
        if current == target {
            return Ok(());
        }
        if current > target {
            return Err(EntityStoreError::ConfigError(format!(
                "cannot downgrade database `{}` from version {current} to {target}",
                config.db_name
            )));
        }

        let mut tx = session.begin_transaction(true)?;
        if current > 0 {
            tracing::info!(db = %config.db_name, from = current, to = target, "upgrading database");
            match &config.upgrade_listener {
                Some(listener) => listener(&session, current, target)?,
                None => {
                    if let Err(err) = self.drop_db_in(&session) {
                        tracing::error!(db = %config.db_name, error = %err, "dropping tables for upgrade failed");
                    }
                }
            }
        }
        session.set_user_version(target)?;
        tx.set_successful();
        tx.end()
    }

    /// Snapshot of the current configuration.
    #[must_use]
    pub fn config(&self) -> Arc<StoreConfig> {
        match self.config.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub(crate) fn replace_config(&self, config: StoreConfig) {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(config);
    }

    fn update_config(&self, change: impl FnOnce(&mut StoreConfig)) {
        let mut config = (*self.config()).clone();
        change(&mut config);
        self.replace_config(config);
    }

    /// Turn SQL logging (`tracing` debug level) on or off.
    pub fn config_debug(&self, debug: bool) {
        self.update_config(|c| c.debug = debug);
    }

    /// Turn transactional mutation on or off.
    ///
    /// Without transactions, a batch that fails part way keeps the rows written
    /// before the failure.
    pub fn config_allow_transaction(&self, allow: bool) {
        self.update_config(|c| c.allow_transaction = allow);
    }

    #[must_use]
    pub fn db_name(&self) -> String {
        self.config().db_name.clone()
    }

    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        self.store.stats()
    }

    /// Cached descriptor for `T` on this store.
    #[must_use]
    pub fn describe<T: Entity>(&self) -> Arc<EntityDescriptor<T>> {
        self.entities.describe::<T>()
    }

    /// Take the connection directly, for work the store has no operation for.
    ///
    /// # Deadlocks
    /// Holding the session blocks every other thread's operations on this
    /// store. Calling back into the store from the holding thread fails instead
    /// of blocking.
    ///
    /// # Errors
    /// Returns `EntityStoreError::ExecutionError` if this thread already holds a
    /// session on the store.
    pub fn session(&self) -> Result<StoreSession<'_>> {
        self.store.session()
    }

    fn debug_sql(&self, sql: &str, args: &[RowValues]) {
        let config = self.config();
        if config.debug {
            if args.is_empty() {
                tracing::debug!(db = %config.db_name, sql, "sql");
            } else {
                tracing::debug!(db = %config.db_name, sql, args = ?args, "sql");
            }
        }
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("store", &self.store)
            .field("config", &self.config())
            .field("entities", &self.entities)
            .finish()
    }
}
