use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sqlite::StoreSession;
use crate::store::EntityStore;

/// Called when an existing database is opened with a higher `db_version`.
///
/// Runs inside a transaction together with the version bump; returning an error
/// rolls both back and fails the open. Arguments are the session, the stored
/// version, and the configured version.
pub type UpgradeListener = Arc<dyn Fn(&StoreSession<'_>, i32, i32) -> Result<()> + Send + Sync>;

pub const DEFAULT_DB_NAME: &str = "entity_store.db";

/// A `db_name` that opens an in-memory database, same as setting `in_memory`.
pub const IN_MEMORY_NAME: &str = ":memory:";

/// Options for one logical database.
///
/// `db_name` is the identifier the registry keys stores by. Flags read per call
/// (`debug`, `allow_transaction`) take effect as soon as a new configuration is
/// installed; `db_dir`, `in_memory`, and `db_version` only matter when the store
/// is first opened.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_name: String,
    pub db_dir: Option<PathBuf>,
    pub in_memory: bool,
    pub db_version: i32,
    pub debug: bool,
    pub allow_transaction: bool,
    #[serde(skip)]
    pub upgrade_listener: Option<UpgradeListener>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            db_dir: None,
            in_memory: false,
            db_version: 1,
            debug: false,
            allow_transaction: false,
            upgrade_listener: None,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder(db_name: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(db_name)
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `EntityStoreError::JsonError` if the text is not a valid configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// File the database lives in (`db_dir/db_name`, or `db_name` relative to the
    /// working directory).
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        match &self.db_dir {
            Some(dir) => dir.join(&self.db_name),
            None => PathBuf::from(&self.db_name),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("db_name", &self.db_name)
            .field("db_dir", &self.db_dir)
            .field("in_memory", &self.in_memory)
            .field("db_version", &self.db_version)
            .field("debug", &self.debug)
            .field("allow_transaction", &self.allow_transaction)
            .field("upgrade_listener", &self.upgrade_listener.is_some())
            .finish()
    }
}

/// Fluent builder for [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct StoreConfigBuilder {
    opts: StoreConfig,
}

impl StoreConfigBuilder {
    #[must_use]
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            opts: StoreConfig::new(db_name),
        }
    }

    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.opts.db_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.opts.in_memory = in_memory;
        self
    }

    #[must_use]
    pub fn version(mut self, version: i32) -> Self {
        self.opts.db_version = version;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.opts.debug = debug;
        self
    }

    #[must_use]
    pub fn allow_transaction(mut self, allow: bool) -> Self {
        self.opts.allow_transaction = allow;
        self
    }

    /// Install the upgrade callback run when an existing database is opened
    /// at a lower version.
    ///
    /// # Deadlocks
    /// The listener runs while the process-wide registry lock is held, so every
    /// other `acquire` waits for it to finish. Calling `acquire` from inside the
    /// listener never returns; use the session it is given instead.
    #[must_use]
    pub fn upgrade_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&StoreSession<'_>, i32, i32) -> Result<()> + Send + Sync + 'static,
    {
        self.opts.upgrade_listener = Some(Arc::new(listener));
        self
    }

    #[must_use]
    pub fn finish(self) -> StoreConfig {
        self.opts
    }

    /// Get (opening on first use) the store registered for this database name.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if the database cannot be opened or versioned.
    pub fn acquire(self) -> Result<Arc<EntityStore>> {
        EntityStore::acquire(self.finish())
    }
}
