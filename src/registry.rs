//! Process-wide map from database name to its live store.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::EntityStore;

static STORES: LazyLock<Mutex<HashMap<String, Arc<EntityStore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn stores() -> MutexGuard<'static, HashMap<String, Arc<EntityStore>>> {
    match STORES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Look up the store for `config.db_name`, opening it on a miss.
///
/// The lookup and the open happen under one lock, so concurrent callers naming
/// the same database always end up with the same instance. On a hit the store
/// keeps its connection and adopts `config`.
///
/// Opening, including any upgrade listener, happens under that lock too, so a
/// slow open delays `acquire` for every database.
pub(crate) fn acquire(config: StoreConfig) -> Result<Arc<EntityStore>> {
    let mut stores = stores();
    if let Some(store) = stores.get(&config.db_name) {
        tracing::debug!(db = %config.db_name, "reusing registered store");
        store.replace_config(config);
        return Ok(Arc::clone(store));
    }
    let name = config.db_name.clone();
    let store = Arc::new(EntityStore::open(config)?);
    stores.insert(name, Arc::clone(&store));
    Ok(store)
}

/// Forget the store registered under `db_name`.
///
/// Handles already given out stay usable; the next `acquire` opens a fresh
/// store. Returns whether a store was registered.
pub fn remove(db_name: &str) -> bool {
    stores().remove(db_name).is_some()
}

#[must_use]
pub fn contains(db_name: &str) -> bool {
    stores().contains_key(db_name)
}
