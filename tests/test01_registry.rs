mod common;

use std::sync::Arc;
use std::thread;

use sql_entity_store::prelude::*;
use sql_entity_store::registry;

#[test]
fn same_name_returns_same_instance() -> Result<()> {
    let (_dir, first) = common::open_store("reg_same.db", false)?;
    let second = StoreConfig::builder("reg_same.db").acquire()?;
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn distinct_names_return_distinct_instances() -> Result<()> {
    let (_a_dir, a) = common::open_store("reg_distinct_a.db", false)?;
    let (_b_dir, b) = common::open_store("reg_distinct_b.db", false)?;
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.db_name(), "reg_distinct_a.db");
    assert_eq!(b.db_name(), "reg_distinct_b.db");
    Ok(())
}

#[test]
fn second_acquire_replaces_configuration() -> Result<()> {
    let (dir, store) = common::open_store("reg_replace.db", false)?;
    assert!(!store.config().allow_transaction);

    let again = StoreConfig::builder("reg_replace.db")
        .dir(dir.path())
        .allow_transaction(true)
        .debug(false)
        .acquire()?;
    assert!(Arc::ptr_eq(&store, &again));
    assert!(store.config().allow_transaction);
    assert!(!store.config().debug);

    store.config_debug(true);
    store.config_allow_transaction(false);
    assert!(again.config().debug);
    assert!(!again.config().allow_transaction);
    Ok(())
}

#[test]
fn concurrent_acquire_yields_one_instance() -> Result<()> {
    let dir = tempfile::tempdir().map_err(|e| EntityStoreError::ConnectionError(e.to_string()))?;
    let path = dir.path().to_path_buf();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                StoreConfig::builder("reg_concurrent.db")
                    .dir(path)
                    .acquire()
            })
        })
        .collect();

    let stores: Vec<Arc<EntityStore>> = handles
        .into_iter()
        .map(|h| h.join().expect("acquire thread panicked"))
        .collect::<Result<_>>()?;
    assert!(stores.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    Ok(())
}

#[test]
fn removed_store_is_reopened() -> Result<()> {
    let (dir, first) = common::open_store("reg_remove.db", false)?;
    assert!(registry::contains("reg_remove.db"));
    assert!(registry::remove("reg_remove.db"));
    assert!(!registry::contains("reg_remove.db"));

    let second = StoreConfig::builder("reg_remove.db").dir(dir.path()).acquire()?;
    assert!(!Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn in_memory_store_keeps_data_per_instance() -> Result<()> {
    let store = StoreConfig::builder("reg_memory")
        .in_memory(true)
        .acquire()?;
    assert_eq!(store.config().db_version, 1);
    store.save(&common::Item::named("kept"))?;

    let again = StoreConfig::builder("reg_memory").in_memory(true).acquire()?;
    let items = again.find_all(&Selector::<common::Item>::new())?;
    assert_eq!(common::names(&items), vec!["kept".to_string()]);
    Ok(())
}

#[test]
fn config_parses_from_json() -> Result<()> {
    let config = StoreConfig::from_json_str(
        r#"{"db_name": "reg_json", "in_memory": true, "allow_transaction": true}"#,
    )?;
    let store = EntityStore::acquire(config)?;
    assert!(store.config().allow_transaction);
    assert_eq!(store.db_name(), "reg_json");
    Ok(())
}
