mod common;

use common::{Counter, Item};
use sql_entity_store::prelude::*;

#[test]
fn existence_probe_runs_once_per_type() -> Result<()> {
    let (_dir, store) = common::open_store("schema_probe.db", false)?;

    assert!(!store.table_is_exist::<Item>()?);
    store.ensure_table_exists::<Item>()?;
    assert!(store.describe::<Item>().is_table_checked());

    let before = store.stats().round_trips();
    store.ensure_table_exists::<Item>()?;
    assert!(store.table_is_exist::<Item>()?);
    store.save(&Item::named("a"))?;
    // Only the insert reached the database.
    assert_eq!(store.stats().round_trips(), before + 1);
    Ok(())
}

#[test]
fn existing_table_is_detected_without_create() -> Result<()> {
    let (_dir, store) = common::open_store("schema_existing.db", false)?;
    store.exec_non_query_sql(
        "CREATE TABLE \"counter\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"hits\" INTEGER)",
    )?;
    assert!(!store.describe::<Counter>().is_table_checked());
    assert!(store.table_is_exist::<Counter>()?);
    assert!(store.describe::<Counter>().is_table_checked());
    Ok(())
}

#[test]
fn flags_are_scoped_to_one_store() -> Result<()> {
    let (_a_dir, a) = common::open_store("schema_scope_a.db", false)?;
    let (_b_dir, b) = common::open_store("schema_scope_b.db", false)?;
    a.ensure_table_exists::<Item>()?;
    assert!(a.table_is_exist::<Item>()?);
    assert!(!b.table_is_exist::<Item>()?);
    Ok(())
}

#[test]
fn delete_and_read_never_create_tables() -> Result<()> {
    let (_dir, store) = common::open_store("schema_no_create.db", false)?;

    let deleted = store.delete_where::<Item>(&WhereBuilder::b("name", Op::Eq, "a"));
    assert!(matches!(deleted, Err(EntityStoreError::SqliteError(_))));
    assert!(store.find_all(&Selector::<Item>::new()).is_err());
    assert!(store.delete_by_id::<Item>(1_i64).is_err());

    assert!(!store.table_is_exist::<Item>()?);
    Ok(())
}

#[test]
fn drop_db_removes_user_tables() -> Result<()> {
    let (_dir, store) = common::open_store("schema_drop.db", false)?;
    store.save(&Item::named("a"))?;
    store.save(&Counter::default())?;

    store.drop_db()?;

    let remaining = store.exec_query_sql(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        |cursor| {
            Ok(cursor
                .next_values()?
                .and_then(|row| row.first().and_then(RowValues::coerce_i64)))
        },
    )?;
    assert_eq!(remaining, Some(0));

    // The cached flag survives the drop; recreating is explicit.
    assert!(store.table_is_exist::<Item>()?);
    assert!(store.save(&Item::named("b")).is_err());
    store.create_table::<Item>()?;
    store.save(&Item::named("b"))?;
    assert_eq!(store.count(&Selector::<Item>::new())?, 1);
    Ok(())
}

#[test]
fn drop_db_retries_tables_blocked_by_foreign_keys() -> Result<()> {
    let (_dir, store) = common::open_store("schema_drop_fk.db", false)?;
    // Catalog order puts the parent first, so its first drop hits the child's rows.
    store.exec_non_query_sql("CREATE TABLE a_parent (id INTEGER PRIMARY KEY)")?;
    store.exec_non_query_sql(
        "CREATE TABLE b_child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES a_parent(id))",
    )?;
    store.exec_non_query_sql("INSERT INTO a_parent (id) VALUES (1)")?;
    store.exec_non_query_sql("INSERT INTO b_child (id, parent_id) VALUES (1, 1)")?;

    store.drop_db()?;

    let left = store.find_db_model_all_sql(&SqlStatement::without_args(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    ))?;
    let left: Vec<_> = left.iter().filter_map(|m| m.get_string("name")).collect();
    assert!(left.is_empty(), "tables left after drop_db: {left:?}");
    Ok(())
}
