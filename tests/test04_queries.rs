mod common;

use common::{Counter, Item};
use sql_entity_store::prelude::*;

#[test]
fn empty_results_are_none_and_empty() -> Result<()> {
    let (_dir, store) = common::open_store("query_empty.db", false)?;
    store.ensure_table_exists::<Item>()?;

    assert_eq!(store.find_first(&Selector::<Item>::new())?, None);
    assert!(store.find_all(&Selector::<Item>::new())?.is_empty());
    assert_eq!(store.find_by_id::<Item>(42_i64)?, None);
    assert_eq!(store.count(&Selector::<Item>::new())?, 0);
    assert_eq!(store.stats().open_cursors(), 0);
    Ok(())
}

#[test]
fn every_query_releases_its_cursor() -> Result<()> {
    let (_dir, store) = common::open_store("query_release.db", false)?;
    store.save_all(&[Item::named("a"), Item::named("b")])?;
    let opened = store.stats().cursors_opened();

    // Stop after one row; the rest of the cursor is abandoned.
    let first = store.exec_query_sql("SELECT name FROM item ORDER BY id", |cursor| {
        Ok(cursor.next_values()?.map(|row| row.len()))
    })?;
    assert_eq!(first, Some(1));

    let failed: Result<()> = store.exec_query_sql("SELECT name FROM item", |_cursor| {
        Err(EntityStoreError::ExecutionError("consumer gave up".into()))
    });
    assert!(failed.is_err());

    assert_eq!(store.stats().cursors_opened(), opened + 2);
    assert_eq!(store.stats().open_cursors(), 0);
    Ok(())
}

#[test]
fn query_that_fails_to_start_opens_no_cursor() -> Result<()> {
    let (_dir, store) = common::open_store("query_bad_sql.db", false)?;
    let opened = store.stats().cursors_opened();
    let result = store.exec_query_sql("SELECT * FROM missing_table", |_cursor| Ok(()));
    assert!(matches!(result, Err(EntityStoreError::SqliteError(_))));
    assert_eq!(store.stats().cursors_opened(), opened);
    assert_eq!(store.stats().open_cursors(), 0);
    Ok(())
}

#[test]
fn conversion_failure_is_wrapped_and_cursor_released() -> Result<()> {
    let (_dir, store) = common::open_store("query_conversion.db", false)?;
    store.ensure_table_exists::<Counter>()?;
    store.exec_non_query(&SqlStatement::new(
        "INSERT INTO counter (hits) VALUES (?)",
        vec![RowValues::Text("lots".into())],
    ))?;

    let result = store.find_all(&Selector::<Counter>::new());
    match result {
        Err(EntityStoreError::ConversionError(msg)) => assert!(msg.contains("counter.hits")),
        other => panic!("expected conversion error, got {other:?}"),
    }
    assert_eq!(store.stats().open_cursors(), 0);
    Ok(())
}

#[test]
fn selectors_filter_order_and_page() -> Result<()> {
    let (_dir, store) = common::open_store("query_selectors.db", false)?;
    let items: Vec<Item> = ["d", "a", "c", "b", "a"].iter().map(|n| Item::named(n)).collect();
    store.save_all(&items)?;

    let ordered = store.find_all(&Selector::<Item>::new().order_by("name").order_by("id"))?;
    assert_eq!(common::names(&ordered), vec!["a", "a", "b", "c", "d"]);

    let page = store.find_all(&Selector::<Item>::new().order_by_desc("name").limit(2).offset(1))?;
    assert_eq!(common::names(&page), vec!["c", "b"]);

    let first = store.find_first(&Selector::<Item>::new().and("name", Op::Gt, "b").order_by("name"))?;
    assert_eq!(first.and_then(|i| i.name), Some("c".to_string()));

    let either = Selector::<Item>::new()
        .and("name", Op::Eq, "a")
        .or("name", Op::Eq, "d");
    assert_eq!(store.count(&either)?, 3);
    assert_eq!(store.count(&either.clone().limit(1))?, 3);

    let listed = store.find_all(
        &Selector::<Item>::new().filter(WhereBuilder::new().and_in("name", vec!["b".into(), "c".into()])),
    )?;
    assert_eq!(listed.len(), 2);
    Ok(())
}

#[test]
fn find_like_matches_populated_fields() -> Result<()> {
    let (_dir, store) = common::open_store("query_like.db", false)?;
    store.save_all(&[Item::named("a"), Item::named("b"), Item::named("a")])?;

    let all_a = store.find_all_like(&Item::named("a"))?;
    assert_eq!(all_a.len(), 2);
    let first_b = store.find_first_like(&Item::named("b"))?;
    assert_eq!(first_b.and_then(|i| i.name), Some("b".to_string()));
    Ok(())
}

#[test]
fn db_models_capture_arbitrary_rows() -> Result<()> {
    let (_dir, store) = common::open_store("query_models.db", false)?;
    store.save_all(&[Item::named("a"), Item::named("b"), Item::named("a")])?;

    let grouped = store.find_db_model_all(
        &DbModelSelector::from_table("item")
            .select(&["name", "COUNT(*) AS total"])
            .group_by("name")
            .order_by("name"),
    )?;
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[0].get_string("name"), Some("a".to_string()));
    assert_eq!(grouped[0].get_i64("total"), Some(2));
    assert_eq!(grouped[1].get_i64("TOTAL"), Some(1));

    let first = store.find_db_model_first(
        &DbModelSelector::from_table("item").and("name", Op::Eq, "b"),
    )?;
    let first = first.expect("row for b");
    assert_eq!(first.get_string("name"), Some("b".to_string()));
    assert!(!first.is_empty("id"));

    let raw = store.find_db_model_all_sql(&SqlStatement::new(
        "SELECT id FROM item WHERE name = ? ORDER BY id",
        vec![RowValues::from("a")],
    ))?;
    assert_eq!(raw.len(), 2);
    assert_eq!(
        store.find_db_model_first_sql(&SqlStatement::without_args("SELECT 1 AS one"))?
            .and_then(|m| m.get_i64("one")),
        Some(1)
    );
    assert_eq!(store.stats().open_cursors(), 0);
    Ok(())
}

#[test]
fn nested_store_call_from_cursor_fails_instead_of_blocking() -> Result<()> {
    let (_dir, store) = common::open_store("query_nested.db", false)?;
    store.save_all(&[Item::named("a"), Item::named("b")])?;

    let nested = store.exec_query_sql("SELECT name FROM item", |cursor| {
        cursor.next_values()?;
        store.count(&Selector::<Item>::new())
    });
    match nested {
        Err(EntityStoreError::ExecutionError(msg)) => assert!(msg.contains("re-entered")),
        other => panic!("expected re-entry error, got {other:?}"),
    }

    // The session was released; the store is usable again from this thread.
    assert_eq!(store.count(&Selector::<Item>::new())?, 2);
    assert_eq!(store.stats().open_cursors(), 0);
    Ok(())
}

#[test]
fn other_threads_wait_for_the_session() -> Result<()> {
    let (_dir, store) = common::open_store("query_waiting.db", false)?;
    store.save(&Item::named("a"))?;

    let session = store.session()?;
    let waiter = {
        let store = std::sync::Arc::clone(&store);
        std::thread::spawn(move || store.count(&Selector::<Item>::new()))
    };
    assert!(store.session().is_err());
    drop(session);

    let counted = waiter.join().expect("count thread panicked")?;
    assert_eq!(counted, 1);
    Ok(())
}
