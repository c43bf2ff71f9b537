#![allow(dead_code)]

use std::sync::Arc;

use sql_entity_store::prelude::*;
use tempfile::TempDir;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Item {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl Item {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
        }
    }
}

impl Entity for Item {
    fn describe() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "item",
            Id::auto_increment(
                "id",
                |e: &Item| e.id.into(),
                |e: &mut Item, v| {
                    e.id = v.into_opt_i64()?;
                    Ok(())
                },
            ),
        )
        .column(Column::new(
            "name",
            ColumnType::Text,
            |e: &Item| e.name.clone().into(),
            |e: &mut Item, v| {
                e.name = v.into_opt_string()?;
                Ok(())
            },
        ))
    }
}

/// Entity whose `code` must be unique, used to make inserts fail on demand.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Badge {
    pub id: Option<i64>,
    pub code: Option<String>,
}

impl Badge {
    pub fn coded(code: &str) -> Self {
        Self {
            id: None,
            code: Some(code.to_string()),
        }
    }
}

impl Entity for Badge {
    fn describe() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "badge",
            Id::auto_increment(
                "id",
                |e: &Badge| e.id.into(),
                |e: &mut Badge, v| {
                    e.id = v.into_opt_i64()?;
                    Ok(())
                },
            ),
        )
        .column(
            Column::new(
                "code",
                ColumnType::Text,
                |e: &Badge| e.code.clone().into(),
                |e: &mut Badge, v| {
                    e.code = v.into_opt_string()?;
                    Ok(())
                },
            )
            .not_null()
            .unique(),
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Counter {
    pub id: Option<i64>,
    pub hits: Option<i64>,
}

impl Entity for Counter {
    fn describe() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "counter",
            Id::auto_increment(
                "id",
                |e: &Counter| e.id.into(),
                |e: &mut Counter, v| {
                    e.id = v.into_opt_i64()?;
                    Ok(())
                },
            ),
        )
        .column(Column::new(
            "hits",
            ColumnType::Integer,
            |e: &Counter| e.hits.into(),
            |e: &mut Counter, v| {
                e.hits = v.into_opt_i64()?;
                Ok(())
            },
        ))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Open a fresh file-backed store under a temporary directory.
///
/// `name` must be unique across the test binary: the registry keys stores by
/// name alone.
pub fn open_store(name: &str, allow_transaction: bool) -> Result<(TempDir, Arc<EntityStore>)> {
    init_tracing();
    let dir = tempfile::tempdir()
        .map_err(|e| EntityStoreError::ConnectionError(format!("tempdir: {e}")))?;
    let store = StoreConfig::builder(name)
        .dir(dir.path())
        .debug(true)
        .allow_transaction(allow_transaction)
        .acquire()?;
    Ok((dir, store))
}

pub fn names(items: &[Item]) -> Vec<String> {
    items.iter().filter_map(|i| i.name.clone()).collect()
}
