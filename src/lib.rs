//! Entity persistence over an embedded `SQLite` database.
//!
//! Types describe their table once through [`Entity`]; an [`EntityStore`]
//! (one per database, shared through a process-wide registry) creates tables on
//! demand, wraps batch mutations in a transaction envelope, and hydrates query
//! results back into entities or generic [`DbModel`] rows.
//!
//! ```rust,no_run
//! use sql_entity_store::prelude::*;
//! # #[derive(Default)]
//! # struct Item { id: Option<i64>, name: Option<String> }
//! # impl Entity for Item {
//! #     fn describe() -> EntityDescriptor<Self> {
//! #         EntityDescriptor::new("item", Id::auto_increment("id",
//! #             |e: &Item| e.id.into(),
//! #             |e: &mut Item, v| { e.id = v.into_opt_i64()?; Ok(()) }))
//! #         .column(Column::new("name", ColumnType::Text,
//! #             |e: &Item| e.name.clone().into(),
//! #             |e: &mut Item, v| { e.name = v.into_opt_string()?; Ok(()) }))
//! #     }
//! # }
//!
//! # fn main() -> Result<()> {
//! let store = StoreConfig::builder("app.db")
//!     .allow_transaction(true)
//!     .acquire()?;
//!
//! let mut item = Item { id: None, name: Some("first".into()) };
//! store.save_binding_id(&mut item)?;
//!
//! let found: Option<Item> = store.find_by_id(item.id)?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod results;
pub mod sql;
pub mod sqlite;
pub mod store;
pub mod types;

pub use config::{StoreConfig, StoreConfigBuilder, UpgradeListener};
pub use entity::{Column, Entity, EntityDescriptor, Id, IdKind};
pub use error::{EntityStoreError, Result};
pub use results::DbModel;
pub use sql::{DbModelSelector, KeyValue, Op, Selector, SqlStatement, WhereBuilder};
pub use sqlite::{Cursor, StoreSession, StoreStats, TransactionScope};
pub use store::EntityStore;
pub use types::{ColumnType, RowValues};
