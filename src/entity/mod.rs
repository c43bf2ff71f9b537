//! Entity metadata: how a Rust type maps onto a table.
//!
//! Types opt in by implementing [`Entity`], returning a descriptor that names
//! the table, the key column, and every persisted column with its accessors:
//!
//! ```rust
//! use sql_entity_store::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Item {
//!     id: Option<i64>,
//!     name: Option<String>,
//! }
//!
//! impl Entity for Item {
//!     fn describe() -> EntityDescriptor<Self> {
//!         EntityDescriptor::new(
//!             "item",
//!             Id::auto_increment(
//!                 "id",
//!                 |e: &Item| e.id.into(),
//!                 |e: &mut Item, v| {
//!                     e.id = v.into_opt_i64()?;
//!                     Ok(())
//!                 },
//!             ),
//!         )
//!         .column(Column::new(
//!             "name",
//!             ColumnType::Text,
//!             |e: &Item| e.name.clone().into(),
//!             |e: &mut Item, v| {
//!                 e.name = v.into_opt_string()?;
//!                 Ok(())
//!             },
//!         ))
//!     }
//! }
//! ```

mod cache;
mod descriptor;

pub use cache::EntityCache;
pub use descriptor::{Column, EntityDescriptor, Getter, Id, IdKind, Setter};

/// A type persisted as rows of one table.
///
/// `Default` supplies the blank instance that hydration fills column by column.
pub trait Entity: Default + 'static {
    /// Build the table mapping. Called once per store; the result is cached.
    fn describe() -> EntityDescriptor<Self>;
}
