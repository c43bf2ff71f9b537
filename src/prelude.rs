//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so a single
//! `use sql_entity_store::prelude::*;` covers describing entities, building
//! conditions, and running them against a store.

pub use crate::config::{StoreConfig, StoreConfigBuilder};
pub use crate::entity::{Column, Entity, EntityDescriptor, Id, IdKind};
pub use crate::error::{EntityStoreError, Result};
pub use crate::results::DbModel;
pub use crate::sql::{DbModelSelector, KeyValue, Op, Selector, SqlStatement, WhereBuilder};
pub use crate::sqlite::{Cursor, StoreSession};
pub use crate::store::EntityStore;
pub use crate::types::{ColumnType, RowValues};
