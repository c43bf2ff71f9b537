//! Statement construction: entity-driven DML/DDL, conditions, and selectors.
//!
//! Everything here only produces [`SqlStatement`]s; nothing touches the store.

mod builder;
mod selector;
mod statement;
mod where_builder;

pub use builder::{
    build_create_table, build_delete, build_delete_by_id, build_delete_where, build_insert,
    build_select_by_id, build_update, build_update_where, entity_to_example_filter,
    entity_to_key_values, insert_statement,
};
pub use selector::{DbModelSelector, Selector};
pub use statement::{KeyValue, SqlStatement, quote_ident};
pub use where_builder::{Op, WhereBuilder};
