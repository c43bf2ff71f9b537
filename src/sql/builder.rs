use crate::entity::{EntityDescriptor, Id};
use crate::error::{EntityStoreError, Result};
use crate::types::RowValues;

use super::statement::{KeyValue, SqlStatement, quote_ident, sql_literal};
use super::where_builder::{Op, WhereBuilder};

/// Column/value pairs an entity persists.
///
/// Auto-increment keys are left out; every other column is included, with
/// declared defaults standing in for NULL fields.
pub fn entity_to_key_values<T>(desc: &EntityDescriptor<T>, entity: &T) -> Vec<KeyValue> {
    let mut values = Vec::with_capacity(desc.columns().len() + 1);
    let id = desc.id();
    if !id.is_auto_increment() {
        values.push(KeyValue::new(id.name(), id.value_of(entity)));
    }
    for column in desc.columns() {
        values.push(KeyValue::new(column.name(), column.value_of(entity)));
    }
    values
}

/// Equality condition matching every non-NULL persisted field of `example`,
/// including a populated key.
pub fn entity_to_example_filter<T>(desc: &EntityDescriptor<T>, example: &T) -> WhereBuilder {
    let mut filter = WhereBuilder::new();
    let id = desc.id();
    if id.has_value(example) {
        filter = filter.and(id.name(), Op::Eq, id.value_of(example));
    }
    for column in desc.columns() {
        let value = column.value_of(example);
        if !value.is_null() {
            filter = filter.and(column.name(), Op::Eq, value);
        }
    }
    filter
}

/// `INSERT` for explicit column/value pairs; no pairs inserts a default row.
#[must_use]
pub fn insert_statement(table: &str, values: &[KeyValue]) -> SqlStatement {
    if values.is_empty() {
        return SqlStatement::without_args(format!(
            "INSERT INTO {} DEFAULT VALUES",
            quote_ident(table)
        ));
    }
    let columns: Vec<String> = values.iter().map(|kv| quote_ident(&kv.key)).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    SqlStatement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(table),
            columns.join(", ")
        ),
        values.iter().map(|kv| kv.value.clone()).collect(),
    )
}

#[must_use]
pub fn build_insert<T>(desc: &EntityDescriptor<T>, entity: &T) -> SqlStatement {
    insert_statement(desc.table_name(), &entity_to_key_values(desc, entity))
}

/// `UPDATE` of every non-key column, matched on the entity's own key.
///
/// # Errors
/// Returns `EntityStoreError::MissingPrimaryKey` if the key is unset, or
/// `ExecutionError` if the entity has no non-key columns.
pub fn build_update<T>(desc: &EntityDescriptor<T>, entity: &T) -> Result<SqlStatement> {
    let key_filter = key_filter(desc, desc.id(), entity)?;
    build_update_where(desc, entity, &key_filter, &[])
}

/// `UPDATE` of `columns` (all non-key columns when empty) for rows matching `filter`.
///
/// # Errors
/// Returns `EntityStoreError::ExecutionError` if no column would be set.
pub fn build_update_where<T>(
    desc: &EntityDescriptor<T>,
    entity: &T,
    filter: &WhereBuilder,
    columns: &[&str],
) -> Result<SqlStatement> {
    let id_name = desc.id().name();
    let assignments: Vec<KeyValue> = entity_to_key_values(desc, entity)
        .into_iter()
        .filter(|kv| !kv.key.eq_ignore_ascii_case(id_name))
        .filter(|kv| {
            columns.is_empty() || columns.iter().any(|c| c.eq_ignore_ascii_case(&kv.key))
        })
        .collect();
    if assignments.is_empty() {
        return Err(EntityStoreError::ExecutionError(format!(
            "nothing to update in `{}`",
            desc.table_name()
        )));
    }

    let set_list: Vec<String> = assignments
        .iter()
        .map(|kv| format!("{} = ?", quote_ident(&kv.key)))
        .collect();
    let mut stmt = SqlStatement::new(
        format!(
            "UPDATE {} SET {}",
            quote_ident(desc.table_name()),
            set_list.join(", ")
        ),
        assignments.into_iter().map(|kv| kv.value).collect(),
    );
    append_filter(&mut stmt, filter);
    Ok(stmt)
}

/// `DELETE` matched on the entity's own key.
///
/// # Errors
/// Returns `EntityStoreError::MissingPrimaryKey` if the key is unset.
pub fn build_delete<T>(desc: &EntityDescriptor<T>, entity: &T) -> Result<SqlStatement> {
    let filter = key_filter(desc, desc.id(), entity)?;
    Ok(build_delete_where(desc.table_name(), &filter))
}

/// # Errors
/// Returns `EntityStoreError::MissingPrimaryKey` if `id_value` is NULL.
pub fn build_delete_by_id<T>(desc: &EntityDescriptor<T>, id_value: RowValues) -> Result<SqlStatement> {
    if id_value.is_null() {
        return Err(EntityStoreError::MissingPrimaryKey {
            table: desc.table_name().to_string(),
        });
    }
    let filter = WhereBuilder::b(desc.id().name(), Op::Eq, id_value);
    Ok(build_delete_where(desc.table_name(), &filter))
}

/// `DELETE` of rows matching `filter`; an empty filter deletes every row.
#[must_use]
pub fn build_delete_where(table: &str, filter: &WhereBuilder) -> SqlStatement {
    let mut stmt = SqlStatement::without_args(format!("DELETE FROM {}", quote_ident(table)));
    append_filter(&mut stmt, filter);
    stmt
}

/// `CREATE TABLE IF NOT EXISTS` with the key first, then columns in order.
#[must_use]
pub fn build_create_table<T>(desc: &EntityDescriptor<T>) -> SqlStatement {
    let id = desc.id();
    let mut defs = Vec::with_capacity(desc.columns().len() + 1);
    if id.is_auto_increment() {
        defs.push(format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(id.name())
        ));
    } else {
        defs.push(format!(
            "{} {} PRIMARY KEY",
            quote_ident(id.name()),
            id.column().column_type().sql_type()
        ));
    }
    for column in desc.columns() {
        let mut def = format!(
            "{} {}",
            quote_ident(column.name()),
            column.column_type().sql_type()
        );
        if column.is_not_null() {
            def.push_str(" NOT NULL");
        }
        if column.is_unique() {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = column.default() {
            def.push_str(" DEFAULT ");
            def.push_str(&sql_literal(default));
        }
        defs.push(def);
    }
    SqlStatement::without_args(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(desc.table_name()),
        defs.join(", ")
    ))
}

/// Key lookup used by `find_by_id`.
#[must_use]
pub fn build_select_by_id<T>(desc: &EntityDescriptor<T>, id_value: RowValues) -> SqlStatement {
    let mut stmt = SqlStatement::without_args(format!(
        "SELECT * FROM {}",
        quote_ident(desc.table_name())
    ));
    append_filter(&mut stmt, &WhereBuilder::b(desc.id().name(), Op::Eq, id_value));
    stmt.sql.push_str(" LIMIT 1");
    stmt
}

fn key_filter<T>(desc: &EntityDescriptor<T>, id: &Id<T>, entity: &T) -> Result<WhereBuilder> {
    if !id.has_value(entity) {
        return Err(EntityStoreError::MissingPrimaryKey {
            table: desc.table_name().to_string(),
        });
    }
    Ok(WhereBuilder::b(id.name(), Op::Eq, id.value_of(entity)))
}

fn append_filter(stmt: &mut SqlStatement, filter: &WhereBuilder) {
    if filter.is_empty() {
        return;
    }
    stmt.sql.push_str(" WHERE ");
    stmt.sql.push_str(&filter.sql());
    stmt.add_args(filter.args().iter().cloned());
}
