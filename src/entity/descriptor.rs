use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::types::{ColumnType, RowValues};

/// Reads a persisted field out of an entity.
pub type Getter<T> = fn(&T) -> RowValues;

/// Writes a column value into an entity field.
pub type Setter<T> = fn(&mut T, RowValues) -> Result<()>;

/// How the primary key gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// `INTEGER PRIMARY KEY AUTOINCREMENT`; left out of inserts, generated by `SQLite`.
    AutoIncrement,
    /// Supplied by the caller like any other column.
    Assigned,
}

/// One persisted field: column name, storage type, constraints, and accessors.
pub struct Column<T> {
    name: String,
    column_type: ColumnType,
    not_null: bool,
    unique: bool,
    default_value: Option<RowValues>,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> Column<T> {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        get: Getter<T>,
        set: Setter<T>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            unique: false,
            default_value: None,
            get,
            set,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Value written in place of NULL on insert, also emitted as the column `DEFAULT`.
    ///
    /// A NaN or infinite float has no SQL literal and is declared as `DEFAULT NULL`.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<RowValues>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    #[must_use]
    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub fn default(&self) -> Option<&RowValues> {
        self.default_value.as_ref()
    }

    /// Field value, falling back to the declared default when the field is NULL.
    #[must_use]
    pub fn value_of(&self, entity: &T) -> RowValues {
        let value = (self.get)(entity);
        match (&value, &self.default_value) {
            (RowValues::Null, Some(default)) => default.clone(),
            _ => value,
        }
    }

    /// # Errors
    /// Returns whatever the field's setter reports for an unconvertible value.
    pub fn assign(&self, entity: &mut T, value: RowValues) -> Result<()> {
        (self.set)(entity, value)
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .field("not_null", &self.not_null)
            .field("unique", &self.unique)
            .field("default_value", &self.default_value)
            .finish_non_exhaustive()
    }
}

/// Primary key column of an entity.
#[derive(Debug)]
pub struct Id<T> {
    column: Column<T>,
    kind: IdKind,
}

impl<T> Id<T> {
    /// Integer key generated by `SQLite` on insert.
    #[must_use]
    pub fn auto_increment(name: impl Into<String>, get: Getter<T>, set: Setter<T>) -> Self {
        Self {
            column: Column::new(name, ColumnType::Integer, get, set),
            kind: IdKind::AutoIncrement,
        }
    }

    /// Caller-supplied key of the given storage type.
    #[must_use]
    pub fn assigned(
        name: impl Into<String>,
        column_type: ColumnType,
        get: Getter<T>,
        set: Setter<T>,
    ) -> Self {
        Self {
            column: Column::new(name, column_type, get, set),
            kind: IdKind::Assigned,
        }
    }

    #[must_use]
    pub fn column(&self) -> &Column<T> {
        &self.column
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.column.name()
    }

    #[must_use]
    pub fn kind(&self) -> IdKind {
        self.kind
    }

    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.kind == IdKind::AutoIncrement
    }

    #[must_use]
    pub fn value_of(&self, entity: &T) -> RowValues {
        (self.column.get)(entity)
    }

    /// Whether the entity already carries a key.
    ///
    /// NULL and empty text never count; for auto-increment keys neither does `0`.
    #[must_use]
    pub fn has_value(&self, entity: &T) -> bool {
        match self.value_of(entity) {
            RowValues::Null => false,
            RowValues::Text(s) => {
                let s = s.trim();
                !s.is_empty() && !(self.is_auto_increment() && s == "0")
            }
            RowValues::Int(0) => !self.is_auto_increment(),
            _ => true,
        }
    }
}

/// Static mapping of a type onto a table.
///
/// Built once per store by [`crate::Entity::describe`] and shared by the
/// statement builder and hydration. The only mutable state is the
/// verified-exists flag, which is set once the table is known to exist and is
/// never cleared: a table dropped outside the store keeps reading as present
/// until the process restarts.
#[derive(Debug)]
pub struct EntityDescriptor<T> {
    table_name: String,
    id: Id<T>,
    columns: Vec<Column<T>>,
    table_checked: AtomicBool,
}

impl<T> EntityDescriptor<T> {
    #[must_use]
    pub fn new(table_name: impl Into<String>, id: Id<T>) -> Self {
        Self {
            table_name: table_name.into(),
            id,
            columns: Vec::new(),
            table_checked: AtomicBool::new(false),
        }
    }

    /// Append a persisted (non-key) column.
    #[must_use]
    pub fn column(mut self, column: Column<T>) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn id(&self) -> &Id<T> {
        &self.id
    }

    /// Non-key columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    /// Key column followed by every other column.
    pub fn all_columns(&self) -> impl Iterator<Item = &Column<T>> {
        std::iter::once(self.id.column()).chain(self.columns.iter())
    }

    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&Column<T>> {
        self.all_columns()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Whether the backing table is already known to exist.
    #[must_use]
    pub fn is_table_checked(&self) -> bool {
        self.table_checked.load(Ordering::Acquire)
    }

    pub(crate) fn mark_table_checked(&self) {
        self.table_checked.store(true, Ordering::Release);
    }

    /// Write a generated row id into the key field, as text.
    ///
    /// # Errors
    /// Returns whatever the key setter reports.
    pub fn bind_id(&self, entity: &mut T, row_id: i64) -> Result<()> {
        self.id
            .column()
            .assign(entity, RowValues::Text(row_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tag {
        id: Option<i64>,
        label: Option<String>,
    }

    fn describe() -> EntityDescriptor<Tag> {
        EntityDescriptor::new(
            "tag",
            Id::auto_increment(
                "id",
                |t: &Tag| t.id.into(),
                |t: &mut Tag, v| {
                    t.id = v.into_opt_i64()?;
                    Ok(())
                },
            ),
        )
        .column(
            Column::new(
                "label",
                ColumnType::Text,
                |t: &Tag| t.label.clone().into(),
                |t: &mut Tag, v| {
                    t.label = v.into_opt_string()?;
                    Ok(())
                },
            )
            .default_value("none"),
        )
    }

    #[test]
    fn auto_increment_zero_is_not_a_key() {
        let desc = describe();
        let mut tag = Tag {
            id: Some(0),
            label: None,
        };
        assert!(!desc.id().has_value(&tag));
        tag.id = Some(5);
        assert!(desc.id().has_value(&tag));
    }

    #[test]
    fn bind_id_writes_text_through_setter() {
        let desc = describe();
        let mut tag = Tag::default();
        desc.bind_id(&mut tag, 17).unwrap();
        assert_eq!(tag.id, Some(17));
    }

    #[test]
    fn null_field_falls_back_to_default() {
        let desc = describe();
        let tag = Tag::default();
        let label = desc.find_column("LABEL").unwrap();
        assert_eq!(label.value_of(&tag), RowValues::Text("none".into()));
    }

    #[test]
    fn checked_flag_is_sticky() {
        let desc = describe();
        assert!(!desc.is_table_checked());
        desc.mark_table_checked();
        assert!(desc.is_table_checked());
    }
}
