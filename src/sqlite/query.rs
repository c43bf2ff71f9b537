use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::types::Value;

use crate::error::Result;
use crate::results::DbModel;
use crate::results::row::index_columns;
use crate::types::RowValues;

use super::store::StoreStats;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `EntityStoreError` if the value cannot be read.
pub fn sqlite_extract_value_sync(row: &rusqlite::Row, idx: usize) -> Result<RowValues> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Forward-only, row-at-a-time view over a running query.
///
/// A cursor only exists inside the closure handed to `StoreSession::query`;
/// it is released when that closure returns, on success and error alike.
pub struct Cursor<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    columns: Arc<Vec<String>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
    _release: CursorRelease<'stmt>,
}

struct CursorRelease<'a> {
    stats: &'a StoreStats,
}

impl Drop for CursorRelease<'_> {
    fn drop(&mut self) {
        self.stats.cursor_released();
    }
}

impl<'stmt> Cursor<'stmt> {
    pub(crate) fn open(
        rows: rusqlite::Rows<'stmt>,
        columns: Arc<Vec<String>>,
        stats: &'stmt StoreStats,
    ) -> Self {
        stats.cursor_opened();
        Self {
            rows,
            columns,
            column_index: None,
            _release: CursorRelease { stats },
        }
    }

    /// Column names of the result, in select order.
    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Advance one row and read every column.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if stepping the statement or reading a value fails.
    pub fn next_values(&mut self) -> Result<Option<Vec<RowValues>>> {
        let col_count = self.columns.len();
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(sqlite_extract_value_sync(row, i)?);
        }
        Ok(Some(values))
    }

    /// Advance one row and capture it as a generic row model.
    ///
    /// # Errors
    /// Returns `EntityStoreError` if stepping the statement or reading a value fails.
    pub fn next_model(&mut self) -> Result<Option<DbModel>> {
        let Some(values) = self.next_values()? else {
            return Ok(None);
        };
        let index = self
            .column_index
            .get_or_insert_with(|| Arc::new(index_columns(&self.columns)));
        Ok(Some(DbModel::with_index(
            Arc::clone(&self.columns),
            Arc::clone(index),
            values,
        )))
    }
}
