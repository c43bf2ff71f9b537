use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A generic row read from an ad-hoc query.
///
/// Captures every column of the row by name, independent of any entity
/// descriptor. Rows from the same cursor share their column names and the
/// name-to-index lookup table.
#[derive(Debug, Clone)]
pub struct DbModel {
    /// The column names for this row (shared across all rows of a cursor)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
    column_index: Arc<HashMap<String, usize>>,
}

impl DbModel {
    /// Create a row model from column names and values.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    ///
    /// # Returns
    ///
    /// The index of the column, or None if not found
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }

        // Fall back to a case-insensitive search; SQLite column names are.
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn get_string(&self, column_name: &str) -> Option<String> {
        self.get(column_name)
            .cloned()
            .and_then(|v| v.into_opt_string().ok().flatten())
    }

    #[must_use]
    pub fn get_i64(&self, column_name: &str) -> Option<i64> {
        self.get(column_name).and_then(RowValues::coerce_i64)
    }

    #[must_use]
    pub fn get_f64(&self, column_name: &str) -> Option<f64> {
        self.get(column_name).and_then(RowValues::as_float)
    }

    #[must_use]
    pub fn get_bool(&self, column_name: &str) -> Option<bool> {
        self.get(column_name).and_then(|v| v.as_bool().copied())
    }

    /// True when the column is missing or NULL.
    #[must_use]
    pub fn is_empty(&self, column_name: &str) -> bool {
        self.get(column_name).is_none_or(RowValues::is_null)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Copy the row into an owned column-name map.
    #[must_use]
    pub fn data_map(&self) -> HashMap<String, RowValues> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DbModel {
        DbModel::new(
            Arc::new(vec!["name".to_string(), "total".to_string()]),
            vec![RowValues::Text("a".into()), RowValues::Int(3)],
        )
    }

    #[test]
    fn lookups_by_name_and_index() {
        let row = model();
        assert_eq!(row.get_string("name").as_deref(), Some("a"));
        assert_eq!(row.get_i64("TOTAL"), Some(3));
        assert_eq!(row.get_by_index(1), Some(&RowValues::Int(3)));
        assert!(row.is_empty("missing"));
        assert_eq!(row.data_map().len(), 2);
    }
}
