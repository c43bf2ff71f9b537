use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::{EntityStoreError, Result};

/// Values that can be stored in a column, bound as a statement argument, or read
/// back from a cursor.
///
/// Entity getters produce these and entity setters consume them:
/// ```rust
/// use sql_entity_store::prelude::*;
///
/// let args = vec![
///     RowValues::Int(1),
///     RowValues::from("alice"),
///     RowValues::from(Some(true)),
/// ];
/// # let _ = args;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Integer view that also accepts numeric text.
    ///
    /// Generated keys are written back into entities as strings, so id setters
    /// typically go through this.
    #[must_use]
    pub fn coerce_i64(&self) -> Option<i64> {
        match self {
            RowValues::Int(i) => Some(*i),
            RowValues::Bool(b) => Some(i64::from(*b)),
            RowValues::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Consume into an optional integer; NULL maps to `None`.
    ///
    /// # Errors
    /// Returns `EntityStoreError::ConversionError` if the value is not integral.
    pub fn into_opt_i64(self) -> Result<Option<i64>> {
        if self.is_null() {
            return Ok(None);
        }
        self.coerce_i64()
            .map(Some)
            .ok_or_else(|| conversion_error("integer", &self))
    }

    /// Consume into an optional string; numbers are rendered, blobs are rejected.
    ///
    /// # Errors
    /// Returns `EntityStoreError::ConversionError` for blob values.
    pub fn into_opt_string(self) -> Result<Option<String>> {
        match self {
            RowValues::Null => Ok(None),
            RowValues::Text(s) => Ok(Some(s)),
            RowValues::Int(i) => Ok(Some(i.to_string())),
            RowValues::Float(f) => Ok(Some(f.to_string())),
            RowValues::Bool(b) => Ok(Some(b.to_string())),
            RowValues::Timestamp(dt) => Ok(Some(dt.format("%F %T%.f").to_string())),
            RowValues::JSON(json) => Ok(Some(json.to_string())),
            RowValues::Blob(_) => Err(conversion_error("text", &self)),
        }
    }

    /// # Errors
    /// Returns `EntityStoreError::ConversionError` if the value is not numeric.
    pub fn into_opt_f64(self) -> Result<Option<f64>> {
        match &self {
            RowValues::Null => Ok(None),
            RowValues::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| conversion_error("real", &self)),
            _ => self
                .as_float()
                .map(Some)
                .ok_or_else(|| conversion_error("real", &self)),
        }
    }

    /// # Errors
    /// Returns `EntityStoreError::ConversionError` unless the value is a bool or 0/1.
    pub fn into_opt_bool(self) -> Result<Option<bool>> {
        if self.is_null() {
            return Ok(None);
        }
        self.as_bool()
            .copied()
            .map(Some)
            .ok_or_else(|| conversion_error("boolean", &self))
    }

    /// # Errors
    /// Returns `EntityStoreError::ConversionError` if the text is not a timestamp.
    pub fn into_opt_timestamp(self) -> Result<Option<NaiveDateTime>> {
        if self.is_null() {
            return Ok(None);
        }
        self.as_timestamp()
            .map(Some)
            .ok_or_else(|| conversion_error("timestamp", &self))
    }

    /// JSON columns are stored as text; parse them back on the way out.
    ///
    /// # Errors
    /// Returns `EntityStoreError::ConversionError` if the text is not valid JSON.
    pub fn into_opt_json(self) -> Result<Option<JsonValue>> {
        match self {
            RowValues::Null => Ok(None),
            RowValues::JSON(json) => Ok(Some(json)),
            RowValues::Text(s) => serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| EntityStoreError::ConversionError(format!("invalid json: {e}"))),
            other => Err(conversion_error("json", &other)),
        }
    }

    /// # Errors
    /// Returns `EntityStoreError::ConversionError` unless the value is a blob or text.
    pub fn into_opt_blob(self) -> Result<Option<Vec<u8>>> {
        match self {
            RowValues::Null => Ok(None),
            RowValues::Blob(bytes) => Ok(Some(bytes)),
            RowValues::Text(s) => Ok(Some(s.into_bytes())),
            other => Err(conversion_error("blob", &other)),
        }
    }
}

fn conversion_error(target: &str, value: &RowValues) -> EntityStoreError {
    EntityStoreError::ConversionError(format!("cannot read {value:?} as {target}"))
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Declared storage type of a column, used when creating tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    Timestamp,
    Json,
}

impl ColumnType {
    /// Type name emitted in `CREATE TABLE`.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text | ColumnType::Json => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Timestamp => "DATETIME",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_text_reads_back_as_integer() {
        let id = RowValues::Text("42".to_string());
        assert_eq!(id.into_opt_i64().unwrap(), Some(42));
        assert_eq!(RowValues::Null.into_opt_i64().unwrap(), None);
        assert!(RowValues::Text("abc".into()).into_opt_i64().is_err());
    }

    #[test]
    fn option_into_row_value() {
        assert_eq!(RowValues::from(None::<i64>), RowValues::Null);
        assert_eq!(RowValues::from(Some("a")), RowValues::Text("a".into()));
    }

    #[test]
    fn timestamps_parse_from_sqlite_text() {
        let v = RowValues::Text("2024-01-02 03:04:05.250".into());
        let dt = v.into_opt_timestamp().unwrap().unwrap();
        assert_eq!(dt.format("%F %T%.3f").to_string(), "2024-01-02 03:04:05.250");
    }

    #[test]
    fn bool_from_integer_storage() {
        assert_eq!(RowValues::Int(1).into_opt_bool().unwrap(), Some(true));
        assert!(RowValues::Int(7).into_opt_bool().is_err());
    }
}
