use thiserror::Error;

/// The single error type surfaced by every store, builder, and hydration path.
///
/// Store failures keep the original `rusqlite` error as their source; everything
/// else carries a message describing what went wrong and where.
#[derive(Debug, Error)]
pub enum EntityStoreError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Row conversion error: {0}")]
    ConversionError(String),

    #[error("Primary key value of `{table}` is not set")]
    MissingPrimaryKey { table: String },

    #[error("Insert into `{table}` produced no row id; transaction will not commit")]
    BindingIdFailed { table: String },

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl EntityStoreError {
    /// Add the table/column being hydrated to a conversion failure.
    #[must_use]
    pub(crate) fn in_column(self, table: &str, column: &str) -> Self {
        match self {
            EntityStoreError::ConversionError(msg) => {
                EntityStoreError::ConversionError(format!("{table}.{column}: {msg}"))
            }
            other => EntityStoreError::ConversionError(format!("{table}.{column}: {other}")),
        }
    }
}

pub type Result<T, E = EntityStoreError> = std::result::Result<T, E>;
