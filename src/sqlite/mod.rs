// SQLite module - the storage engine side of the store
//
// - store: the connection, sessions, and usage counters
// - params: argument conversion between `RowValues` and SQLite values
// - query: value extraction and the scoped cursor
// - transaction: begin/mark/end envelope and rollback retries

pub mod params;
pub mod query;
pub mod store;
pub mod transaction;

pub use query::Cursor;
pub use store::{SqliteStore, StoreSession, StoreStats};
pub use transaction::TransactionScope;
