pub(crate) mod row;

pub use row::DbModel;
