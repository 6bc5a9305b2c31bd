pub mod catalog;
pub mod schema;
pub mod table;

pub use catalog::Catalog;
pub use table::{Condition, RowId, Table, TableSchema};
