pub mod column;
pub mod table;

pub use column::ColumnDef;
pub use table::RowSchema;
