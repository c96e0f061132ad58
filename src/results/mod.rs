pub mod reader;
pub mod result_set;
pub mod row;

pub use reader::RowReader;
pub use result_set::ResultSet;
pub use row::CustomDbRow;
