pub mod table;
pub mod upload;

pub use table::{parse_table, trace_index, write_table, HeaderSpec, Row, Table};
pub use upload::{FileUpload, CSV_MIME};
