mod parser;
mod types;

pub use parser::{parse_column_list, parse_schema, parse_schema_str};
pub use types::{Column, DataType, Schema};
