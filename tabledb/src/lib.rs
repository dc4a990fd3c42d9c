pub mod schema;
pub mod value;
pub mod codec;
pub mod document;
pub mod store;
pub mod validation;
pub mod display;
pub mod error;

pub use document::TableDocument;
pub use error::{Result, TableDbError};
pub use schema::{Column, DataType, Schema};
pub use store::{StoreOptions, TableStore};
pub use value::{coerce, Row, Value};
