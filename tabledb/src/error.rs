use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableDbError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Table already exists: {table}")]
    AlreadyExists { table: String },

    #[error("Corrupt table file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid value '{value}' for type {data_type}: {reason}")]
    InvalidValue {
        value: String,
        data_type: String,
        reason: String,
    },

    #[error("{what} {index} out of range (valid: 1..={max})")]
    OutOfRange { what: String, index: usize, max: usize },

    #[error("Duplicate primary key {key} in table {table}")]
    DuplicateKey { table: String, key: i64 },

    #[error("Invalid table name: {0}")]
    InvalidName(String),

    #[error("Could not lock {}", path.display())]
    Lock { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TableDbError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        TableDbError::NotFound { what: what.into() }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TableDbError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableDbError>;
