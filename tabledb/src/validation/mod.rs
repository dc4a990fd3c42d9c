use crate::error::{Result, TableDbError};
use crate::schema::{DataType, Schema};
use crate::value::{Row, Value};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Longest table name accepted, in bytes
pub const MAX_TABLE_NAME_LEN: usize = 128;

fn table_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$").expect("valid regex"))
}

/// Check that a table name maps to a single file name inside the base directory.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TableDbError::InvalidName("table name is empty".into()));
    }
    if name.len() > MAX_TABLE_NAME_LEN {
        return Err(TableDbError::InvalidName(format!(
            "'{name}' is longer than {MAX_TABLE_NAME_LEN} characters"
        )));
    }
    if !table_name_pattern().is_match(name) {
        return Err(TableDbError::InvalidName(format!(
            "'{name}' may only contain letters, digits, '_' and '-', and may not start with '-'"
        )));
    }
    Ok(())
}

/// Collect every problem with a schema's column definitions.
/// An empty list means the schema is usable.
pub fn schema_issues(schema: &Schema) -> Vec<String> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut primaries = Vec::new();

    for (i, column) in schema.columns().iter().enumerate() {
        if column.name.is_empty() {
            issues.push(format!("column {} has an empty name", i + 1));
        } else if !seen.insert(column.name.as_str()) {
            issues.push(format!("duplicate column name '{}'", column.name));
        }

        if column.is_primary {
            primaries.push(column.name.as_str());
            if column.data_type != DataType::Int {
                issues.push(format!(
                    "primary key column '{}' must be int, got {}",
                    column.name, column.data_type
                ));
            }
        }
    }

    if primaries.len() > 1 {
        issues.push(format!(
            "more than one primary key column: {}",
            primaries.join(", ")
        ));
    }

    issues
}

pub(crate) fn ensure_valid_schema(schema: &Schema) -> Result<()> {
    let issues = schema_issues(schema);
    if issues.is_empty() {
        return Ok(());
    }
    Err(TableDbError::SchemaMismatch(format!(
        "Invalid schema:\n  - {}",
        issues.join("\n  - ")
    )))
}

/// Check that a row has one value per column and each value agrees
/// with its column's declared type.
pub fn check_row(schema: &Schema, row: &Row) -> Result<()> {
    if row.len() != schema.len() {
        return Err(TableDbError::SchemaMismatch(format!(
            "row has {} values but the table has {} columns",
            row.len(),
            schema.len()
        )));
    }

    for (value, column) in row.iter().zip(schema.columns()) {
        if !value.matches(&column.data_type) {
            return Err(TableDbError::SchemaMismatch(format!(
                "column '{}' expects {}, got {}",
                column.name,
                column.data_type,
                value.type_name()
            )));
        }
    }

    Ok(())
}

/// Primary-key value of a row, if it holds an integer at `key_index`
pub fn row_key(row: &Row, key_index: usize) -> Option<i64> {
    match row.get(key_index) {
        Some(Value::Int(k)) => Some(*k),
        _ => None,
    }
}
