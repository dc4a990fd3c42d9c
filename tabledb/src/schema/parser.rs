use super::types::{Column, DataType, Schema};
use crate::error::{Result, TableDbError};
use std::path::Path;

/// Parse a schema file (a YAML or JSON list of columns) into a Schema
pub fn parse_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_str(&content)
}

/// Parse a schema YAML/JSON string into a Schema
pub fn parse_schema_str(content: &str) -> Result<Schema> {
    let columns: Vec<Column> = serde_yaml::from_str(content)?;
    Schema::new(columns)
}

/// Parse the compact `name:type[:primary],...` column form.
///
/// `id:int:primary,username:string,is_active:bool`
pub fn parse_column_list(list: &str) -> Result<Schema> {
    let mut columns = Vec::new();

    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.split(':').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let data_type = match parts.next() {
            Some(t) if !t.is_empty() => t.parse::<DataType>().unwrap_or(DataType::String),
            _ => {
                return Err(TableDbError::SchemaMismatch(format!(
                    "column '{entry}' is missing a type (expected name:type)"
                )))
            }
        };
        let is_primary = match parts.next() {
            None => false,
            Some("primary") | Some("pk") => true,
            Some(flag) => {
                return Err(TableDbError::SchemaMismatch(format!(
                    "unknown column flag '{flag}' in '{entry}'"
                )))
            }
        };
        if parts.next().is_some() {
            return Err(TableDbError::SchemaMismatch(format!(
                "too many ':' separated parts in '{entry}'"
            )));
        }

        columns.push(Column {
            name: name.to_string(),
            data_type,
            is_primary,
        });
    }

    Schema::new(columns)
}
