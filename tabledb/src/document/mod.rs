// Table document I/O - one JSON file per table, replaced atomically on save

use crate::codec;
use crate::error::{Result, TableDbError};
use crate::schema::{Column, Schema};
use crate::validation;
use crate::value::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// On-disk shape of a table file
#[derive(Debug, Serialize, Deserialize)]
struct StoredTable {
    table_name: String,
    columns: Vec<Column>,
    /// Older writers leave this `null` for a table with no rows yet
    #[serde(default)]
    rows: Option<Vec<Vec<serde_json::Value>>>,
}

/// The full state of one table: its name, schema and rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDocument {
    table_name: String,
    columns: Schema,
    rows: Vec<Row>,
    key_index: usize,
}

impl TableDocument {
    /// An empty table. The schema must declare a primary key column.
    pub fn new(table_name: impl Into<String>, columns: Schema) -> Result<Self> {
        validation::ensure_valid_schema(&columns)?;
        let key_index = columns.primary_index().ok_or_else(|| {
            TableDbError::SchemaMismatch("table has no primary key column".into())
        })?;
        Ok(TableDocument {
            table_name: table_name.into(),
            columns,
            rows: Vec::new(),
            key_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &Schema {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of the primary-key column within every row
    pub fn key_index(&self) -> usize {
        self.key_index
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.column_index(name)
    }

    /// Primary-key values in row order
    pub fn keys(&self) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|row| validation::row_key(row, self.key_index))
            .collect()
    }

    /// Row position (0-based) holding the given primary key
    pub fn position_of_key(&self, key: i64) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| validation::row_key(row, self.key_index) == Some(key))
    }

    /// Row by 1-based ordinal
    pub fn row(&self, ordinal: usize) -> Option<&Row> {
        ordinal.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Check arity, types and key uniqueness of every row.
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            validation::check_row(&self.columns, row)?;
            let key = validation::row_key(row, self.key_index).ok_or_else(|| {
                TableDbError::SchemaMismatch("row is missing its primary key".into())
            })?;
            if !seen.insert(key) {
                return Err(TableDbError::DuplicateKey {
                    table: self.table_name.clone(),
                    key,
                });
            }
        }
        Ok(())
    }

    /// The document in its on-disk JSON shape
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_stored()?)?)
    }

    fn to_stored(&self) -> Result<StoredTable> {
        Ok(StoredTable {
            table_name: self.table_name.clone(),
            columns: self.columns.columns().to_vec(),
            rows: Some(codec::encode_rows(&self.rows)?),
        })
    }

    /// Read and decode a table file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TableDbError::not_found(format!(
                    "table file {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let stored: StoredTable = serde_json::from_slice(&content)
            .map_err(|e| TableDbError::corrupt(path, e.to_string()))?;

        let columns = Schema::from_columns_unchecked(stored.columns);
        let issues = validation::schema_issues(&columns);
        if !issues.is_empty() {
            return Err(TableDbError::corrupt(path, issues.join("; ")));
        }
        let key_index = columns
            .primary_index()
            .ok_or_else(|| TableDbError::corrupt(path, "no primary key column"))?;

        let rows = codec::decode_rows(&stored.rows.unwrap_or_default(), &columns).map_err(|e| {
            TableDbError::corrupt(path, format!("table '{}' {e}", stored.table_name))
        })?;

        let doc = TableDocument {
            table_name: stored.table_name,
            columns,
            rows,
            key_index,
        };
        doc.check()
            .map_err(|e| TableDbError::corrupt(path, e.to_string()))?;

        log::debug!(
            "Loaded table '{}' ({} rows) from {}",
            doc.table_name,
            doc.rows.len(),
            path.display()
        );
        Ok(doc)
    }

    /// Write the whole document to `path`.
    ///
    /// The new content goes to a temporary file in the same directory which
    /// is then renamed over `path`, so readers see either the old or the new
    /// document, never a partial one.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.check()?;

        let mut bytes = serde_json::to_vec_pretty(&self.to_stored()?)?;
        bytes.push(b'\n');

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".tabledb-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| TableDbError::Io(e.error))?;
        sync_dir(dir)?;

        log::debug!(
            "Saved table '{}' ({} rows) to {}",
            self.table_name,
            self.rows.len(),
            path.display()
        );
        Ok(())
    }
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
