// Primary key allocation, recomputed from the loaded rows on every call

use crate::error::{Result, TableDbError};
use crate::validation::row_key;
use crate::value::Row;

/// Next primary key for a table: one past the largest key present, or 1
/// for an empty table. Keys freed by deletes below the maximum are never
/// handed out again while that maximum remains.
pub fn allocate(rows: &[Row], key_index: usize) -> Result<i64> {
    let max = rows.iter().filter_map(|row| row_key(row, key_index)).max();
    match max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| TableDbError::OutOfRange {
            what: "next primary key".into(),
            index: usize::MAX,
            max: i64::MAX as usize,
        }),
    }
}

/// Fail with `DuplicateKey` if `key` is already used by a row.
pub fn ensure_unique(table: &str, rows: &[Row], key_index: usize, key: i64) -> Result<()> {
    if rows.iter().any(|row| row_key(row, key_index) == Some(key)) {
        return Err(TableDbError::DuplicateKey {
            table: table.to_string(),
            key,
        });
    }
    Ok(())
}
