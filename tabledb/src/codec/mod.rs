// Row codec - typed rows <-> JSON arrays, in schema column order

use crate::error::{Result, TableDbError};
use crate::schema::{Column, DataType, Schema};
use crate::value::{Row, Value};
use serde_json::Value as Json;
use thiserror::Error;

/// A stored cell or row that does not agree with the table schema.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {row}: {reason}")]
pub struct DecodeError {
    /// 1-based row ordinal
    pub row: usize,
    pub reason: String,
}

/// Encode a single value as JSON.
pub fn encode_value(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Int(i) => Json::from(*i),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .ok_or_else(|| TableDbError::InvalidValue {
                value: x.to_string(),
                data_type: DataType::Float.to_string(),
                reason: "value is not a finite number".into(),
            })?,
        Value::Bool(b) => Json::Bool(*b),
        Value::String(s) => Json::String(s.clone()),
    })
}

/// Encode a row as a JSON array, preserving value order.
pub fn encode_row(row: &Row) -> Result<Vec<Json>> {
    row.iter().map(encode_value).collect()
}

pub fn encode_rows(rows: &[Row]) -> Result<Vec<Vec<Json>>> {
    rows.iter().map(encode_row).collect()
}

/// Decode one JSON cell against its column, or describe why it does not fit.
pub fn decode_value(cell: &Json, column: &Column) -> std::result::Result<Value, String> {
    let mismatch = || {
        format!(
            "column '{}' expects {}, found {}",
            column.name,
            column.data_type,
            json_type_name(cell)
        )
    };

    match (&column.data_type, cell) {
        (DataType::Int, Json::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::Int(i));
            }
            // Readers that decode every number as a double write ints back as 2.0
            match n.as_f64() {
                Some(x) if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 => {
                    Ok(Value::Int(x as i64))
                }
                _ => Err(format!(
                    "column '{}' expects int, found non-integral number {n}",
                    column.name
                )),
            }
        }
        (DataType::Float, Json::Number(n)) => n.as_f64().map(Value::Float).ok_or_else(mismatch),
        (DataType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
        (t, Json::String(s)) if t.is_textual() => Ok(Value::String(s.clone())),
        _ => Err(mismatch()),
    }
}

/// Decode a JSON array into a row, checking arity and every cell type.
///
/// `ordinal` is the 1-based row position, used for error reporting.
pub fn decode_row(
    cells: &[Json],
    schema: &Schema,
    ordinal: usize,
) -> std::result::Result<Row, DecodeError> {
    if cells.len() != schema.len() {
        return Err(DecodeError {
            row: ordinal,
            reason: format!(
                "has {} values but the table has {} columns",
                cells.len(),
                schema.len()
            ),
        });
    }

    cells
        .iter()
        .zip(schema.columns())
        .map(|(cell, column)| {
            decode_value(cell, column).map_err(|reason| DecodeError {
                row: ordinal,
                reason,
            })
        })
        .collect()
}

pub fn decode_rows(
    rows: &[Vec<Json>],
    schema: &Schema,
) -> std::result::Result<Vec<Row>, DecodeError> {
    rows.iter()
        .enumerate()
        .map(|(i, cells)| decode_row(cells, schema, i + 1))
        .collect()
}

fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
