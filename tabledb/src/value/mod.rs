// Typed cell values and coercion of raw text into them

use crate::error::{Result, TableDbError};
use crate::schema::DataType;
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

/// One value per schema column, in column order
pub type Row = Vec<Value>;

const TRUE_TOKENS: &[&str] = &["1", "t", "T", "TRUE", "true", "True"];
const FALSE_TOKENS: &[&str] = &["0", "f", "F", "FALSE", "false", "False"];

impl Value {
    /// The concrete type of this value. Textual custom types report `String`.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Bool(_) => DataType::Bool,
            Value::String(_) => DataType::String,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
        }
    }

    /// Whether this value may be stored in a column of the given type
    pub fn matches(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Int(_), DataType::Int) => true,
            (Value::Float(_), DataType::Float) => true,
            (Value::Bool(_), DataType::Bool) => true,
            (Value::String(_), t) => t.is_textual(),
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Convert raw text into a value of the given column type.
///
/// Strings and unknown types pass through untouched and never fail.
pub fn coerce(raw: &str, data_type: &DataType) -> Result<Value> {
    let invalid = |reason: String| TableDbError::InvalidValue {
        value: raw.to_string(),
        data_type: data_type.to_string(),
        reason,
    };

    match data_type {
        DataType::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| invalid(e.to_string())),
        DataType::Float => {
            let x = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(e.to_string()))?;
            if !x.is_finite() {
                return Err(invalid("value is not a finite number".into()));
            }
            Ok(Value::Float(x))
        }
        DataType::Bool => {
            let token = raw.trim();
            if TRUE_TOKENS.contains(&token) {
                Ok(Value::Bool(true))
            } else if FALSE_TOKENS.contains(&token) {
                Ok(Value::Bool(false))
            } else {
                Err(invalid("expected true or false".into()))
            }
        }
        DataType::String | DataType::Custom(_) => Ok(Value::String(raw.to_string())),
    }
}
