use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int,
    #[serde(alias = "float64")]
    Float,
    Bool,
    String,
    /// Any other type name. Kept verbatim on disk, handled as a string.
    #[serde(untagged)]
    Custom(std::string::String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::String => "string",
            DataType::Custom(name) => name,
        }
    }

    /// Whether values of this type are stored as JSON strings
    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::String | DataType::Custom(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "int" => DataType::Int,
            "float" | "float64" => DataType::Float,
            "bool" => DataType::Bool,
            "string" => DataType::String,
            other => DataType::Custom(other.to_string()),
        })
    }
}

/// A single named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_primary: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            is_primary: false,
        }
    }

    /// An integer primary-key column
    pub fn primary(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            data_type: DataType::Int,
            is_primary: true,
        }
    }
}

/// Ordered column list of a table. Column order fixes the position of
/// every value in a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names and conflicting keys.
    pub fn new(columns: Vec<Column>) -> crate::Result<Self> {
        let schema = Schema { columns };
        crate::validation::ensure_valid_schema(&schema)?;
        Ok(schema)
    }

    pub(crate) fn from_columns_unchecked(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of the primary-key column, if one is declared
    pub fn primary_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_primary)
    }

    /// Columns that callers supply values for on insert (everything but the key)
    pub fn value_columns(&self) -> impl Iterator<Item = (usize, &Column)> {
        self.columns.iter().enumerate().filter(|(_, c)| !c.is_primary)
    }

    /// Return this schema with an `id` primary column prepended when no
    /// column is flagged as primary.
    pub fn with_primary_key(mut self) -> crate::Result<Self> {
        if self.primary_index().is_some() {
            return Ok(self);
        }
        if self.column_index("id").is_some() {
            return Err(crate::TableDbError::SchemaMismatch(
                "no primary key declared and column 'id' is already taken".into(),
            ));
        }
        self.columns.insert(0, Column::primary("id"));
        Ok(self)
    }
}
