//! Destination table schema and column types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::identifier::{normalize_identifier, IdentifierError};

/// Column types supported for destination tables
///
/// Each variant renders to its Snowflake DDL spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    /// Whole numbers (NUMBER(38,0))
    Integer,

    /// Double precision floating point
    Float,

    /// Boolean
    Boolean,

    /// Variable-length string with optional length bound
    Varchar { length: Option<u32> },

    /// Calendar date
    Date,

    /// Timestamp without time zone
    Timestamp,
}

impl ColumnType {
    /// Bounded VARCHAR
    pub fn varchar(length: u32) -> Self {
        Self::Varchar { length: Some(length) }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Varchar { length: Some(n) } => write!(f, "VARCHAR({})", n),
            Self::Varchar { length: None } => write!(f, "VARCHAR"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP_NTZ"),
        }
    }
}

/// Error parsing a column type from its SQL spelling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported column type '{0}'")]
pub struct ParseColumnTypeError(pub String);

impl FromStr for ColumnType {
    type Err = ParseColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let (base, params) = match upper.split_once('(') {
            Some((base, rest)) => {
                let params = rest
                    .strip_suffix(')')
                    .ok_or_else(|| ParseColumnTypeError(s.to_string()))?;
                (base.trim(), Some(params.trim()))
            }
            None => (upper.as_str(), None),
        };

        match (base, params) {
            ("INT" | "INTEGER" | "BIGINT" | "SMALLINT", None) => Ok(Self::Integer),
            ("NUMBER", Some(p)) if has_zero_scale(p) => Ok(Self::Integer),
            ("FLOAT" | "DOUBLE" | "REAL", None) => Ok(Self::Float),
            ("BOOLEAN" | "BOOL", None) => Ok(Self::Boolean),
            ("VARCHAR" | "STRING" | "TEXT", None) => Ok(Self::Varchar { length: None }),
            ("VARCHAR" | "STRING" | "TEXT", Some(p)) => p
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::varchar)
                .ok_or_else(|| ParseColumnTypeError(s.to_string())),
            ("DATE", None) => Ok(Self::Date),
            ("TIMESTAMP" | "TIMESTAMP_NTZ" | "DATETIME", None) => Ok(Self::Timestamp),
            _ => Err(ParseColumnTypeError(s.to_string())),
        }
    }
}

/// NUMBER(p) and NUMBER(p,0) hold whole numbers only
fn has_zero_scale(params: &str) -> bool {
    match params.split_once(',') {
        Some((_, scale)) => scale.trim() == "0",
        None => true,
    }
}

impl TryFrom<String> for ColumnType {
    type Error = ParseColumnTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

/// A column in a table schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// An ordered collection of columns describing a destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    /// Ordered list of columns
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a schema from columns
    pub fn from_columns(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Schema of the customers table loaded by default
    pub fn customers() -> Self {
        Self::from_columns(vec![
            ColumnDef::new("CUSTOMER_ID", ColumnType::Integer),
            ColumnDef::new("CUSTOMER_NAME", ColumnType::varchar(100)),
            ColumnDef::new("EMAIL", ColumnType::varchar(100)),
            ColumnDef::new("REGION", ColumnType::varchar(50)),
            ColumnDef::new("SIGNUP_DATE", ColumnType::Date),
        ])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Find a column by name (case-insensitive)
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Return a copy with every column name validated and upper-cased
    pub fn normalized(&self) -> Result<Self, IdentifierError> {
        let columns = self
            .columns
            .iter()
            .map(|c| Ok(ColumnDef::new(normalize_identifier(&c.name)?, c.column_type)))
            .collect::<Result<Vec<_>, IdentifierError>>()?;
        Ok(Self { columns })
    }
}
