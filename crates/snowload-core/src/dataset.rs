//! In-memory datasets
//!
//! A [`Dataset`] is a list of column labels plus rows of [`Value`]s. It carries no
//! types of its own: compatibility with a destination table is checked against a
//! [`TableSchema`] with [`Dataset::check_against`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::schema::{ColumnType, TableSchema};

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Short name of the value kind, used in mismatch reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "text",
        }
    }

    /// Whether a column of the given type accepts this value without coercion
    pub fn fits(&self, column_type: &ColumnType) -> bool {
        match (self, column_type) {
            (Self::Null, _) => true,
            (Self::Int(_), ColumnType::Integer) => true,
            (Self::Int(_) | Self::Float(_), ColumnType::Float) => true,
            (Self::Bool(_), ColumnType::Boolean) => true,
            (Self::Text(s), ColumnType::Varchar { length }) => {
                length.map_or(true, |n| s.chars().count() <= n as usize)
            }
            (Self::Date(_), ColumnType::Date) => true,
            (Self::Timestamp(_), ColumnType::Timestamp) => true,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A row of values, positionally aligned with the dataset's columns
pub type Row = Vec<Value>;

/// Errors building a dataset
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("record {record} is not a JSON object")]
    NotAnObject { record: usize },

    #[error("record {record}: column '{column}' cannot be read as {expected}")]
    InvalidField {
        record: usize,
        column: String,
        expected: ColumnType,
    },

    #[error("invalid JSON: {0}")]
    Json(String),
}

/// Ways a dataset can fail to fit a table schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("dataset has {found} columns, table has {expected}")]
    ColumnCount { expected: usize, found: usize },

    #[error("column {position}: dataset label '{found}' does not match table column '{expected}'")]
    ColumnName {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("row {row}, column '{column}': {kind} value does not fit {column_type}")]
    Value {
        row: usize,
        column: String,
        kind: &'static str,
        column_type: ColumnType,
    },
}

/// An in-memory table of rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Create an empty dataset with the given column labels
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create an empty dataset labelled with a schema's column names
    pub fn for_schema(schema: &TableSchema) -> Self {
        Self::new(schema.column_names())
    }

    /// Append a row, rejecting rows of the wrong width
    pub fn push_row(&mut self, row: Row) -> Result<(), DatasetError> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style [`push_row`](Self::push_row)
    pub fn with_row(mut self, row: Row) -> Result<Self, DatasetError> {
        self.push_row(row)?;
        Ok(self)
    }

    pub fn columns(&self) -> &[String] {
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

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column labels upper-cased to the warehouse naming convention
    pub fn normalized_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.trim().to_ascii_uppercase()).collect()
    }

    /// Check that this dataset can be written into a table with `schema`
    ///
    /// Labels are matched by position after upper-casing. Every non-null value must
    /// be accepted by its column type as-is.
    pub fn check_against(&self, schema: &TableSchema) -> Result<(), SchemaMismatch> {
        if self.columns.len() != schema.len() {
            return Err(SchemaMismatch::ColumnCount {
                expected: schema.len(),
                found: self.columns.len(),
            });
        }

        for (position, (label, column)) in self
            .normalized_columns()
            .into_iter()
            .zip(&schema.columns)
            .enumerate()
        {
            if !label.eq_ignore_ascii_case(&column.name) {
                return Err(SchemaMismatch::ColumnName {
                    position,
                    expected: column.name.clone(),
                    found: label,
                });
            }
        }

        for (row_idx, row) in self.rows.iter().enumerate() {
            for (value, column) in row.iter().zip(&schema.columns) {
                if !value.fits(&column.column_type) {
                    return Err(SchemaMismatch::Value {
                        row: row_idx,
                        column: column.name.clone(),
                        kind: value.kind(),
                        column_type: column.column_type,
                    });
                }
            }
        }

        Ok(())
    }

    /// Read a JSON array of objects, typing each field by the schema
    ///
    /// Keys are matched case-insensitively against column names. Missing keys and
    /// JSON `null` become [`Value::Null`]; dates are `YYYY-MM-DD` strings and
    /// timestamps are RFC 3339 without offset.
    pub fn from_json_records(json: &str, schema: &TableSchema) -> Result<Self, DatasetError> {
        let records: Vec<serde_json::Value> =
            serde_json::from_str(json).map_err(|e| DatasetError::Json(e.to_string()))?;

        let mut dataset = Self::for_schema(schema);
        for (record_idx, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or(DatasetError::NotAnObject { record: record_idx })?;

            let mut row = Vec::with_capacity(schema.len());
            for column in &schema.columns {
                let field = object
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&column.name))
                    .map(|(_, v)| v);

                let value = match field {
                    None | Some(serde_json::Value::Null) => Some(Value::Null),
                    Some(v) => json_to_value(v, &column.column_type),
                };

                row.push(value.ok_or_else(|| DatasetError::InvalidField {
                    record: record_idx,
                    column: column.name.clone(),
                    expected: column.column_type,
                })?);
            }
            dataset.push_row(row)?;
        }

        Ok(dataset)
    }
}

fn json_to_value(v: &serde_json::Value, column_type: &ColumnType) -> Option<Value> {
    match column_type {
        ColumnType::Integer => v.as_i64().map(Value::Int),
        ColumnType::Float => v.as_f64().map(Value::Float),
        ColumnType::Boolean => v.as_bool().map(Value::Bool),
        ColumnType::Varchar { .. } => v.as_str().map(Value::from),
        ColumnType::Date => v
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(Value::Date),
        ColumnType::Timestamp => v
            .as_str()
            .and_then(|s| s.parse::<NaiveDateTime>().ok())
            .map(Value::Timestamp),
    }
}
