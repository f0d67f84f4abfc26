//! DDL and DML statements issued during ingestion
//!
//! Identifiers handed to a [`Statement`] must already be normalized; rendering only
//! quotes values, never names.

use snowload_core::{Row, TableIdentifier, TableSchema, Value};
use std::fmt;

/// A statement the engine sends to a warehouse session
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    CreateDatabase {
        database: &'a str,
    },
    UseDatabase {
        database: &'a str,
    },
    CreateSchema {
        database: &'a str,
        schema: &'a str,
    },
    /// Destructive: drops any existing table of the same name
    CreateOrReplaceTable {
        table: &'a TableIdentifier,
        schema: &'a TableSchema,
    },
    TruncateTable {
        table: &'a TableIdentifier,
    },
    /// Multi-row insert of one chunk
    Insert {
        table: &'a TableIdentifier,
        columns: &'a [String],
        rows: &'a [Row],
    },
}

impl Statement<'_> {
    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateDatabase { .. } => "CREATE DATABASE",
            Self::UseDatabase { .. } => "USE DATABASE",
            Self::CreateSchema { .. } => "CREATE SCHEMA",
            Self::CreateOrReplaceTable { .. } => "CREATE OR REPLACE TABLE",
            Self::TruncateTable { .. } => "TRUNCATE TABLE",
            Self::Insert { .. } => "INSERT",
        }
    }

    /// Render as Snowflake SQL
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDatabase { database } => {
                write!(f, "CREATE DATABASE IF NOT EXISTS {}", database)
            }
            Self::UseDatabase { database } => write!(f, "USE DATABASE {}", database),
            Self::CreateSchema { database, schema } => {
                write!(f, "CREATE SCHEMA IF NOT EXISTS {}.{}", database, schema)
            }
            Self::CreateOrReplaceTable { table, schema } => {
                write!(f, "CREATE OR REPLACE TABLE {} (", table.fqn())?;
                for (i, column) in schema.columns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", column.name, column.column_type)?;
                }
                write!(f, ")")
            }
            Self::TruncateTable { table } => write!(f, "TRUNCATE TABLE {}", table.fqn()),
            Self::Insert { table, columns, rows } => {
                write!(f, "INSERT INTO {} ({}) VALUES ", table.fqn(), columns.join(", "))?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "(")?;
                    for (j, value) in row.iter().enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", literal(value))?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

/// Render a value as a SQL literal
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(x) if x.is_finite() => x.to_string(),
        Value::Float(x) if x.is_nan() => "'NaN'::FLOAT".to_string(),
        Value::Float(x) if *x > 0.0 => "'inf'::FLOAT".to_string(),
        Value::Float(_) => "'-inf'::FLOAT".to_string(),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Text(s) => quote_string(s),
    }
}

/// Single-quote a string, escaping backslashes and quotes
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}
