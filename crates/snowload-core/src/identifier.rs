//! Warehouse object identifiers
//!
//! Snowflake folds unquoted identifiers to upper case. All names produced here are
//! normalized the same way so that DDL, DML and dataset labels agree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a Snowflake identifier
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Reasons an identifier is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier '{0}' exceeds {MAX_IDENTIFIER_LEN} characters")]
    TooLong(String),

    #[error("identifier '{name}' has invalid character '{found}' at position {position}")]
    InvalidCharacter {
        name: String,
        found: char,
        position: usize,
    },
}

/// Normalize an unquoted identifier to its upper-case form
///
/// Accepts names starting with a letter or underscore followed by letters,
/// digits, underscores or dollar signs.
pub fn normalize_identifier(name: &str) -> Result<String, IdentifierError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong(trimmed.to_string()));
    }

    for (position, ch) in trimmed.chars().enumerate() {
        let valid = if position == 0 {
            ch.is_ascii_alphabetic() || ch == '_'
        } else {
            ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
        };
        if !valid {
            return Err(IdentifierError::InvalidCharacter {
                name: trimmed.to_string(),
                found: ch,
                position,
            });
        }
    }

    Ok(trimmed.to_ascii_uppercase())
}

/// Identifies a table in a warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Database name
    pub database: String,

    /// Schema name
    pub schema: String,

    /// Table name
    pub table: String,
}

impl TableIdentifier {
    /// Create a new table identifier
    pub fn new(database: impl Into<String>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Validate all three parts and fold them to upper case
    pub fn normalized(&self) -> Result<Self, IdentifierError> {
        Ok(Self {
            database: normalize_identifier(&self.database)?,
            schema: normalize_identifier(&self.schema)?,
            table: normalize_identifier(&self.table)?,
        })
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}
