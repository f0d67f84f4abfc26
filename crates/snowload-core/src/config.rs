//! Configuration schema (snowload.toml) and connection settings

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifier::TableIdentifier;
use crate::schema::TableSchema;

/// Schema used when the connection settings leave it unset
pub const DEFAULT_SCHEMA: &str = "DEV";

/// Rows per INSERT statement; Snowflake caps multi-row VALUES at this size
pub const DEFAULT_CHUNK_SIZE: usize = 16_384;

/// Upper bound on the SQL text of one INSERT; Snowflake rejects statements over 1 MB
pub const DEFAULT_MAX_STATEMENT_BYTES: usize = 1_000_000;

/// Prefix of values copied unchanged from a template `.env`
const PLACEHOLDER_PREFIX: &str = "your_";

/// Secret used to authenticate the user
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    /// Password-based authentication
    Password(String),
    /// Key-pair authentication (PEM format private key)
    PrivateKey(String),
}

impl Credential {
    fn secret(&self) -> &str {
        match self {
            Self::Password(s) | Self::PrivateKey(s) => s,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => write!(f, "Password(********)"),
            Self::PrivateKey(_) => write!(f, "PrivateKey(********)"),
        }
    }
}

/// A connection setting that must be present before connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigField {
    Account,
    User,
    Credential,
    Role,
    Database,
    Warehouse,
}

impl ConfigField {
    /// Environment variable that supplies this field
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Account => "SNOWFLAKE_ACCOUNT",
            Self::User => "SNOWFLAKE_USER",
            Self::Credential => "SNOWFLAKE_PASSWORD",
            Self::Role => "SNOWFLAKE_ROLE",
            Self::Database => "SNOWFLAKE_DATABASE",
            Self::Warehouse => "SNOWFLAKE_WAREHOUSE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::User => "user",
            Self::Credential => "credential",
            Self::Role => "role",
            Self::Database => "database",
            Self::Warehouse => "warehouse",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields required to open an ingestion session
pub const INGEST_FIELDS: &[ConfigField] = &[
    ConfigField::Account,
    ConfigField::User,
    ConfigField::Credential,
    ConfigField::Role,
    ConfigField::Database,
    ConfigField::Warehouse,
];

/// Fields required for a bare connectivity check
pub const CONNECTIVITY_FIELDS: &[ConfigField] = &[
    ConfigField::Account,
    ConfigField::User,
    ConfigField::Credential,
    ConfigField::Role,
    ConfigField::Warehouse,
];

/// Returns true when a value is unset or still holds a template placeholder
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.to_ascii_lowercase().starts_with(PLACEHOLDER_PREFIX)
}

/// Warehouse connection settings
///
/// Passed by value into the connection manager. Nothing here is read from the
/// process environment unless [`with_env_overrides`](Self::with_env_overrides) is
/// called with a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Account identifier (e.g., "xy12345.us-east-1")
    pub account: String,

    /// Login name
    pub user: String,

    /// Password or private key
    pub credential: Option<Credential>,

    /// Access role
    pub role: String,

    /// Session database
    pub database: String,

    /// Compute warehouse
    pub warehouse: String,

    /// Session schema, defaults to [`DEFAULT_SCHEMA`]
    pub schema: Option<String>,
}

impl ConnectionConfig {
    /// Effective session schema
    pub fn schema(&self) -> &str {
        self.schema
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SCHEMA)
    }

    fn field_value(&self, field: ConfigField) -> Option<&str> {
        match field {
            ConfigField::Account => Some(&self.account),
            ConfigField::User => Some(&self.user),
            ConfigField::Credential => self.credential.as_ref().map(Credential::secret),
            ConfigField::Role => Some(&self.role),
            ConfigField::Database => Some(&self.database),
            ConfigField::Warehouse => Some(&self.warehouse),
        }
    }

    /// List the required fields that are missing or left at placeholder values
    pub fn missing_fields(&self, required: &[ConfigField]) -> Vec<ConfigField> {
        required
            .iter()
            .copied()
            .filter(|field| self.field_value(*field).map_or(true, is_placeholder))
            .collect()
    }

    /// Field value suitable for display, with the credential masked
    pub fn display_value(&self, field: ConfigField) -> Option<String> {
        let value = self.field_value(field).filter(|v| !is_placeholder(v))?;
        Some(match field {
            ConfigField::Credential => "*".repeat(8),
            _ => value.to_string(),
        })
    }

    /// Override fields from `SNOWFLAKE_*` variables found through `lookup`
    ///
    /// `SNOWFLAKE_PASSWORD` takes precedence over `SNOWFLAKE_PRIVATE_KEY`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let overlay = |target: &mut String, var: &str| {
            if let Some(value) = lookup(var) {
                *target = value;
            }
        };

        overlay(&mut self.account, "SNOWFLAKE_ACCOUNT");
        overlay(&mut self.user, "SNOWFLAKE_USER");
        overlay(&mut self.role, "SNOWFLAKE_ROLE");
        overlay(&mut self.database, "SNOWFLAKE_DATABASE");
        overlay(&mut self.warehouse, "SNOWFLAKE_WAREHOUSE");

        if let Some(schema) = lookup("SNOWFLAKE_SCHEMA") {
            self.schema = Some(schema);
        }

        if let Some(password) = lookup("SNOWFLAKE_PASSWORD") {
            self.credential = Some(Credential::Password(password));
        } else if let Some(pem) = lookup("SNOWFLAKE_PRIVATE_KEY") {
            self.credential = Some(Credential::PrivateKey(pem));
        }

        self
    }
}

/// Destination table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub database: String,
    pub schema: String,
    pub table: String,

    /// Column definitions; defaults to the customers table
    pub columns: Option<TableSchema>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database: "DEMO_DB".to_string(),
            schema: "RAW_DATA".to_string(),
            table: "CUSTOMERS".to_string(),
            columns: None,
        }
    }
}

impl TargetConfig {
    pub fn identifier(&self) -> TableIdentifier {
        TableIdentifier::new(&self.database, &self.schema, &self.table)
    }

    pub fn table_schema(&self) -> TableSchema {
        self.columns.clone().unwrap_or_else(TableSchema::customers)
    }
}

/// Bulk load settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Clear existing rows before inserting
    pub overwrite: bool,

    /// Maximum rows per chunk
    pub chunk_size: usize,

    /// Maximum SQL text length per chunk
    pub max_statement_bytes: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_statement_bytes: DEFAULT_MAX_STATEMENT_BYTES,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub load: LoadOptions,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
