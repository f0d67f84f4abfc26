//! Snowload Core
//!
//! Domain types shared by the warehouse drivers and the ingestion engine:
//! connection settings, destination schemas, datasets and load results.

pub mod config;
pub mod dataset;
pub mod identifier;
pub mod result;
pub mod sample;
pub mod schema;

pub use config::{
    is_placeholder, Config, ConfigError, ConfigField, ConnectionConfig, Credential, LoadOptions,
    TargetConfig, CONNECTIVITY_FIELDS, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_STATEMENT_BYTES, DEFAULT_SCHEMA,
    INGEST_FIELDS,
};
pub use dataset::{Dataset, DatasetError, Row, SchemaMismatch, Value};
pub use identifier::{normalize_identifier, IdentifierError, TableIdentifier};
pub use result::LoadResult;
pub use sample::sample_customers;
pub use schema::{ColumnDef, ColumnType, ParseColumnTypeError, TableSchema};
