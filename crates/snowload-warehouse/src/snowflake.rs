//! Snowflake driver built on the `snowflake-api` crate
//!
//! The SQL REST session authenticates lazily, so [`WarehouseSession::session_info`]
//! is what actually logs in. Requires the `snowflake` feature.
//!
//! ## Authentication Methods
//!
//! 1. Password authentication (username/password)
//! 2. Key-pair authentication (private key PEM)
//!
//! Required privileges for a full ingestion run:
//! - CREATE DATABASE on the account (or an existing database owned by the role)
//! - CREATE SCHEMA / CREATE TABLE in the target database
//! - INSERT and TRUNCATE on the target table
//!
//! Reference: https://docs.snowflake.com/en/developer-guide/sql-api/index

use crate::driver::{DriverError, SessionInfo, StatementOutcome, WarehouseDriver, WarehouseSession};
use crate::statement::Statement;
use snowload_core::ConnectionConfig;

#[cfg(feature = "snowflake")]
use snowload_core::Credential;

#[cfg(feature = "snowflake")]
use snowflake_api::{QueryResult, SnowflakeApi, SnowflakeApiError};

#[cfg(feature = "snowflake")]
use arrow_array::cast::AsArray;

#[cfg(feature = "snowflake")]
use arrow_array::types::{
    Decimal128Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};

#[cfg(feature = "snowflake")]
use arrow_array::{Array, RecordBatch};

#[cfg(feature = "snowflake")]
use arrow_schema::DataType;

#[cfg(feature = "snowflake")]
use crate::driver::SESSION_INFO_QUERY;

/// Opens Snowflake sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct SnowflakeDriver;

impl SnowflakeDriver {
    pub fn new() -> Self {
        Self
    }
}

/// Translate an SDK error into the driver taxonomy
#[cfg(feature = "snowflake")]
fn map_api_error(err: SnowflakeApiError) -> DriverError {
    match err {
        // Login transport failures surface wrapped in AuthError
        SnowflakeApiError::AuthError(e) => {
            if format!("{:?}", e).starts_with("RequestError") {
                DriverError::Network(e.to_string())
            } else {
                DriverError::Authentication(e.to_string())
            }
        }
        SnowflakeApiError::RequestError(e) => DriverError::Network(e.to_string()),
        SnowflakeApiError::ApiError(code, message) => DriverError::Statement {
            code: Some(code),
            message,
        },
        other => DriverError::InvalidResponse(other.to_string()),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[async_trait::async_trait]
impl WarehouseDriver for SnowflakeDriver {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn WarehouseSession>, DriverError> {
        let credential = config.credential.as_ref().ok_or_else(|| {
            DriverError::Authentication("no password or private key configured".to_string())
        })?;

        let warehouse = non_empty(&config.warehouse);
        let database = non_empty(&config.database);
        let role = non_empty(&config.role);

        let api = match credential {
            Credential::Password(password) => SnowflakeApi::with_password_auth(
                config.account.trim(),
                warehouse,
                database,
                Some(config.schema()),
                config.user.trim(),
                role,
                password,
            ),
            Credential::PrivateKey(private_key_pem) => SnowflakeApi::with_certificate_auth(
                config.account.trim(),
                warehouse,
                database,
                Some(config.schema()),
                config.user.trim(),
                role,
                private_key_pem,
            ),
        }
        .map_err(map_api_error)?;

        tracing::debug!(account = %config.account, "Snowflake session created");

        Ok(Box::new(SnowflakeSession { api, closed: false }))
    }

    #[cfg(not(feature = "snowflake"))]
    async fn open(&self, _config: &ConnectionConfig) -> Result<Box<dyn WarehouseSession>, DriverError> {
        Err(DriverError::Unsupported(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}

/// A Snowflake SQL API session
#[cfg(feature = "snowflake")]
pub struct SnowflakeSession {
    api: SnowflakeApi,
    closed: bool,
}

#[cfg(feature = "snowflake")]
impl SnowflakeSession {
    async fn exec(&self, sql: &str) -> Result<QueryResult, DriverError> {
        if self.closed {
            return Err(DriverError::SessionClosed);
        }
        self.api.exec(sql).await.map_err(map_api_error)
    }
}

/// Read one cell of an Arrow batch as text
#[cfg(feature = "snowflake")]
fn arrow_cell(batch: &RecordBatch, row: usize, col: usize) -> Option<String> {
    if col >= batch.num_columns() || row >= batch.num_rows() {
        return None;
    }
    let column = batch.column(col);
    if column.is_null(row) {
        return None;
    }

    match column.data_type() {
        DataType::Utf8 => Some(column.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(column.as_string::<i64>().value(row).to_string()),
        // NUMBER(p, 0) arrives in the narrowest integer type that fits
        DataType::Int8 => column.as_primitive_opt::<Int8Type>().map(|arr| arr.value(row).to_string()),
        DataType::Int16 => column.as_primitive_opt::<Int16Type>().map(|arr| arr.value(row).to_string()),
        DataType::Int32 => column.as_primitive_opt::<Int32Type>().map(|arr| arr.value(row).to_string()),
        DataType::Int64 => column.as_primitive_opt::<Int64Type>().map(|arr| arr.value(row).to_string()),
        DataType::UInt8 => column.as_primitive_opt::<UInt8Type>().map(|arr| arr.value(row).to_string()),
        DataType::UInt16 => column.as_primitive_opt::<UInt16Type>().map(|arr| arr.value(row).to_string()),
        DataType::UInt32 => column.as_primitive_opt::<UInt32Type>().map(|arr| arr.value(row).to_string()),
        DataType::UInt64 => column.as_primitive_opt::<UInt64Type>().map(|arr| arr.value(row).to_string()),
        DataType::Decimal128(_, 0) => column
            .as_primitive_opt::<Decimal128Type>()
            .map(|arr| arr.value(row).to_string()),
        _ => None,
    }
}

/// Read one cell of a JSON rowset as text
#[cfg(feature = "snowflake")]
fn json_cell(rows: &serde_json::Value, row: usize, col: usize) -> Option<String> {
    match rows.get(row)?.get(col)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(feature = "snowflake")]
fn first_row(result: &QueryResult, width: usize) -> Option<Vec<String>> {
    match result {
        QueryResult::Arrow(batches) => {
            let batch = batches.iter().find(|b| b.num_rows() > 0)?;
            (0..width).map(|col| arrow_cell(batch, 0, col)).collect()
        }
        QueryResult::Json(json) => (0..width).map(|col| json_cell(&json.value, 0, col)).collect(),
        QueryResult::Empty => None,
    }
}

#[cfg(feature = "snowflake")]
#[async_trait::async_trait]
impl WarehouseSession for SnowflakeSession {
    async fn session_info(&self) -> Result<SessionInfo, DriverError> {
        let result = self.exec(SESSION_INFO_QUERY).await?;
        let mut cells = first_row(&result, 3)
            .ok_or_else(|| DriverError::InvalidResponse("session info query returned no row".to_string()))?
            .into_iter();

        let mut next = || cells.next().unwrap_or_default();
        Ok(SessionInfo {
            version: next(),
            account: next(),
            region: next(),
        })
    }

    async fn execute(&self, statement: &Statement<'_>) -> Result<StatementOutcome, DriverError> {
        let sql = statement.to_sql();
        tracing::debug!(kind = statement.kind(), bytes = sql.len(), "executing statement");

        let result = self.exec(&sql).await?;

        let rows_affected = match statement {
            Statement::Insert { .. } => {
                let count = first_row(&result, 1)
                    .and_then(|cells| cells.into_iter().next())
                    .ok_or_else(|| DriverError::InvalidResponse("INSERT returned no row count".to_string()))?;
                Some(count.parse::<u64>().map_err(|_| {
                    DriverError::InvalidResponse(format!("INSERT row count '{}' is not a number", count))
                })?)
            }
            _ => None,
        };

        Ok(StatementOutcome { rows_affected })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.api.close_session().await.map_err(map_api_error)
    }
}
