//! In-memory warehouse for testing
//!
//! `MockWarehouse` interprets [`Statement`]s against an in-memory catalog of
//! databases, schemas and tables. It never touches the network, which makes it
//! the test double for:
//! - Provisioning and load semantics (replace, truncate, chunked inserts)
//! - Verifying that invalid configuration never reaches a driver
//! - Simulating authentication, network and privilege failures
//! - Counting session opens and closes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snowload_warehouse::{MockWarehouse, WarehouseDriver};
//!
//! let warehouse = MockWarehouse::new().with_password("secret");
//! let session = warehouse.open(&config).await?;
//! session.execute(&Statement::CreateDatabase { database: "DEMO_DB" }).await?;
//! assert!(warehouse.has_database("DEMO_DB").await);
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Reject every statement containing "CREATE DATABASE"
//! warehouse.reject_statements("CREATE DATABASE", DriverError::rejected("Insufficient privileges")).await;
//!
//! // Drop the connection after two more statements
//! warehouse.lose_connection_after(2).await;
//! ```

use crate::driver::{DriverError, SessionInfo, StatementOutcome, WarehouseDriver, WarehouseSession};
use crate::statement::Statement;
use snowload_core::{ConnectionConfig, Credential, Row, TableIdentifier, TableSchema};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MockTable {
    schema: TableSchema,
    rows: Vec<Row>,
}

type SchemaMap = BTreeMap<String, BTreeMap<String, MockTable>>;

#[derive(Debug, Default)]
struct MockState {
    /// database -> schema -> table
    databases: BTreeMap<String, SchemaMap>,

    /// Rendered SQL of every statement received, in order
    statements: Vec<String>,

    /// Statements containing the pattern fail with the error
    rejections: Vec<(String, DriverError)>,

    /// Remaining statements before the connection drops
    connection_budget: Option<usize>,

    connection_attempts: usize,
    sessions_opened: usize,
    sessions_closed: usize,
    close_calls: usize,
}

/// Mock warehouse driver for testing
pub struct MockWarehouse {
    state: Arc<RwLock<MockState>>,

    /// Error returned by every `open`
    open_failure: Option<DriverError>,

    /// Password sessions must present, if any
    expected_password: Option<String>,

    /// Report one row fewer than sent for every insert
    short_writes: bool,

    info: SessionInfo,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    driver_name: &'static str,
}

impl MockWarehouse {
    /// Create an empty mock warehouse
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            open_failure: None,
            expected_password: None,
            short_writes: false,
            info: SessionInfo {
                version: "8.40.1".to_string(),
                account: "MOCK123".to_string(),
                region: "AWS_US_EAST_1".to_string(),
            },
            latency_ms: 0,
            driver_name: "Mock",
        }
    }

    /// Require sessions to authenticate with this password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.expected_password = Some(password.into());
        self
    }

    /// Fail every `open` with a network error
    pub fn with_connection_failure(mut self) -> Self {
        self.open_failure = Some(DriverError::Network(
            "Simulated connection failure".to_string(),
        ));
        self
    }

    /// Fail every `open` with the given error
    pub fn with_open_failure(mut self, error: DriverError) -> Self {
        self.open_failure = Some(error);
        self
    }

    /// Report one row fewer than sent for every insert
    pub fn with_short_writes(mut self) -> Self {
        self.short_writes = true;
        self
    }

    /// Session info reported by `session_info`
    pub fn with_session_info(mut self, info: SessionInfo) -> Self {
        self.info = info;
        self
    }

    /// Configure simulated latency for all operations
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom driver name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.driver_name = name;
        self
    }

    /// Fail any statement whose SQL contains `pattern`
    pub async fn reject_statements(&self, pattern: impl Into<String>, error: DriverError) {
        self.state.write().await.rejections.push((pattern.into(), error));
    }

    /// Let `statements` more statements through, then fail with network errors
    pub async fn lose_connection_after(&self, statements: usize) {
        self.state.write().await.connection_budget = Some(statements);
    }

    /// Create a table directly, bypassing sessions
    pub async fn seed_table(&self, table: &TableIdentifier, schema: TableSchema, rows: Vec<Row>) {
        self.state
            .write()
            .await
            .databases
            .entry(table.database.clone())
            .or_default()
            .entry(table.schema.clone())
            .or_default()
            .insert(table.table.clone(), MockTable { schema, rows });
    }

    pub async fn has_database(&self, database: &str) -> bool {
        self.state.read().await.databases.contains_key(database)
    }

    pub async fn has_schema(&self, database: &str, schema: &str) -> bool {
        self.state
            .read()
            .await
            .databases
            .get(database)
            .is_some_and(|schemas| schemas.contains_key(schema))
    }

    /// Schema of a table, if it exists
    pub async fn table_schema(&self, table: &TableIdentifier) -> Option<TableSchema> {
        let state = self.state.read().await;
        find_table(&state.databases, table).map(|t| t.schema.clone())
    }

    /// Rows of a table, if it exists
    pub async fn table_rows(&self, table: &TableIdentifier) -> Option<Vec<Row>> {
        let state = self.state.read().await;
        find_table(&state.databases, table).map(|t| t.rows.clone())
    }

    /// Number of rows in a table, if it exists
    pub async fn row_count(&self, table: &TableIdentifier) -> Option<usize> {
        let state = self.state.read().await;
        find_table(&state.databases, table).map(|t| t.rows.len())
    }

    /// SQL of every statement received so far
    pub async fn statements(&self) -> Vec<String> {
        self.state.read().await.statements.clone()
    }

    /// Calls to `open`, successful or not
    pub async fn connection_attempts(&self) -> usize {
        self.state.read().await.connection_attempts
    }

    pub async fn sessions_opened(&self) -> usize {
        self.state.read().await.sessions_opened
    }

    pub async fn sessions_closed(&self) -> usize {
        self.state.read().await.sessions_closed
    }

    /// Calls to `close`, including repeated ones
    pub async fn close_calls(&self) -> usize {
        self.state.read().await.close_calls
    }

    /// Sessions opened and not yet closed
    pub async fn open_sessions(&self) -> usize {
        let state = self.state.read().await;
        state.sessions_opened - state.sessions_closed
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockWarehouse {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            open_failure: self.open_failure.clone(),
            expected_password: self.expected_password.clone(),
            short_writes: self.short_writes,
            info: self.info.clone(),
            latency_ms: self.latency_ms,
            driver_name: self.driver_name,
        }
    }
}

fn find_table<'a>(databases: &'a BTreeMap<String, SchemaMap>, table: &TableIdentifier) -> Option<&'a MockTable> {
    databases.get(&table.database)?.get(&table.schema)?.get(&table.table)
}

fn find_table_mut<'a>(
    databases: &'a mut BTreeMap<String, SchemaMap>,
    table: &TableIdentifier,
) -> Result<&'a mut MockTable, DriverError> {
    databases
        .get_mut(&table.database)
        .and_then(|schemas| schemas.get_mut(&table.schema))
        .and_then(|tables| tables.get_mut(&table.table))
        .ok_or_else(|| {
            DriverError::rejected(format!("Table '{}' does not exist or not authorized.", table.fqn()))
        })
}

#[async_trait::async_trait]
impl WarehouseDriver for MockWarehouse {
    fn name(&self) -> &'static str {
        self.driver_name
    }

    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn WarehouseSession>, DriverError> {
        self.simulate_latency().await;

        let mut state = self.state.write().await;
        state.connection_attempts += 1;

        if let Some(error) = &self.open_failure {
            return Err(error.clone());
        }

        if let Some(expected) = &self.expected_password {
            let matches = matches!(&config.credential, Some(Credential::Password(p)) if p == expected);
            if !matches {
                return Err(DriverError::Authentication(
                    "Incorrect username or password was specified.".to_string(),
                ));
            }
        }

        state.sessions_opened += 1;

        Ok(Box::new(MockSession {
            warehouse: self.clone(),
            closed: false,
        }))
    }
}

/// Session handed out by [`MockWarehouse`]
struct MockSession {
    warehouse: MockWarehouse,
    closed: bool,
}

impl MockSession {
    fn apply(&self, state: &mut MockState, statement: &Statement<'_>) -> Result<StatementOutcome, DriverError> {
        match statement {
            Statement::CreateDatabase { database } => {
                state.databases.entry(database.to_string()).or_default();
                Ok(StatementOutcome::default())
            }
            Statement::UseDatabase { database } => {
                if state.databases.contains_key(*database) {
                    Ok(StatementOutcome::default())
                } else {
                    Err(DriverError::rejected(format!(
                        "Database '{}' does not exist or not authorized.",
                        database
                    )))
                }
            }
            Statement::CreateSchema { database, schema } => {
                let schemas = state.databases.get_mut(*database).ok_or_else(|| {
                    DriverError::rejected(format!("Database '{}' does not exist or not authorized.", database))
                })?;
                schemas.entry(schema.to_string()).or_default();
                Ok(StatementOutcome::default())
            }
            Statement::CreateOrReplaceTable { table, schema } => {
                let tables = state
                    .databases
                    .get_mut(&table.database)
                    .and_then(|schemas| schemas.get_mut(&table.schema))
                    .ok_or_else(|| {
                        DriverError::rejected(format!(
                            "Schema '{}.{}' does not exist or not authorized.",
                            table.database, table.schema
                        ))
                    })?;
                tables.insert(
                    table.table.clone(),
                    MockTable {
                        schema: (*schema).clone(),
                        rows: Vec::new(),
                    },
                );
                Ok(StatementOutcome::default())
            }
            Statement::TruncateTable { table } => {
                find_table_mut(&mut state.databases, table)?.rows.clear();
                Ok(StatementOutcome::default())
            }
            Statement::Insert { table, columns, rows } => {
                let target = find_table_mut(&mut state.databases, table)?;

                let names_match = columns.len() == target.schema.len()
                    && columns
                        .iter()
                        .zip(&target.schema.columns)
                        .all(|(label, column)| label.eq_ignore_ascii_case(&column.name));
                if !names_match {
                    return Err(DriverError::rejected(format!(
                        "Insert column list ({}) does not match table {}",
                        columns.join(", "),
                        table.fqn()
                    )));
                }

                for row in rows.iter() {
                    if row.len() != columns.len() {
                        return Err(DriverError::rejected("Insert value list does not match column list"));
                    }
                    for (value, column) in row.iter().zip(&target.schema.columns) {
                        if !value.fits(&column.column_type) {
                            return Err(DriverError::rejected(format!(
                                "{} value is not recognized for column {} {}",
                                value.kind(),
                                column.name,
                                column.column_type
                            )));
                        }
                    }
                }

                let keep = if self.warehouse.short_writes {
                    rows.len().saturating_sub(1)
                } else {
                    rows.len()
                };
                target.rows.extend(rows[..keep].iter().cloned());
                Ok(StatementOutcome::affected(keep as u64))
            }
        }
    }
}

#[async_trait::async_trait]
impl WarehouseSession for MockSession {
    async fn session_info(&self) -> Result<SessionInfo, DriverError> {
        if self.closed {
            return Err(DriverError::SessionClosed);
        }
        self.warehouse.simulate_latency().await;
        Ok(self.warehouse.info.clone())
    }

    async fn execute(&self, statement: &Statement<'_>) -> Result<StatementOutcome, DriverError> {
        if self.closed {
            return Err(DriverError::SessionClosed);
        }
        self.warehouse.simulate_latency().await;

        let sql = statement.to_sql();
        let mut state = self.warehouse.state.write().await;
        state.statements.push(sql.clone());

        match state.connection_budget {
            Some(0) => {
                return Err(DriverError::Network("Simulated connection loss".to_string()));
            }
            Some(remaining) => state.connection_budget = Some(remaining - 1),
            None => {}
        }

        if let Some((_, error)) = state.rejections.iter().find(|(pattern, _)| sql.contains(pattern.as_str())) {
            return Err(error.clone());
        }

        self.apply(&mut state, statement)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let mut state = self.warehouse.state.write().await;
        state.close_calls += 1;
        if !self.closed {
            self.closed = true;
            state.sessions_closed += 1;
        }
        Ok(())
    }
}
