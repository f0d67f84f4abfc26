//! Idempotent DDL for the destination table
//!
//! `ensure_schema` is safe to repeat. `ensure_table` is a full replace: it drops any
//! existing table of the same name, data included, and recreates it with exactly
//! the given columns.

use snowload_core::{normalize_identifier, IdentifierError, TableIdentifier, TableSchema};
use snowload_warehouse::Statement;
use tracing::{debug, info};

use crate::connection::Session;
use crate::error::{IngestError, ProvisioningCause};

/// Creates the database, schema and table a load writes into
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaProvisioner;

impl SchemaProvisioner {
    pub fn new() -> Self {
        Self
    }

    /// Create the database and schema if they do not exist
    pub async fn ensure_schema(
        &self,
        session: &Session,
        database_name: &str,
        schema_name: &str,
    ) -> Result<(), IngestError> {
        let database = normalize(database_name, || format!("database {}", database_name))?;
        let schema = normalize(schema_name, || format!("schema {}.{}", database_name, schema_name))?;

        let database_object = format!("database {}", database);
        run(session, &Statement::CreateDatabase { database: &database }, &database_object).await?;
        run(session, &Statement::UseDatabase { database: &database }, &database_object).await?;

        let schema_object = format!("schema {}.{}", database, schema);
        run(
            session,
            &Statement::CreateSchema {
                database: &database,
                schema: &schema,
            },
            &schema_object,
        )
        .await?;

        debug!(database = %database, schema = %schema, "Database and schema ready");
        Ok(())
    }

    /// Create or replace the table with exactly `schema`'s columns
    ///
    /// Returns the normalized identifier of the table.
    pub async fn ensure_table(
        &self,
        session: &Session,
        database_name: &str,
        schema_name: &str,
        table_name: &str,
        schema: &TableSchema,
    ) -> Result<TableIdentifier, IngestError> {
        let requested = TableIdentifier::new(database_name, schema_name, table_name);
        let object = format!("table {}", requested);

        let table = requested.normalized().map_err(|e| provisioning(&object, e.into()))?;

        if schema.is_empty() {
            return Err(provisioning(&object, ProvisioningCause::EmptySchema));
        }
        let columns = schema.normalized().map_err(|e| provisioning(&object, e.into()))?;

        let object = format!("table {}", table);
        run(
            session,
            &Statement::CreateOrReplaceTable {
                table: &table,
                schema: &columns,
            },
            &object,
        )
        .await?;

        info!(table = %table, columns = columns.len(), "Tables created successfully");
        Ok(table)
    }
}

fn provisioning(object: &str, source: ProvisioningCause) -> IngestError {
    IngestError::Provisioning {
        object: object.to_string(),
        source,
    }
}

fn normalize(name: &str, object: impl FnOnce() -> String) -> Result<String, IngestError> {
    normalize_identifier(name).map_err(|e: IdentifierError| provisioning(&object(), e.into()))
}

async fn run(session: &Session, statement: &Statement<'_>, object: &str) -> Result<(), IngestError> {
    session
        .execute(statement)
        .await
        .map(|_| ())
        .map_err(|e| {
            tracing::error!(object = %object, statement = statement.kind(), error = %e, "Provisioning failed");
            provisioning(object, e.into())
        })
}
