//! Integration tests for ingestion runs
//!
//! Runs go through the in-memory `MockWarehouse` unless noted. Tests against a
//! real Snowflake account are marked with `#[ignore]`.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all non-ignored tests (no credentials required)
//! cargo test -p snowload-engine --test integration_tests
//!
//! # Run Snowflake integration tests
//! SNOWFLAKE_ACCOUNT=xy12345 \
//! SNOWFLAKE_USER=user \
//! SNOWFLAKE_PASSWORD=pass \
//! SNOWFLAKE_ROLE=SYSADMIN \
//! SNOWFLAKE_WAREHOUSE=COMPUTE_WH \
//! SNOWFLAKE_DATABASE=DEMO_DB \
//! cargo test -p snowload-engine --features snowflake --test integration_tests -- --ignored
//! ```

mod fixtures;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use snowload_core::{ConfigField, Dataset, TableSchema, Value};
use snowload_engine::{
    BulkLoader, ConnectionManager, IngestError, Orchestrator, RunState, SchemaProvisioner,
};
use snowload_warehouse::{DriverError, MockWarehouse};

// =============================================================================
// Helper Functions
// =============================================================================

/// Check if Snowflake credentials are available
fn has_snowflake_credentials() -> bool {
    std::env::var("SNOWFLAKE_ACCOUNT").is_ok() && std::env::var("SNOWFLAKE_USER").is_ok()
}

fn orchestrator(warehouse: &MockWarehouse) -> Orchestrator {
    Orchestrator::new(Arc::new(warehouse.clone()))
}

// =============================================================================
// Connection Tests
// =============================================================================

#[tokio::test]
async fn test_acquire_release_leaves_no_open_session() {
    let warehouse = MockWarehouse::new().with_password(fixtures::PASSWORD);
    let manager = ConnectionManager::new(Arc::new(warehouse.clone()));

    for _ in 0..3 {
        let mut session = manager.acquire(fixtures::valid_config()).await.unwrap();
        manager.release(&mut session).await;
        manager.release(&mut session).await;
    }

    assert_eq!(warehouse.sessions_opened().await, 3);
    assert_eq!(warehouse.open_sessions().await, 0);
}

#[tokio::test]
async fn test_template_config_is_rejected_without_network() {
    let warehouse = MockWarehouse::new();

    let err = orchestrator(&warehouse)
        .run(fixtures::template_config_request(), &fixtures::customers(10))
        .await
        .unwrap_err();

    assert_eq!(
        err.missing_fields().unwrap(),
        &[
            ConfigField::Account,
            ConfigField::User,
            ConfigField::Credential,
            ConfigField::Warehouse
        ]
    );
    assert_eq!(warehouse.connection_attempts().await, 0);
    assert!(warehouse.statements().await.is_empty());
}

#[tokio::test]
async fn test_missing_credential_is_a_configuration_error() {
    let warehouse = MockWarehouse::new();
    let mut config = fixtures::valid_config();
    config.credential = None;

    let err = ConnectionManager::new(Arc::new(warehouse.clone()))
        .acquire(config)
        .await
        .unwrap_err();

    assert_eq!(err.missing_fields().unwrap(), &[ConfigField::Credential]);
    assert_eq!(warehouse.connection_attempts().await, 0);
}

#[tokio::test]
async fn test_connectivity_reports_session_facts() {
    let warehouse = MockWarehouse::new().with_password(fixtures::PASSWORD);
    let mut config = fixtures::valid_config();
    config.database.clear();

    let info = ConnectionManager::new(Arc::new(warehouse.clone()))
        .check_connectivity(config)
        .await
        .unwrap();

    assert!(!info.version.is_empty());
    assert!(!info.account.is_empty());
    assert!(!info.region.is_empty());
    assert_eq!(warehouse.open_sessions().await, 0);
}

#[tokio::test]
async fn test_wrong_password_is_authentication_error() {
    let warehouse = MockWarehouse::new().with_password("a-different-password");

    let err = ConnectionManager::new(Arc::new(warehouse.clone()))
        .check_connectivity(fixtures::valid_config())
        .await
        .unwrap_err();

    assert!(err.is_authentication());
    assert!(!err.is_network());
    assert_eq!(warehouse.connection_attempts().await, 1);
}

#[tokio::test]
async fn test_unreachable_account_is_network_error() {
    let warehouse = MockWarehouse::new().with_connection_failure();

    let err = ConnectionManager::new(Arc::new(warehouse.clone()))
        .check_connectivity(fixtures::valid_config())
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert!(!err.is_authentication());
    assert_eq!(warehouse.connection_attempts().await, 1);
}

// =============================================================================
// Provisioning Tests
// =============================================================================

#[tokio::test]
async fn test_ensure_table_twice_keeps_schema() {
    let warehouse = MockWarehouse::new();
    let manager = ConnectionManager::new(Arc::new(warehouse.clone()));
    let provisioner = SchemaProvisioner::new();
    let mut session = manager.acquire(fixtures::valid_config()).await.unwrap();

    provisioner.ensure_schema(&session, "DEMO_DB", "RAW_DATA").await.unwrap();
    for _ in 0..2 {
        let table = provisioner
            .ensure_table(&session, "DEMO_DB", "RAW_DATA", "CUSTOMERS", &TableSchema::customers())
            .await
            .unwrap();
        assert_eq!(warehouse.table_schema(&table).await, Some(TableSchema::customers()));
    }

    manager.release(&mut session).await;
}

#[tokio::test]
async fn test_reprovisioning_drops_existing_rows() {
    let warehouse = MockWarehouse::new();
    let orchestrator = orchestrator(&warehouse);

    orchestrator
        .run(fixtures::customers_request().with_overwrite(false), &fixtures::customers(20))
        .await
        .unwrap();
    orchestrator
        .run(fixtures::customers_request().with_overwrite(false), &fixtures::customers(5))
        .await
        .unwrap();

    assert_eq!(warehouse.row_count(&fixtures::customers_table()).await, Some(5));
}

// =============================================================================
// Load Tests
// =============================================================================

#[tokio::test]
async fn test_load_sample_customers() {
    let warehouse = MockWarehouse::new().with_password(fixtures::PASSWORD);

    let report = orchestrator(&warehouse)
        .run(fixtures::customers_request(), &fixtures::customers(100))
        .await
        .unwrap();

    assert!(report.load.succeeded);
    assert_eq!(report.load.rows_written, 100);
    assert_eq!(report.load.chunk_count, 1);
    assert_eq!(report.load.target_identifier, "DEMO_DB.RAW_DATA.CUSTOMERS");
    assert_eq!(warehouse.row_count(&fixtures::customers_table()).await, Some(100));
    assert_eq!(warehouse.open_sessions().await, 0);
}

#[tokio::test]
async fn test_overwrite_replaces_rows() {
    let warehouse = MockWarehouse::new();
    let manager = ConnectionManager::new(Arc::new(warehouse.clone()));
    let provisioner = SchemaProvisioner::new();
    let loader = BulkLoader::new();
    let mut session = manager.acquire(fixtures::valid_config()).await.unwrap();

    provisioner.ensure_schema(&session, "DEMO_DB", "RAW_DATA").await.unwrap();
    let table = provisioner
        .ensure_table(&session, "DEMO_DB", "RAW_DATA", "CUSTOMERS", &TableSchema::customers())
        .await
        .unwrap();

    let first = loader.load(&session, &fixtures::customers(30), &table, true).await.unwrap();
    let second = loader.load(&session, &fixtures::customers(12), &table, true).await.unwrap();

    assert_eq!(first.rows_written, 30);
    assert_eq!(second.rows_written, 12);
    assert_eq!(warehouse.row_count(&table).await, Some(12));

    manager.release(&mut session).await;
}

#[tokio::test]
async fn test_empty_dataset_is_a_successful_load() {
    let warehouse = MockWarehouse::new();

    let report = orchestrator(&warehouse)
        .run(
            fixtures::customers_request(),
            &Dataset::for_schema(&TableSchema::customers()),
        )
        .await
        .unwrap();

    assert!(report.load.succeeded);
    assert_eq!(report.load.rows_written, 0);
    assert_eq!(report.load.chunk_count, 0);
    assert!(!warehouse
        .statements()
        .await
        .iter()
        .any(|s| s.starts_with("INSERT")));
}

#[tokio::test]
async fn test_chunk_count_matches_ceiling() {
    for (rows, chunk_size, expected) in [(1, 1, 1), (10, 3, 4), (12, 4, 3), (99, 100, 1)] {
        let warehouse = MockWarehouse::new();
        let report = orchestrator(&warehouse)
            .with_loader(BulkLoader::new().with_chunk_size(chunk_size))
            .run(fixtures::customers_request(), &fixtures::customers(rows))
            .await
            .unwrap();

        assert_eq!(report.load.chunk_count, expected, "{} rows / {}", rows, chunk_size);
        assert_eq!(report.load.rows_written, rows as u64);
    }
}

#[tokio::test]
async fn test_all_column_types_load() {
    let warehouse = MockWarehouse::new();
    let request = snowload_engine::IngestRequest::new(
        fixtures::valid_config(),
        snowload_core::TableIdentifier::new("analytics", "raw", "events"),
        fixtures::events_schema(),
    );

    let report = orchestrator(&warehouse)
        .run(request, &fixtures::events(25))
        .await
        .unwrap();

    let table = snowload_core::TableIdentifier::new("ANALYTICS", "RAW", "EVENTS");
    assert_eq!(report.load.target_identifier, table.fqn());
    let rows = warehouse.table_rows(&table).await.unwrap();
    assert_eq!(rows.len(), 25);
    assert_eq!(rows[0][3], Value::Null);
    assert_eq!(rows[1][2], Value::Bool(false));
}

#[tokio::test]
async fn test_oversized_text_fails_before_connecting() {
    let warehouse = MockWarehouse::new();
    let mut dataset = fixtures::customers(2);
    dataset
        .push_row(vec![
            Value::Int(3),
            Value::Text("x".repeat(101)),
            Value::from("c3@example.com"),
            Value::from("Europe"),
            Value::Date(fixtures::today()),
        ])
        .unwrap();

    let err = orchestrator(&warehouse)
        .run(fixtures::customers_request(), &dataset)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::IncompatibleDataset(_)));
    assert_eq!(warehouse.connection_attempts().await, 0);
}

// =============================================================================
// Release Guarantee Tests
// =============================================================================

#[tokio::test]
async fn test_release_once_on_provisioning_failure() {
    let warehouse = MockWarehouse::new();
    warehouse
        .reject_statements(
            "CREATE SCHEMA",
            DriverError::Statement {
                code: Some("003001".to_string()),
                message: "Insufficient privileges to operate on database 'DEMO_DB'".to_string(),
            },
        )
        .await;

    let outcome = orchestrator(&warehouse)
        .execute(fixtures::customers_request(), &fixtures::customers(10))
        .await;

    assert_eq!(outcome.final_state(), RunState::Failed);
    assert!(outcome.reached(RunState::Closed));
    assert!(matches!(
        outcome.result,
        Err(IngestError::Provisioning { ref object, .. }) if object == "schema DEMO_DB.RAW_DATA"
    ));
    assert_eq!(warehouse.close_calls().await, 1);
}

#[tokio::test]
async fn test_release_once_on_load_error() {
    let warehouse = MockWarehouse::new();
    // CREATE DATABASE, USE, CREATE SCHEMA, CREATE TABLE, TRUNCATE, first INSERT
    warehouse.lose_connection_after(6).await;

    let outcome = orchestrator(&warehouse)
        .with_loader(BulkLoader::new().with_chunk_size(10))
        .execute(fixtures::customers_request(), &fixtures::customers(50))
        .await;

    assert_eq!(
        outcome.transitions,
        vec![
            RunState::Idle,
            RunState::Connected,
            RunState::Provisioned,
            RunState::Failed,
            RunState::Closed
        ]
    );
    let err = outcome.result.unwrap_err();
    assert!(matches!(err, IngestError::Load { ref target, .. } if target == "DEMO_DB.RAW_DATA.CUSTOMERS"));
    assert_eq!(warehouse.close_calls().await, 1);
}

#[tokio::test]
async fn test_release_once_on_reported_failure() {
    let warehouse = MockWarehouse::new().with_short_writes();

    let outcome = orchestrator(&warehouse)
        .execute(fixtures::customers_request(), &fixtures::customers(10))
        .await;

    assert_eq!(outcome.final_state(), RunState::Loaded);
    let load = outcome.result.unwrap();
    assert!(!load.succeeded);
    assert_eq!(load.rows_written, 9);
    assert_eq!(warehouse.close_calls().await, 1);
    assert_eq!(warehouse.open_sessions().await, 0);
}

#[tokio::test]
async fn test_no_release_when_never_connected() {
    let warehouse = MockWarehouse::new().with_open_failure(DriverError::Network("connection refused".to_string()));

    let outcome = orchestrator(&warehouse)
        .execute(fixtures::customers_request(), &fixtures::customers(1))
        .await;

    assert_eq!(outcome.transitions, vec![RunState::Idle, RunState::Failed]);
    assert_eq!(warehouse.close_calls().await, 0);
}

// =============================================================================
// Snowflake Integration Tests (require credentials)
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_snowflake_connectivity() {
    if !has_snowflake_credentials() {
        eprintln!("Skipping Snowflake test: no credentials available");
        eprintln!("Set SNOWFLAKE_ACCOUNT, SNOWFLAKE_USER, SNOWFLAKE_PASSWORD, SNOWFLAKE_ROLE and SNOWFLAKE_WAREHOUSE");
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use snowload_core::ConnectionConfig;
        use snowload_warehouse::SnowflakeDriver;

        let config = ConnectionConfig::default().with_env_overrides(|var| std::env::var(var).ok());
        let info = ConnectionManager::new(Arc::new(SnowflakeDriver::new()))
            .check_connectivity(config)
            .await
            .expect("Connectivity check failed");

        assert!(!info.version.is_empty());
        assert!(!info.account.is_empty());
        assert!(!info.region.is_empty());
        println!("Connected to {} in {} (Snowflake {})", info.account, info.region, info.version);
    }

    #[cfg(not(feature = "snowflake"))]
    {
        eprintln!("Snowflake feature not enabled. Rebuild with --features snowflake");
    }
}

#[tokio::test]
#[ignore]
async fn test_snowflake_wrong_password() {
    if !has_snowflake_credentials() {
        eprintln!("Skipping Snowflake test: no credentials available");
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use snowload_core::{ConnectionConfig, Credential};
        use snowload_warehouse::SnowflakeDriver;

        let mut config = ConnectionConfig::default().with_env_overrides(|var| std::env::var(var).ok());
        config.credential = Some(Credential::Password("definitely-not-the-password".to_string()));

        let err = ConnectionManager::new(Arc::new(SnowflakeDriver::new()))
            .check_connectivity(config)
            .await
            .expect_err("Wrong password should be rejected");

        assert!(err.is_authentication(), "expected authentication error, got {:?}", err);
    }

    #[cfg(not(feature = "snowflake"))]
    {
        eprintln!("Snowflake feature not enabled. Rebuild with --features snowflake");
    }
}

#[tokio::test]
#[ignore]
async fn test_snowflake_load_sample_customers() {
    if !has_snowflake_credentials() {
        eprintln!("Skipping Snowflake test: no credentials available");
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use snowload_core::ConnectionConfig;
        use snowload_engine::IngestRequest;
        use snowload_warehouse::SnowflakeDriver;

        let config = ConnectionConfig::default().with_env_overrides(|var| std::env::var(var).ok());
        let database = std::env::var("SNOWFLAKE_DATABASE").unwrap_or_else(|_| "DEMO_DB".to_string());
        let request = IngestRequest::new(
            config,
            snowload_core::TableIdentifier::new(database, "RAW_DATA", "SNOWLOAD_IT_CUSTOMERS"),
            TableSchema::customers(),
        );

        let report = Orchestrator::new(Arc::new(SnowflakeDriver::new()))
            .run(request, &fixtures::customers(100))
            .await
            .expect("Ingestion run failed");

        assert!(report.load.succeeded, "load failed: {:?}", report.load.failure);
        assert_eq!(report.load.rows_written, 100);
    }

    #[cfg(not(feature = "snowflake"))]
    {
        eprintln!("Snowflake feature not enabled. Rebuild with --features snowflake");
    }
}
