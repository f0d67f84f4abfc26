//! Test fixtures for ingestion integration tests
//!
//! Connection settings, destination tables and datasets shared by the tests.
//! Everything here is deterministic so row counts can be asserted exactly.

#![allow(dead_code)]

use chrono::NaiveDate;
use snowload_core::{
    sample_customers, ColumnDef, ColumnType, ConnectionConfig, Credential, Dataset, TableIdentifier,
    TableSchema, Value,
};
use snowload_engine::IngestRequest;

pub const PASSWORD: &str = "correct-horse";

/// Fixed "today" for synthetic signup dates
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

/// Complete connection settings accepted by `MockWarehouse::with_password(PASSWORD)`
pub fn valid_config() -> ConnectionConfig {
    ConnectionConfig {
        account: "xy12345.us-east-1".to_string(),
        user: "INGEST_USER".to_string(),
        credential: Some(Credential::Password(PASSWORD.to_string())),
        role: "SYSADMIN".to_string(),
        database: "DEMO_DB".to_string(),
        warehouse: "COMPUTE_WH".to_string(),
        schema: None,
    }
}

/// Settings as they look in an unedited `.env` template
pub fn template_config() -> ConnectionConfig {
    ConnectionConfig {
        account: "your_account_identifier".to_string(),
        user: "your_username".to_string(),
        credential: Some(Credential::Password("your_password".to_string())),
        role: "SYSADMIN".to_string(),
        database: "DEMO_DB".to_string(),
        warehouse: "your_warehouse".to_string(),
        schema: None,
    }
}

pub fn customers_table() -> TableIdentifier {
    TableIdentifier::new("DEMO_DB", "RAW_DATA", "CUSTOMERS")
}

pub fn customers_request() -> IngestRequest {
    IngestRequest::new(valid_config(), customers_table(), TableSchema::customers())
}

pub fn customers(count: usize) -> Dataset {
    sample_customers(count, today())
}

/// Event log table covering the remaining column types
pub fn events_schema() -> TableSchema {
    TableSchema::from_columns(vec![
        ColumnDef::new("EVENT_ID", ColumnType::Integer),
        ColumnDef::new("SCORE", ColumnType::Float),
        ColumnDef::new("IS_BOT", ColumnType::Boolean),
        ColumnDef::new("PAYLOAD", ColumnType::Varchar { length: None }),
        ColumnDef::new("OCCURRED_AT", ColumnType::Timestamp),
    ])
}

pub fn events(count: usize) -> Dataset {
    let mut dataset = Dataset::new(["event_id", "score", "is_bot", "payload", "occurred_at"]);
    let start = today().and_hms_opt(8, 0, 0).unwrap();

    for i in 0..count {
        let payload = if i % 3 == 0 {
            Value::Null
        } else {
            Value::Text(format!("{{\"page\": \"/p/{}\", \"ref\": \"it's\"}}", i))
        };
        dataset
            .push_row(vec![
                Value::Int(i as i64),
                Value::Float(i as f64 * 0.5),
                Value::Bool(i % 2 == 0),
                payload,
                Value::Timestamp(start + chrono::Duration::minutes(i as i64)),
            ])
            .unwrap();
    }

    dataset
}

pub fn template_config_request() -> IngestRequest {
    IngestRequest::new(template_config(), customers_table(), TableSchema::customers())
}
