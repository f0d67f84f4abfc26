//! Warehouse drivers for ingestion runs
//!
//! This crate defines the seam between the ingestion engine and a concrete
//! warehouse: drivers open sessions, sessions execute [`Statement`]s.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `snowflake` - Snowflake support through the SQL REST API
//!
//! ## Example
//!
//! ```rust,ignore
//! use snowload_warehouse::{SnowflakeDriver, Statement, WarehouseDriver};
//!
//! let session = SnowflakeDriver::new().open(&config).await?;
//! let info = session.session_info().await?;
//! session.execute(&Statement::CreateDatabase { database: "DEMO_DB" }).await?;
//! ```

pub mod driver;
pub mod mock;
pub mod snowflake;
pub mod statement;

pub use driver::{
    DriverError, SessionInfo, StatementOutcome, WarehouseDriver, WarehouseSession, SESSION_INFO_QUERY,
};
pub use mock::MockWarehouse;
pub use snowflake::SnowflakeDriver;
pub use statement::{literal, quote_string, Statement};
