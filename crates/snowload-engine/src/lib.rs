//! Snowload engine
//!
//! Drives one ingestion run against a warehouse:
//! - [`ConnectionManager`] opens, validates and releases the session
//! - [`SchemaProvisioner`] creates the database, schema and table
//! - [`BulkLoader`] writes the dataset in chunks
//! - [`Orchestrator`] runs the three in order and always releases the session

pub mod connection;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod provisioner;

pub use connection::{ConnectionManager, Session};
pub use error::{IngestError, ProvisioningCause};
pub use loader::BulkLoader;
pub use orchestrator::{IngestReport, IngestRequest, Orchestrator, RunOutcome, RunState};
pub use provisioner::SchemaProvisioner;
