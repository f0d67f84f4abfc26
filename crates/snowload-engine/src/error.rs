//! Ingestion error taxonomy

use snowload_core::{ConfigField, IdentifierError, SchemaMismatch};
use snowload_warehouse::DriverError;

/// Why a provisioning step failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProvisioningCause {
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("table schema has no columns")]
    EmptySchema,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Errors that abort an ingestion run
///
/// A load that the warehouse rejected is not an error: it comes back as a
/// [`LoadResult`](snowload_core::LoadResult) with `succeeded == false`.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Required settings missing or left at placeholder values
    #[error("missing or placeholder settings: {}", join_fields(.missing))]
    Configuration { missing: Vec<ConfigField> },

    /// Authentication or network failure while opening the session
    #[error("failed to connect to Snowflake account '{account}'")]
    Connection {
        account: String,
        #[source]
        source: DriverError,
    },

    /// DDL failure
    #[error("failed to provision {object}")]
    Provisioning {
        object: String,
        #[source]
        source: ProvisioningCause,
    },

    /// The load outcome could not be determined
    #[error("load into {target} did not complete")]
    Load {
        target: String,
        #[source]
        source: DriverError,
    },

    /// The dataset does not fit the destination table schema
    #[error("dataset does not match the table schema")]
    IncompatibleDataset(#[from] SchemaMismatch),
}

impl IngestError {
    /// The connection was refused because the credentials are wrong
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Connection { source, .. } if source.is_authentication())
    }

    /// The warehouse could not be reached
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Connection { source, .. } if source.is_network())
    }

    /// Fields reported missing, for configuration errors
    pub fn missing_fields(&self) -> Option<&[ConfigField]> {
        match self {
            Self::Configuration { missing } => Some(missing),
            _ => None,
        }
    }

    /// Underlying driver error, when there is one
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Connection { source, .. } | Self::Load { source, .. } => Some(source),
            Self::Provisioning {
                source: ProvisioningCause::Driver(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}

fn join_fields(fields: &[ConfigField]) -> String {
    fields
        .iter()
        .map(|f| f.env_var())
        .collect::<Vec<_>>()
        .join(", ")
}
