//! Warehouse driver traits
//!
//! A [`WarehouseDriver`] opens sessions; a [`WarehouseSession`] executes
//! [`Statement`]s against one authenticated connection. The engine only ever talks
//! to these traits, so the Snowflake driver and the in-memory mock are
//! interchangeable.

use snowload_core::ConnectionConfig;

use crate::statement::Statement;

/// Query used to validate a fresh session
pub const SESSION_INFO_QUERY: &str = "SELECT CURRENT_VERSION(), CURRENT_ACCOUNT(), CURRENT_REGION()";

/// Facts reported by the warehouse about the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Warehouse release (CURRENT_VERSION)
    pub version: String,

    /// Account locator (CURRENT_ACCOUNT)
    pub account: String,

    /// Cloud region (CURRENT_REGION)
    pub region: String,
}

/// What the warehouse reported back for a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementOutcome {
    /// Rows inserted/deleted, when the statement reports a count
    pub rows_affected: Option<u64>,
}

impl StatementOutcome {
    pub fn affected(rows: u64) -> Self {
        Self {
            rows_affected: Some(rows),
        }
    }
}

/// Errors raised by warehouse drivers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The warehouse refused the statement (privilege, missing object, bad value)
    #[error("Statement rejected: {message}")]
    Statement {
        code: Option<String>,
        message: String,
    },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Statement rejection without an error code
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Statement {
            code: None,
            message: message.into(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// True when the warehouse answered and refused the statement
    ///
    /// A rejected statement leaves the session usable and the outcome known.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Statement { .. })
    }
}

/// A driver that can open warehouse sessions
#[async_trait::async_trait]
pub trait WarehouseDriver: Send + Sync {
    /// Get the driver name (e.g., "Snowflake")
    fn name(&self) -> &'static str;

    /// Open a session with the given settings
    ///
    /// Implementations make a single attempt and never retry.
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn WarehouseSession>, DriverError>;
}

/// One live warehouse session
#[async_trait::async_trait]
pub trait WarehouseSession: Send + Sync {
    /// Run [`SESSION_INFO_QUERY`], authenticating if the driver is lazy
    async fn session_info(&self) -> Result<SessionInfo, DriverError>;

    /// Execute a single statement
    async fn execute(&self, statement: &Statement<'_>) -> Result<StatementOutcome, DriverError>;

    /// Close the session; closing twice is a no-op
    async fn close(&mut self) -> Result<(), DriverError>;
}
