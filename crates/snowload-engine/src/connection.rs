//! Session lifecycle
//!
//! [`ConnectionManager::acquire`] validates settings, opens one session and checks
//! it answers. The returned [`Session`] is the only handle to the warehouse
//! connection; [`Session::release`] closes it and can be called any number of times.

use std::sync::Arc;

use snowload_core::{ConfigField, ConnectionConfig, CONNECTIVITY_FIELDS, INGEST_FIELDS};
use snowload_warehouse::{DriverError, SessionInfo, Statement, StatementOutcome, WarehouseDriver, WarehouseSession};
use tracing::{debug, error, info, warn};

use crate::error::IngestError;

/// A validated warehouse session
pub struct Session {
    inner: Option<Box<dyn WarehouseSession>>,
    info: SessionInfo,
    account: String,
}

impl Session {
    /// Facts the warehouse reported when the session was validated
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Account the session was opened against
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Execute a statement on this session
    pub async fn execute(&self, statement: &Statement<'_>) -> Result<StatementOutcome, DriverError> {
        match &self.inner {
            Some(session) => session.execute(statement).await,
            None => Err(DriverError::SessionClosed),
        }
    }

    /// Close the session
    ///
    /// Only the first call reaches the warehouse. A failed close is logged and
    /// otherwise ignored so it never hides the outcome of the run.
    pub async fn release(&mut self) {
        let Some(mut session) = self.inner.take() else {
            return;
        };

        match session.close().await {
            Ok(()) => info!(account = %self.account, "Snowflake connection closed"),
            Err(e) => warn!(account = %self.account, error = %e, "Failed to close Snowflake connection cleanly"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!(account = %self.account, "Session dropped without release");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("open", &self.is_open())
            .field("info", &self.info)
            .finish()
    }
}

/// Opens and closes warehouse sessions through a driver
#[derive(Clone)]
pub struct ConnectionManager {
    driver: Arc<dyn WarehouseDriver>,
}

impl ConnectionManager {
    pub fn new(driver: Arc<dyn WarehouseDriver>) -> Self {
        Self { driver }
    }

    /// Name of the underlying driver
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Open a session for an ingestion run
    ///
    /// Every setting except the schema is required. Missing values fail with
    /// [`IngestError::Configuration`] before the driver is touched. The connection
    /// is attempted once.
    pub async fn acquire(&self, config: ConnectionConfig) -> Result<Session, IngestError> {
        self.acquire_with(config, INGEST_FIELDS).await
    }

    /// Close a session; safe to call on an already released session
    pub async fn release(&self, session: &mut Session) {
        session.release().await;
    }

    /// Connect, report session facts and disconnect
    ///
    /// Requires account, user, credential, role and warehouse; the database may be
    /// left unset.
    pub async fn check_connectivity(&self, config: ConnectionConfig) -> Result<SessionInfo, IngestError> {
        let mut session = self.acquire_with(config, CONNECTIVITY_FIELDS).await?;
        let info = session.info().clone();
        session.release().await;
        Ok(info)
    }

    async fn acquire_with(
        &self,
        config: ConnectionConfig,
        required: &[ConfigField],
    ) -> Result<Session, IngestError> {
        let missing = config.missing_fields(required);
        if !missing.is_empty() {
            error!(missing = ?missing, "Connection settings incomplete");
            return Err(IngestError::Configuration { missing });
        }

        let account = config.account.trim().to_string();
        debug!(driver = self.driver.name(), account = %account, "Opening warehouse session");

        let connection_error = |source: DriverError| {
            error!(account = %account, error = %source, "Failed to connect to Snowflake");
            IngestError::Connection {
                account: account.clone(),
                source,
            }
        };

        let mut session = self.driver.open(&config).await.map_err(connection_error)?;

        let info = match session.session_info().await {
            Ok(info) => info,
            Err(source) => {
                if let Err(e) = session.close().await {
                    warn!(error = %e, "Failed to close partially opened session");
                }
                return Err(connection_error(source));
            }
        };

        info!(
            account = %info.account,
            region = %info.region,
            version = %info.version,
            "Successfully connected to Snowflake"
        );

        Ok(Session {
            inner: Some(session),
            info,
            account,
        })
    }
}
