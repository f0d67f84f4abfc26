//! One ingestion run, from connect to release
//!
//! ```text
//! Idle ──acquire──▶ Connected ──provision──▶ Provisioned ──load──▶ Loaded ──▶ Closed
//!   │                  │                         │
//!   └──────────────────┴─────────────────────────┴──▶ Failed ──▶ Closed (once connected)
//! ```
//!
//! The session is released at a single point that every path through
//! [`Orchestrator::execute`] reaches once it has connected.

use std::sync::Arc;

use serde::Serialize;
use snowload_core::{ConnectionConfig, Dataset, LoadResult, TableIdentifier, TableSchema};
use snowload_warehouse::WarehouseDriver;
use tracing::{error, info, warn};

use crate::connection::{ConnectionManager, Session};
use crate::error::IngestError;
use crate::loader::BulkLoader;
use crate::provisioner::SchemaProvisioner;

/// Run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Connected,
    Provisioned,
    Loaded,
    Closed,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Connected => "connected",
            RunState::Provisioned => "provisioned",
            RunState::Loaded => "loaded",
            RunState::Closed => "closed",
            RunState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// What to load and where
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub connection: ConnectionConfig,
    pub target: TableIdentifier,
    pub schema: TableSchema,
    pub overwrite: bool,
}

impl IngestRequest {
    pub fn new(connection: ConnectionConfig, target: TableIdentifier, schema: TableSchema) -> Self {
        Self {
            connection,
            target,
            schema,
            overwrite: true,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Report of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub load: LoadResult,
    pub transitions: Vec<RunState>,
}

/// Everything a run produced, successful or not
#[derive(Debug)]
pub struct RunOutcome {
    /// States the run passed through, starting at [`RunState::Idle`]
    pub transitions: Vec<RunState>,
    pub result: Result<LoadResult, IngestError>,
}

impl RunOutcome {
    /// Last state the run reached that is not [`RunState::Closed`]
    ///
    /// A failed run that released its session ends on `Closed`; this still
    /// reports `Failed`.
    pub fn final_state(&self) -> RunState {
        self.transitions
            .iter()
            .rev()
            .copied()
            .find(|state| *state != RunState::Closed)
            .unwrap_or(RunState::Idle)
    }

    pub fn reached(&self, state: RunState) -> bool {
        self.transitions.contains(&state)
    }

    pub fn into_result(self) -> Result<IngestReport, IngestError> {
        let transitions = self.transitions;
        self.result.map(|load| IngestReport { load, transitions })
    }
}

struct Transitions(Vec<RunState>);

impl Transitions {
    fn new() -> Self {
        Self(vec![RunState::Idle])
    }

    fn enter(&mut self, state: RunState) {
        if let Some(from) = self.0.last() {
            info!(from = %from, to = %state, "Run state changed");
        }
        self.0.push(state);
    }
}

/// Runs connect, provision, load and release in order
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::new(Arc::new(SnowflakeDriver::new()));
/// let report = orchestrator.run(request, &dataset).await?;
/// println!("{} rows in {} chunks", report.load.rows_written, report.load.chunk_count);
/// ```
pub struct Orchestrator {
    connections: ConnectionManager,
    provisioner: SchemaProvisioner,
    loader: BulkLoader,
}

impl Orchestrator {
    pub fn new(driver: Arc<dyn WarehouseDriver>) -> Self {
        Self {
            connections: ConnectionManager::new(driver),
            provisioner: SchemaProvisioner::new(),
            loader: BulkLoader::new(),
        }
    }

    pub fn with_loader(mut self, loader: BulkLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Run and surface the first error
    pub async fn run(&self, request: IngestRequest, dataset: &Dataset) -> Result<IngestReport, IngestError> {
        self.execute(request, dataset).await.into_result()
    }

    /// Run and return the full outcome, including the states visited
    pub async fn execute(&self, request: IngestRequest, dataset: &Dataset) -> RunOutcome {
        let mut transitions = Transitions::new();

        if let Err(mismatch) = dataset.check_against(&request.schema) {
            error!(table = %request.target, error = %mismatch, "Dataset does not fit the table schema");
            transitions.enter(RunState::Failed);
            return RunOutcome {
                transitions: transitions.0,
                result: Err(mismatch.into()),
            };
        }

        let mut session = match self.connections.acquire(request.connection.clone()).await {
            Ok(session) => session,
            Err(e) => {
                transitions.enter(RunState::Failed);
                return RunOutcome {
                    transitions: transitions.0,
                    result: Err(e),
                };
            }
        };
        transitions.enter(RunState::Connected);

        let result = self.provision_and_load(&session, &request, dataset, &mut transitions).await;

        match &result {
            Ok(load) if !load.succeeded => {
                warn!(table = %load.target_identifier, failure = ?load.failure, "Load reported failure")
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Ingestion run failed");
                transitions.enter(RunState::Failed);
            }
        }

        self.connections.release(&mut session).await;
        transitions.enter(RunState::Closed);

        RunOutcome {
            transitions: transitions.0,
            result,
        }
    }

    async fn provision_and_load(
        &self,
        session: &Session,
        request: &IngestRequest,
        dataset: &Dataset,
        transitions: &mut Transitions,
    ) -> Result<LoadResult, IngestError> {
        let target = &request.target;

        self.provisioner
            .ensure_schema(session, &target.database, &target.schema)
            .await?;
        let table = self
            .provisioner
            .ensure_table(session, &target.database, &target.schema, &target.table, &request.schema)
            .await?;
        transitions.enter(RunState::Provisioned);

        let load = self.loader.load(session, dataset, &table, request.overwrite).await?;
        transitions.enter(RunState::Loaded);

        Ok(load)
    }
}
