//! # Clinic Core
//!
//! Reconciliation of clinical tasks into patient requests.
//!
//! Tasks arrive in batches of modified records. Each batch is persisted to the task table,
//! widened to every open task of the affected patients, and folded into patient requests by
//! the configured grouping policy:
//! - [`GroupingPolicy::PerPatient`]: one open request per patient.
//! - [`GroupingPolicy::PerDepartment`]: one open request per patient and department.
//!
//! Requests store membership (`task_ids`) and summary fields only. Messages and medications
//! are projected from the current task records on read ([`RequestProjector`]).
//!
//! **No I/O beyond the document store**: batch files are read by [`TaskBatch::from_path`];
//! argument parsing, logging setup and output formatting belong in `clinic-cli`.

pub mod batch;
pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod ingestion;
pub mod models;
pub mod projection;
pub mod reconcile;
pub mod repositories;

pub use batch::TaskBatch;
pub use builder::{build_request, GroupKey};
pub use config::{CoreConfig, GroupingPolicy, MedicationPolicy};
pub use error::{ClinicError, ClinicResult};
pub use ids::RequestId;
pub use ingestion::IngestionService;
pub use models::{Department, Medication, PatientRequest, PatientTask, RequestView, Status};
pub use projection::RequestProjector;
pub use reconcile::{ReconcileReport, RequestReconciler, TaskStream};
pub use repositories::{RequestFilter, RequestRepository, TaskRepository};

use clinic_store::DocumentStore;
use std::sync::Arc;

/// Entry point wiring the store, ingestion and projection together.
pub struct ClinicService {
    ingestion: IngestionService,
    requests: RequestRepository,
    projector: RequestProjector,
}

impl ClinicService {
    /// Opens the configured store and builds the services on top of it.
    pub fn new(cfg: &CoreConfig) -> ClinicResult<Self> {
        let store = cfg.open_store()?;
        Ok(Self::with_store(store, cfg))
    }

    /// Builds the services over an already opened store.
    pub fn with_store(store: Arc<dyn DocumentStore>, cfg: &CoreConfig) -> Self {
        let tasks = TaskRepository::new(store.clone());
        Self {
            ingestion: IngestionService::new(store.clone(), cfg),
            requests: RequestRepository::new(store),
            projector: RequestProjector::new(tasks, cfg.medications()),
        }
    }

    pub fn process_batch(&self, batch: &TaskBatch) -> ClinicResult<ReconcileReport> {
        self.ingestion.process_batch(batch)
    }

    pub fn list_requests(&self, filter: &RequestFilter) -> ClinicResult<Vec<PatientRequest>> {
        self.requests.search(filter)
    }

    /// Lists matching requests with their projections.
    pub fn list_views(&self, filter: &RequestFilter) -> ClinicResult<Vec<RequestView>> {
        self.requests
            .search(filter)?
            .iter()
            .map(|request| self.projector.project(request))
            .collect()
    }

    /// Loads one request with its projections.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::RequestNotFound`] if no request has that id.
    pub fn request_view(&self, id: &RequestId) -> ClinicResult<RequestView> {
        let request = self
            .requests
            .get(id)?
            .ok_or_else(|| ClinicError::RequestNotFound(id.to_string()))?;
        self.projector.project(&request)
    }
}
