//! Batch ingestion: persist tasks, widen to the relevant set, reconcile.

use crate::batch::TaskBatch;
use crate::config::{CoreConfig, GroupingPolicy};
use crate::models::PatientTask;
use crate::reconcile::{reconciler_for, ReconcileReport, RequestReconciler, TaskStream};
use crate::repositories::{RequestRepository, TaskRepository};
use crate::ClinicResult;
use clinic_store::DocumentStore;
use clinic_types::NonEmptyText;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Drives one batch through the task store and the active reconciler.
///
/// Batches must be processed one at a time, in order.
pub struct IngestionService {
    tasks: TaskRepository,
    reconciler: Box<dyn RequestReconciler>,
}

impl IngestionService {
    /// Creates a service using the grouping policy from `cfg`.
    pub fn new(store: Arc<dyn DocumentStore>, cfg: &CoreConfig) -> Self {
        let tasks = TaskRepository::new(store.clone());
        let reconciler =
            reconciler_for(cfg.grouping(), RequestRepository::new(store), tasks.clone());
        Self::with_reconciler(tasks, reconciler)
    }

    pub fn with_reconciler(tasks: TaskRepository, reconciler: Box<dyn RequestReconciler>) -> Self {
        Self { tasks, reconciler }
    }

    pub fn policy(&self) -> GroupingPolicy {
        self.reconciler.policy()
    }

    /// Processes one batch.
    ///
    /// 1. An empty batch returns immediately without touching the store.
    /// 2. Every task is upserted by id.
    /// 3. The tasks the batch closed, plus every open stored task of the batch's patients,
    ///    are handed to the reconciler.
    ///
    /// If reconciliation fails, the upserted tasks stay stored; replaying the batch is safe.
    pub fn process_batch(&self, batch: &TaskBatch) -> ClinicResult<ReconcileReport> {
        if batch.is_empty() {
            tracing::info!("empty task batch, nothing to do");
            return Ok(ReconcileReport::default());
        }

        self.tasks.upsert_tasks(&batch.tasks)?;

        let latest = latest_revisions(&batch.tasks);
        let newly_closed: Vec<PatientTask> = latest
            .values()
            .filter(|t| !t.is_open())
            .map(|t| (*t).clone())
            .collect();
        let affected: BTreeSet<NonEmptyText> =
            latest.values().map(|t| t.patient_id.clone()).collect();

        let open = self.tasks.open_tasks_for_patients(&affected)?;
        tracing::info!(
            tasks = batch.tasks.len(),
            patients = affected.len(),
            open = open.len(),
            closed = newly_closed.len(),
            "processing task batch"
        );

        let relevant: TaskStream<'_> = Box::new(open.into_iter().chain(newly_closed));
        self.reconciler.update_requests(relevant)
    }
}

/// The last revision of each task id within a batch.
fn latest_revisions(tasks: &[PatientTask]) -> BTreeMap<&str, &PatientTask> {
    tasks.iter().map(|t| (t.id.as_str(), t)).collect()
}
