//! Task table access.

use super::{from_documents, to_document};
use crate::constants::TASKS_TABLE;
use crate::models::{PatientTask, Status};
use crate::ClinicResult;
use clinic_store::{field, DocumentStore, WriteOutcome};
use clinic_types::NonEmptyText;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Reads and writes [`PatientTask`] records, keyed by task id.
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stores each task, replacing any previous revision with the same id.
    ///
    /// Tasks are written in order, so a batch repeating an id leaves the last one stored.
    /// Returns how many tasks were new.
    pub fn upsert_tasks(&self, tasks: &[PatientTask]) -> ClinicResult<usize> {
        let mut inserted = 0;
        for task in tasks {
            let outcome = self.store.upsert(
                TASKS_TABLE,
                to_document(task)?,
                &field("id").eq(task.id.as_str()),
            )?;
            if outcome == WriteOutcome::Inserted {
                inserted += 1;
            }
        }
        tracing::debug!(count = tasks.len(), inserted, "upserted tasks");
        Ok(inserted)
    }

    /// Fetches the stored tasks whose ids are in `task_ids`, in store order.
    ///
    /// Ids with no stored task are silently absent from the result.
    pub fn get_tasks_by_ids(
        &self,
        task_ids: &BTreeSet<NonEmptyText>,
    ) -> ClinicResult<Vec<PatientTask>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = field("id").one_of(task_ids.iter().map(|id| id.as_str()));
        from_documents(self.store.search(TASKS_TABLE, &query)?)
    }

    /// Every open task belonging to one of `patient_ids`.
    pub fn open_tasks_for_patients(
        &self,
        patient_ids: &BTreeSet<NonEmptyText>,
    ) -> ClinicResult<Vec<PatientTask>> {
        if patient_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = field("status").eq(Status::Open.as_str())
            & field("patient_id").one_of(patient_ids.iter().map(|id| id.as_str()));
        from_documents(self.store.search(TASKS_TABLE, &query)?)
    }
}
