use super::{reconcile_group, ReconcileReport, RequestReconciler, TaskStream};
use crate::builder::GroupKey;
use crate::config::GroupingPolicy;
use crate::models::PatientTask;
use crate::repositories::{RequestRepository, TaskRepository};
use crate::ClinicResult;
use clinic_types::NonEmptyText;
use std::collections::BTreeMap;

/// One open request per patient, whatever department its tasks are assigned to.
///
/// The request's `assigned_to` follows the newest member task.
#[derive(Clone)]
pub struct PerPatientReconciler {
    requests: RequestRepository,
    tasks: TaskRepository,
}

impl PerPatientReconciler {
    pub fn new(requests: RequestRepository, tasks: TaskRepository) -> Self {
        Self { requests, tasks }
    }
}

impl RequestReconciler for PerPatientReconciler {
    fn policy(&self) -> GroupingPolicy {
        GroupingPolicy::PerPatient
    }

    fn update_requests(&self, tasks: TaskStream<'_>) -> ClinicResult<ReconcileReport> {
        let mut by_patient: BTreeMap<NonEmptyText, Vec<PatientTask>> = BTreeMap::new();
        for task in tasks {
            by_patient
                .entry(task.patient_id.clone())
                .or_default()
                .push(task);
        }

        let mut report = ReconcileReport::default();
        for (patient_id, tasks) in by_patient {
            let key = GroupKey::patient(patient_id);
            reconcile_group(&self.requests, &self.tasks, &key, tasks, &mut report)?;
        }

        tracing::info!(policy = %self.policy(), %report, "reconciled patient requests");
        Ok(report)
    }
}
