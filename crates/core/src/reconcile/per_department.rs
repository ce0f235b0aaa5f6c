use super::{reconcile_group, ReconcileReport, RequestReconciler, TaskStream};
use crate::builder::GroupKey;
use crate::config::GroupingPolicy;
use crate::models::{Department, PatientTask};
use crate::repositories::{RequestRepository, TaskRepository};
use crate::ClinicResult;
use clinic_types::NonEmptyText;
use std::collections::BTreeMap;

/// One open request per patient and department.
///
/// A task reassigned to another department moves to that department's request; the
/// request it left is closed once it has no members.
#[derive(Clone)]
pub struct PerDepartmentReconciler {
    requests: RequestRepository,
    tasks: TaskRepository,
}

impl PerDepartmentReconciler {
    pub fn new(requests: RequestRepository, tasks: TaskRepository) -> Self {
        Self { requests, tasks }
    }
}

impl RequestReconciler for PerDepartmentReconciler {
    fn policy(&self) -> GroupingPolicy {
        GroupingPolicy::PerDepartment
    }

    fn update_requests(&self, tasks: TaskStream<'_>) -> ClinicResult<ReconcileReport> {
        let mut groups: BTreeMap<NonEmptyText, BTreeMap<Department, Vec<PatientTask>>> =
            BTreeMap::new();
        for task in tasks {
            groups
                .entry(task.patient_id.clone())
                .or_default()
                .entry(task.assigned_to)
                .or_default()
                .push(task);
        }

        let mut report = ReconcileReport::default();
        for (patient_id, departments) in groups {
            for (department, tasks) in departments {
                let key = GroupKey::department(patient_id.clone(), department);
                reconcile_group(&self.requests, &self.tasks, &key, tasks, &mut report)?;
            }
        }

        tracing::info!(policy = %self.policy(), %report, "reconciled patient requests");
        Ok(report)
    }
}
