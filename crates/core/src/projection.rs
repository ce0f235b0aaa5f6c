//! Read-time projection of requests.
//!
//! Messages and medications are never stored on a request. They are rebuilt here from the
//! current task records every time a request is rendered.

use crate::config::MedicationPolicy;
use crate::models::{Medication, PatientRequest, PatientTask, RequestView};
use crate::repositories::TaskRepository;
use crate::ClinicResult;
use std::collections::HashSet;

#[derive(Clone)]
pub struct RequestProjector {
    tasks: TaskRepository,
    medication_policy: MedicationPolicy,
}

impl RequestProjector {
    pub fn new(tasks: TaskRepository, medication_policy: MedicationPolicy) -> Self {
        Self {
            tasks,
            medication_policy,
        }
    }

    /// Renders `request` with messages and medications ordered by task `updated_date`.
    ///
    /// Member ids with no stored task are skipped.
    pub fn project(&self, request: &PatientRequest) -> ClinicResult<RequestView> {
        let mut members = self.tasks.get_tasks_by_ids(&request.task_ids)?;
        if members.len() < request.task_ids.len() {
            let found: HashSet<&str> = members.iter().map(|t| t.id.as_str()).collect();
            for missing in request.task_ids.iter().filter(|id| !found.contains(id.as_str())) {
                tracing::warn!(
                    request_id = %request.id,
                    task_id = %missing,
                    "request references unknown task"
                );
            }
        }
        members.sort_by_key(|t| t.updated_date);

        Ok(RequestView {
            request: request.clone(),
            messages: members.iter().map(|t| t.message.clone()).collect(),
            medications: collect_medications(&members, self.medication_policy),
        })
    }
}

fn collect_medications(tasks: &[PatientTask], policy: MedicationPolicy) -> Vec<Medication> {
    let all = tasks.iter().flat_map(|t| t.medications.iter().cloned());
    match policy {
        MedicationPolicy::Concatenate => all.collect(),
        MedicationPolicy::DeduplicateByCode => {
            let mut seen = HashSet::new();
            all.filter(|m| seen.insert(m.code.clone())).collect()
        }
    }
}
