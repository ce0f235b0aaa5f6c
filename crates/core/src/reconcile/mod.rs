//! Task-to-request reconciliation.
//!
//! A reconciler receives the *relevant* tasks for a batch (every open task of the affected
//! patients plus the tasks the batch closed), groups them by its policy's key and rewrites
//! one request per group from scratch. Two invariants are maintained across the request
//! table:
//!
//! - at most one open request per grouping key, and
//! - each task id belongs to at most one request.
//!
//! The second is enforced by a repair pass after each group is written: any *other* request
//! still listing one of the group's tasks loses it, and is closed if that leaves it empty.
//!
//! Writes are not transactional. A failure part-way through leaves earlier groups written;
//! replaying the same batch converges to the same state.

mod per_department;
mod per_patient;

pub use per_department::PerDepartmentReconciler;
pub use per_patient::PerPatientReconciler;

use crate::builder::{build_request, GroupKey};
use crate::config::GroupingPolicy;
use crate::models::{PatientRequest, PatientTask, Status};
use crate::repositories::{RequestRepository, TaskRepository};
use crate::{ClinicError, ClinicResult};
use clinic_types::NonEmptyText;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Single-pass sequence of tasks handed to a reconciler.
pub type TaskStream<'a> = Box<dyn Iterator<Item = PatientTask> + 'a>;

/// Rebuilds patient requests from the relevant tasks of a batch.
pub trait RequestReconciler: Send + Sync {
    fn policy(&self) -> GroupingPolicy;

    /// Reconciles every grouping present in `tasks`.
    ///
    /// The stream must already contain the whole relevant set for each affected patient;
    /// reconcilers do not widen it themselves.
    fn update_requests(&self, tasks: TaskStream<'_>) -> ClinicResult<ReconcileReport>;
}

/// Builds the reconciler for `policy`.
pub fn reconciler_for(
    policy: GroupingPolicy,
    requests: RequestRepository,
    tasks: TaskRepository,
) -> Box<dyn RequestReconciler> {
    match policy {
        GroupingPolicy::PerPatient => Box::new(PerPatientReconciler::new(requests, tasks)),
        GroupingPolicy::PerDepartment => Box::new(PerDepartmentReconciler::new(requests, tasks)),
    }
}

/// What a reconciliation call changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Groupings processed.
    pub groups: usize,
    /// Requests created.
    pub inserted: usize,
    /// Existing requests rewritten with different content.
    pub updated: usize,
    /// Existing requests whose rebuilt content was identical.
    pub unchanged: usize,
    /// Task memberships removed from other requests by the repair pass.
    pub detached: usize,
    /// Open requests closed because the repair pass emptied them.
    pub closed_by_repair: usize,
}

impl ReconcileReport {
    pub fn merge(&mut self, other: ReconcileReport) {
        self.groups += other.groups;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.detached += other.detached;
        self.closed_by_repair += other.closed_by_repair;
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} groups: {} inserted, {} updated, {} unchanged, {} detached, {} closed by repair",
            self.groups,
            self.inserted,
            self.updated,
            self.unchanged,
            self.detached,
            self.closed_by_repair
        )
    }
}

// ============================================================================
// Shared group processing
// ============================================================================

/// Keeps the last occurrence of each task id, in the order those occurrences appear.
pub(crate) fn dedupe_by_id(tasks: Vec<PatientTask>) -> Vec<PatientTask> {
    let mut seen: HashSet<NonEmptyText> = HashSet::new();
    let mut kept: Vec<PatientTask> = tasks
        .into_iter()
        .rev()
        .filter(|task| seen.insert(task.id.clone()))
        .collect();
    kept.reverse();
    kept
}

/// Builds and stores the request for one grouping, then repairs membership elsewhere.
///
/// With no open request and every task closed, the grouping's closed history is reused: the
/// most recent in-scope request owning any of the tasks is rebuilt from the union of its
/// closed members and `tasks`, so a late re-delivery never shrinks it.
pub(crate) fn reconcile_group(
    requests: &RequestRepository,
    task_store: &TaskRepository,
    key: &GroupKey,
    tasks: Vec<PatientTask>,
    report: &mut ReconcileReport,
) -> ClinicResult<PatientRequest> {
    let mut tasks = dedupe_by_id(tasks);
    let mut request = build_request(key, &tasks)?;

    let mut existing = requests.find_open(key)?;
    if existing.is_none() && request.status == Status::Closed {
        existing = requests.find_in_scope_owning_any(key, &request.task_ids)?;
        if let Some(history) = &existing {
            let missing: BTreeSet<NonEmptyText> = history
                .task_ids
                .difference(&request.task_ids)
                .cloned()
                .collect();
            if !missing.is_empty() {
                let closed = task_store.get_tasks_by_ids(&missing)?;
                tasks.extend(closed.into_iter().filter(|t| !t.is_open()));
                request = build_request(key, &tasks)?;
            }
        }
    }

    report.groups += 1;
    match existing {
        Some(current) => {
            request.id = current.id;
            if current == request {
                report.unchanged += 1;
            } else {
                requests.upsert(&request)?;
                report.updated += 1;
            }
            tracing::debug!(
                group = %key,
                request_id = %request.id,
                status = %request.status,
                "updated request"
            );
        }
        None => {
            requests.insert(&request)?;
            report.inserted += 1;
            tracing::debug!(
                group = %key,
                request_id = %request.id,
                status = %request.status,
                "inserted request"
            );
        }
    }

    detach_from_other_requests(requests, &request, report)?;
    Ok(request)
}

/// Removes `owner`'s tasks from every other request that still lists them.
///
/// # Errors
///
/// Returns [`ClinicError::MultipleOwners`] if a task is listed by more than one other
/// request, which means the table was already inconsistent before this call.
pub(crate) fn detach_from_other_requests(
    requests: &RequestRepository,
    owner: &PatientRequest,
    report: &mut ReconcileReport,
) -> ClinicResult<()> {
    for task_id in &owner.task_ids {
        let mut others = requests.find_other_owners(task_id.as_str(), &owner.id)?;
        if others.len() > 1 {
            return Err(ClinicError::MultipleOwners {
                task_id: task_id.to_string(),
                request_ids: others.iter().map(|r| r.id.to_string()).collect(),
            });
        }

        let Some(mut other) = others.pop() else {
            continue;
        };
        let was_open = other.is_open();
        other.detach_task(task_id.as_str());
        requests.update(&other)?;

        report.detached += 1;
        if was_open && !other.is_open() {
            report.closed_by_repair += 1;
        }
        tracing::debug!(
            task_id = %task_id,
            from = %other.id,
            to = %owner.id,
            closed = !other.is_open(),
            "moved task between requests"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Department;
    use chrono::{TimeZone, Utc};

    fn task(id: &str, message: &str) -> PatientTask {
        let at = Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap();
        PatientTask {
            id: NonEmptyText::new(id).unwrap(),
            patient_id: NonEmptyText::new("patient1").unwrap(),
            status: Status::Open,
            assigned_to: Department::Primary,
            created_date: at,
            updated_date: at,
            message: message.into(),
            medications: vec![],
            pharmacy_id: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_last_occurrence() {
        let kept = dedupe_by_id(vec![
            task("task1", "first"),
            task("task2", "only"),
            task("task1", "second"),
        ]);
        let summary: Vec<_> = kept
            .iter()
            .map(|t| (t.id.as_str(), t.message.as_str()))
            .collect();
        assert_eq!(summary, vec![("task2", "only"), ("task1", "second")]);
    }

    #[test]
    fn test_report_merge_and_display() {
        let mut total = ReconcileReport {
            groups: 1,
            inserted: 1,
            ..Default::default()
        };
        total.merge(ReconcileReport {
            groups: 2,
            updated: 1,
            detached: 3,
            closed_by_repair: 1,
            ..Default::default()
        });
        assert_eq!(total.groups, 3);
        assert_eq!(total.detached, 3);
        assert_eq!(
            total.to_string(),
            "3 groups: 1 inserted, 1 updated, 0 unchanged, 3 detached, 1 closed by repair"
        );
    }
}
