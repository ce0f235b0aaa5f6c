//! Patient requests: the aggregate stored in the `PatientRequest` table.

use chrono::{DateTime, Utc};
use clinic_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Department, Medication, Status};
use crate::ids::RequestId;

/// Aggregate work item for a patient (optionally scoped to one department).
///
/// `task_ids` is the authoritative membership. Messages and medications are never stored
/// here; they are projected from the current task records on read
/// (see [`crate::projection::RequestProjector`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRequest {
    pub id: RequestId,
    pub patient_id: NonEmptyText,
    pub status: Status,
    pub assigned_to: Department,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub pharmacy_id: Option<i64>,
    pub task_ids: BTreeSet<NonEmptyText>,
}

impl PatientRequest {
    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.task_ids.contains(task_id)
    }

    /// Drops `task_id` from the membership, closing the request when nothing is left.
    ///
    /// Returns true if the task was a member.
    pub fn detach_task(&mut self, task_id: &str) -> bool {
        let removed = self.task_ids.remove(task_id);
        if removed && self.task_ids.is_empty() {
            self.status = Status::Closed;
        }
        removed
    }
}

/// A request as rendered for readers: the stored record plus its derived projections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: PatientRequest,
    pub messages: Vec<String>,
    pub medications: Vec<Medication>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request_with(task_ids: &[&str]) -> PatientRequest {
        let at = Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap();
        PatientRequest {
            id: RequestId::new(),
            patient_id: NonEmptyText::new("patient1").unwrap(),
            status: Status::Open,
            assigned_to: Department::Primary,
            created_date: at,
            updated_date: at,
            pharmacy_id: Some(123),
            task_ids: task_ids
                .iter()
                .map(|id| NonEmptyText::new(id).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_detach_task_keeps_open_while_members_remain() {
        let mut request = request_with(&["task1", "task2"]);
        assert!(request.detach_task("task1"));
        assert!(request.is_open());
        assert!(!request.contains_task("task1"));
        assert!(request.contains_task("task2"));
    }

    #[test]
    fn test_detach_last_task_closes_request() {
        let mut request = request_with(&["task1"]);
        assert!(request.detach_task("task1"));
        assert_eq!(request.status, Status::Closed);
        assert!(request.task_ids.is_empty());
    }

    #[test]
    fn test_detach_unknown_task_is_noop() {
        let mut request = request_with(&["task1"]);
        assert!(!request.detach_task("task9"));
        assert!(request.is_open());
    }

    #[test]
    fn test_task_ids_serialize_as_array() {
        let request = request_with(&["task2", "task1"]);
        let doc = serde_json::to_value(&request).unwrap();
        assert_eq!(doc["task_ids"], serde_json::json!(["task1", "task2"]));
        assert_eq!(doc["status"], "Open");
    }
}
