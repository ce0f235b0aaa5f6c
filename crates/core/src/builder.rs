//! Folding a grouping's tasks into one patient request.
//!
//! The builder is pure: it never touches the store. It always allocates a fresh
//! [`RequestId`]; reconciliation replaces it with the existing id when the result updates a
//! stored request.

use crate::ids::RequestId;
use crate::models::{Department, PatientRequest, PatientTask, Status};
use crate::{ClinicError, ClinicResult};
use clinic_store::{field, Query};
use clinic_types::NonEmptyText;
use std::fmt;

/// The grouping a request belongs to.
///
/// Per-patient grouping leaves `department` unset; per-department grouping pins it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    patient_id: NonEmptyText,
    department: Option<Department>,
}

impl GroupKey {
    pub fn patient(patient_id: NonEmptyText) -> Self {
        Self {
            patient_id,
            department: None,
        }
    }

    pub fn department(patient_id: NonEmptyText, department: Department) -> Self {
        Self {
            patient_id,
            department: Some(department),
        }
    }

    pub fn patient_id(&self) -> &NonEmptyText {
        &self.patient_id
    }

    pub fn department_scope(&self) -> Option<Department> {
        self.department
    }

    /// Store query selecting every request in this grouping, whatever its status.
    pub(crate) fn scope_query(&self) -> Query {
        let query = field("patient_id").eq(self.patient_id.as_str());
        match self.department {
            Some(department) => query & field("assigned_to").eq(department.as_str()),
            None => query,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.department {
            Some(department) => write!(f, "{}/{}", self.patient_id, department),
            None => write!(f, "{}", self.patient_id),
        }
    }
}

/// Builds the request summarising `tasks` for `key`.
///
/// - While any task is open, only the open tasks form the request and it is `Open`.
/// - When every task is closed, all of them form a `Closed` request.
/// - Tasks are stable-sorted by `updated_date`; equal timestamps keep input order, so the
///   last task in input order wins ties for "newest".
/// - `assigned_to` and `pharmacy_id` come from the newest task; `created_date` is the
///   earliest creation among the members.
///
/// # Errors
///
/// Returns [`ClinicError::EmptyInput`] if `tasks` is empty.
pub fn build_request(key: &GroupKey, tasks: &[PatientTask]) -> ClinicResult<PatientRequest> {
    let open: Vec<&PatientTask> = tasks.iter().filter(|t| t.is_open()).collect();

    let (status, mut members) = if open.is_empty() {
        (Status::Closed, tasks.iter().collect::<Vec<_>>())
    } else {
        (Status::Open, open)
    };

    members.sort_by_key(|t| t.updated_date);

    let newest = members.last().ok_or(ClinicError::EmptyInput)?;
    let created_date = members
        .iter()
        .map(|t| t.created_date)
        .min()
        .ok_or(ClinicError::EmptyInput)?;

    Ok(PatientRequest {
        id: RequestId::new(),
        patient_id: key.patient_id.clone(),
        status,
        assigned_to: newest.assigned_to,
        created_date,
        updated_date: newest.updated_date,
        pharmacy_id: newest.pharmacy_id,
        task_ids: members.iter().map(|t| t.id.clone()).collect(),
    })
}
