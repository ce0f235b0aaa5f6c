//! Patient request table access.

use super::{from_document, from_documents, to_document};
use crate::builder::GroupKey;
use crate::constants::REQUESTS_TABLE;
use crate::ids::RequestId;
use crate::models::{Department, PatientRequest, Status};
use crate::{ClinicError, ClinicResult};
use clinic_store::{field, DocumentStore, Query, WriteOutcome};
use clinic_types::NonEmptyText;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Optional criteria for listing requests. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub patient_id: Option<String>,
    pub department: Option<Department>,
    pub status: Option<Status>,
    pub task_id: Option<String>,
}

impl RequestFilter {
    fn to_query(&self) -> Query {
        let mut query = Query::All;
        if let Some(patient_id) = &self.patient_id {
            query = query & field("patient_id").eq(patient_id.as_str());
        }
        if let Some(department) = self.department {
            query = query & field("assigned_to").eq(department.as_str());
        }
        if let Some(status) = self.status {
            query = query & field("status").eq(status.as_str());
        }
        if let Some(task_id) = &self.task_id {
            query = query & field("task_ids").contains(task_id.as_str());
        }
        query
    }
}

/// Reads and writes [`PatientRequest`] records, keyed by request id.
#[derive(Clone)]
pub struct RequestRepository {
    store: Arc<dyn DocumentStore>,
}

fn by_id(id: &RequestId) -> Query {
    field("id").eq(id.to_string())
}

impl RequestRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &RequestId) -> ClinicResult<Option<PatientRequest>> {
        self.store
            .get(REQUESTS_TABLE, &by_id(id))?
            .map(from_document)
            .transpose()
    }

    /// The single open request for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::DuplicateOpenRequest`] when the store holds more than one open
    /// request for the grouping; the lookup never picks one arbitrarily.
    pub fn find_open(&self, key: &GroupKey) -> ClinicResult<Option<PatientRequest>> {
        let query = key.scope_query() & field("status").eq(Status::Open.as_str());
        let mut open: Vec<PatientRequest> =
            from_documents(self.store.search(REQUESTS_TABLE, &query)?)?;

        match open.len() {
            0 => Ok(None),
            1 => Ok(open.pop()),
            _ => Err(ClinicError::DuplicateOpenRequest {
                patient_id: key.patient_id().to_string(),
                department: key.department_scope(),
                request_ids: open.iter().map(|r| r.id.to_string()).collect(),
            }),
        }
    }

    /// The most recently updated request in `key`'s scope that owns any of `task_ids`.
    pub fn find_in_scope_owning_any(
        &self,
        key: &GroupKey,
        task_ids: &BTreeSet<NonEmptyText>,
    ) -> ClinicResult<Option<PatientRequest>> {
        if task_ids.is_empty() {
            return Ok(None);
        }
        let owns_any = Query::Or(
            task_ids
                .iter()
                .map(|id| field("task_ids").contains(id.as_str()))
                .collect(),
        );
        let candidates: Vec<PatientRequest> =
            from_documents(self.store.search(REQUESTS_TABLE, &(key.scope_query() & owns_any))?)?;

        Ok(candidates.into_iter().max_by_key(|r| r.updated_date))
    }

    /// Requests other than `excluding` whose membership includes `task_id`.
    pub fn find_other_owners(
        &self,
        task_id: &str,
        excluding: &RequestId,
    ) -> ClinicResult<Vec<PatientRequest>> {
        let query = field("task_ids").contains(task_id) & !by_id(excluding);
        from_documents(self.store.search(REQUESTS_TABLE, &query)?)
    }

    pub fn insert(&self, request: &PatientRequest) -> ClinicResult<()> {
        self.store.insert(REQUESTS_TABLE, to_document(request)?)?;
        Ok(())
    }

    /// Replaces the stored request with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::RequestNotFound`] if no request has that id.
    pub fn update(&self, request: &PatientRequest) -> ClinicResult<()> {
        let replaced =
            self.store
                .update(REQUESTS_TABLE, to_document(request)?, &by_id(&request.id))?;
        if replaced == 0 {
            return Err(ClinicError::RequestNotFound(request.id.to_string()));
        }
        Ok(())
    }

    pub fn upsert(&self, request: &PatientRequest) -> ClinicResult<WriteOutcome> {
        Ok(self
            .store
            .upsert(REQUESTS_TABLE, to_document(request)?, &by_id(&request.id))?)
    }

    /// Lists requests matching `filter`, in store order.
    pub fn search(&self, filter: &RequestFilter) -> ClinicResult<Vec<PatientRequest>> {
        from_documents(self.store.search(REQUESTS_TABLE, &filter.to_query())?)
    }
}
