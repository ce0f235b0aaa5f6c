//! Typed repositories over the document store.
//!
//! Each repository owns one table and converts between domain records and store documents.
//! Reconciliation talks to these types only; the [`clinic_store::DocumentStore`] adapter
//! behind them is chosen at startup.

pub mod requests;
pub mod tasks;

pub use requests::{RequestFilter, RequestRepository};
pub use tasks::TaskRepository;

use crate::{ClinicError, ClinicResult};
use clinic_store::Document;
use serde::{de::DeserializeOwned, Serialize};

pub(crate) fn to_document<T: Serialize>(record: &T) -> ClinicResult<Document> {
    serde_json::to_value(record).map_err(ClinicError::Serialization)
}

pub(crate) fn from_document<T: DeserializeOwned>(document: Document) -> ClinicResult<T> {
    serde_json::from_value(document).map_err(ClinicError::Deserialization)
}

pub(crate) fn from_documents<T: DeserializeOwned>(
    documents: Vec<Document>,
) -> ClinicResult<Vec<T>> {
    documents.into_iter().map(from_document).collect()
}
