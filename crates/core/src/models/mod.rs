//! Domain records.

mod request;
mod task;

pub use request::{PatientRequest, RequestView};
pub use task::{Department, Medication, PatientTask, Status};
