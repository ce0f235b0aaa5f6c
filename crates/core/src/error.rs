use crate::models::Department;

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cannot build a patient request from an empty task list")]
    EmptyInput,
    #[error(
        "task {task_id} is referenced by more than one other request: {ids}",
        ids = .request_ids.join(", ")
    )]
    MultipleOwners {
        task_id: String,
        request_ids: Vec<String>,
    },
    #[error(
        "patient {patient_id} has more than one open request{scope}: {ids}",
        scope = .department.map(|d| format!(" in {d}")).unwrap_or_default(),
        ids = .request_ids.join(", ")
    )]
    DuplicateOpenRequest {
        patient_id: String,
        department: Option<Department>,
        request_ids: Vec<String>,
    },
    #[error("patient request not found: {0}")]
    RequestNotFound(String),
    #[error("document store unavailable: {0}")]
    StoreUnavailable(#[from] clinic_store::StoreError),
    #[error("failed to read batch file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
