//! Task batch wire model and parsing.
//!
//! A batch file is a JSON object `{ "tasks": [ ... ] }` holding every task modified since
//! the previous batch. Parsing is strict:
//! - unknown keys are rejected (`#[serde(deny_unknown_fields)]`),
//! - identifiers and medication codes must be non-empty,
//! - timestamps are RFC 3339, or naive ISO 8601 which is read as UTC.
//!
//! Schema mismatches are reported with the failing path (for example `tasks[2].status`).

use crate::models::{Department, Medication, PatientTask, Status};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use clinic_types::NonEmptyText;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// An ordered batch of modified tasks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskBatch {
    pub tasks: Vec<PatientTask>,
}

impl TaskBatch {
    pub fn new(tasks: Vec<PatientTask>) -> Self {
        Self { tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Parse a batch from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] if the JSON does not match the batch schema or a
    /// field fails validation.
    pub fn parse(json_text: &str) -> ClinicResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let wire = match serde_path_to_error::deserialize::<_, TaskBatchWire>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(ClinicError::InvalidInput(format!(
                    "task batch schema mismatch at {path}: {source}"
                )));
            }
        };

        let tasks = wire
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| task_wire_to_domain(index, task))
            .collect::<ClinicResult<Vec<_>>>()?;

        Ok(Self { tasks })
    }

    /// Read and parse a batch file.
    pub fn from_path(path: &Path) -> ClinicResult<Self> {
        let contents = fs::read_to_string(path).map_err(ClinicError::FileRead)?;
        Self::parse(&contents).map_err(|err| match err {
            ClinicError::InvalidInput(msg) => {
                ClinicError::InvalidInput(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }
}

/// Parse a timestamp as RFC 3339, falling back to a naive ISO 8601 value in UTC.
pub fn parse_timestamp(value: &str) -> ClinicResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| ClinicError::InvalidInput(format!("invalid timestamp: '{value}'")))
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskBatchWire {
    #[serde(default)]
    tasks: Vec<TaskWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskWire {
    id: String,
    patient_id: String,
    status: Status,
    assigned_to: Department,
    created_date: String,
    updated_date: String,
    message: String,
    #[serde(default)]
    medications: Vec<MedicationWire>,
    #[serde(default)]
    pharmacy_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MedicationWire {
    code: String,
    name: String,
}

fn task_wire_to_domain(index: usize, wire: TaskWire) -> ClinicResult<PatientTask> {
    let field_error = |field: &str, detail: String| {
        ClinicError::InvalidInput(format!("tasks[{index}].{field}: {detail}"))
    };

    let id = NonEmptyText::new(&wire.id).map_err(|e| field_error("id", e.to_string()))?;
    let patient_id = NonEmptyText::new(&wire.patient_id)
        .map_err(|e| field_error("patient_id", e.to_string()))?;
    let created_date = parse_timestamp(&wire.created_date)
        .map_err(|e| field_error("created_date", e.to_string()))?;
    let updated_date = parse_timestamp(&wire.updated_date)
        .map_err(|e| field_error("updated_date", e.to_string()))?;

    let medications = wire
        .medications
        .into_iter()
        .enumerate()
        .map(|(i, m)| -> ClinicResult<Medication> {
            let code = NonEmptyText::new(&m.code)
                .map_err(|e| field_error(&format!("medications[{i}].code"), e.to_string()))?;
            Ok(Medication { code, name: m.name })
        })
        .collect::<ClinicResult<Vec<_>>>()?;

    Ok(PatientTask {
        id,
        patient_id,
        status: wire.status,
        assigned_to: wire.assigned_to,
        created_date,
        updated_date,
        message: wire.message,
        medications,
        pharmacy_id: wire.pharmacy_id,
    })
}
