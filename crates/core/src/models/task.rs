//! Task records as delivered in batches and stored in the `Tasks` table.

use chrono::{DateTime, Utc};
use clinic_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ClinicError, ClinicResult};

/// Lifecycle status shared by tasks and patient requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Open,
    Closed,
}

impl Status {
    /// Returns the stored string form (`"Open"` / `"Closed"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }

    /// Parses a status, case-insensitively.
    pub fn parse(s: &str) -> ClinicResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ClinicError::InvalidInput(format!("invalid status: {s}"))),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department a task is assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Department {
    Primary,
    Dermatology,
    Radiology,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Dermatology => "Dermatology",
            Self::Radiology => "Radiology",
        }
    }

    /// Parses a department name, case-insensitively.
    pub fn parse(s: &str) -> ClinicResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "dermatology" => Ok(Self::Dermatology),
            "radiology" => Ok(Self::Radiology),
            _ => Err(ClinicError::InvalidInput(format!("invalid department: {s}"))),
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A medication referenced by a task. Compared by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Medication {
    pub code: NonEmptyText,
    pub name: String,
}

/// A single clinical task revision.
///
/// Tasks are replaced wholesale when a newer revision with the same id arrives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientTask {
    pub id: NonEmptyText,
    pub patient_id: NonEmptyText,
    pub status: Status,
    pub assigned_to: Department,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub pharmacy_id: Option<i64>,
}

impl PatientTask {
    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_and_department_parse() {
        assert_eq!(Status::parse("OPEN").unwrap(), Status::Open);
        assert_eq!(Status::parse("closed").unwrap(), Status::Closed);
        assert!(Status::parse("pending").is_err());

        assert_eq!(
            Department::parse("dermatology").unwrap(),
            Department::Dermatology
        );
        assert!(Department::parse("Cardiology").is_err());
    }

    #[test]
    fn test_task_serializes_with_stored_names() {
        let task = PatientTask {
            id: NonEmptyText::new("task1").unwrap(),
            patient_id: NonEmptyText::new("patient1").unwrap(),
            status: Status::Open,
            assigned_to: Department::Primary,
            created_date: Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap(),
            updated_date: Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap(),
            message: "Test message 1".into(),
            medications: vec![],
            pharmacy_id: Some(123),
        };

        let doc = serde_json::to_value(&task).unwrap();
        assert_eq!(doc["status"], "Open");
        assert_eq!(doc["assigned_to"], "Primary");
        assert_eq!(doc["id"], "task1");

        let back: PatientTask = serde_json::from_value(doc).unwrap();
        assert_eq!(back, task);
    }
}
