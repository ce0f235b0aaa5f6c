//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the core services.
//! Nothing in the reconciliation path reads environment variables, so the same process can
//! run several independently configured clinics (for example in tests).

use crate::constants::DEFAULT_STORE_PATH;
use crate::{ClinicError, ClinicResult};
use clinic_store::{DocumentStore, JsonFileStore, MemoryStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// How tasks are grouped into patient requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupingPolicy {
    /// One open request per patient, all departments merged.
    #[default]
    PerPatient,
    /// One open request per patient and department.
    PerDepartment,
}

impl FromStr for GroupingPolicy {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "patient" | "per-patient" => Ok(Self::PerPatient),
            "department" | "per-department" => Ok(Self::PerDepartment),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown grouping policy '{other}' (expected 'patient' or 'department')"
            ))),
        }
    }
}

impl fmt::Display for GroupingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerPatient => "patient",
            Self::PerDepartment => "department",
        })
    }
}

/// How the medication projection of a request treats repeated medications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MedicationPolicy {
    /// Every task's medications in task order, duplicates kept.
    #[default]
    Concatenate,
    /// First occurrence of each medication code, order kept.
    DeduplicateByCode,
}

impl FromStr for MedicationPolicy {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concatenate" | "all" => Ok(Self::Concatenate),
            "dedupe" | "deduplicate" | "deduplicate-by-code" => Ok(Self::DeduplicateByCode),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown medication policy '{other}' (expected 'concatenate' or 'dedupe')"
            ))),
        }
    }
}

impl fmt::Display for MedicationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Concatenate => "concatenate",
            Self::DeduplicateByCode => "dedupe",
        })
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    store_path: Option<PathBuf>,
    grouping: GroupingPolicy,
    medications: MedicationPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `store_path` of `None` selects an in-memory store.
    pub fn new(
        store_path: Option<PathBuf>,
        grouping: GroupingPolicy,
        medications: MedicationPolicy,
    ) -> ClinicResult<Self> {
        if let Some(path) = &store_path {
            if path.as_os_str().is_empty() {
                return Err(ClinicError::InvalidInput(
                    "store path cannot be empty".into(),
                ));
            }
            if path.is_dir() {
                return Err(ClinicError::InvalidInput(format!(
                    "store path {} is a directory",
                    path.display()
                )));
            }
        }

        Ok(Self {
            store_path,
            grouping,
            medications,
        })
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    pub fn grouping(&self) -> GroupingPolicy {
        self.grouping
    }

    pub fn medications(&self) -> MedicationPolicy {
        self.medications
    }

    /// Opens the configured document store.
    pub fn open_store(&self) -> ClinicResult<Arc<dyn DocumentStore>> {
        match &self.store_path {
            Some(path) => {
                tracing::info!("using JSON document store at {}", path.display());
                Ok(Arc::new(JsonFileStore::open(path)?))
            }
            None => {
                tracing::info!("using in-memory document store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

/// Resolve the store path from an optional environment value.
///
/// Empty or whitespace values select the in-memory store; the literal `default` selects
/// [`DEFAULT_STORE_PATH`].
pub fn store_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())?;

    if value.eq_ignore_ascii_case("default") {
        Some(PathBuf::from(DEFAULT_STORE_PATH))
    } else {
        Some(PathBuf::from(value))
    }
}

/// Parse the grouping policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`GroupingPolicy::PerPatient`].
pub fn grouping_policy_from_env_value(value: Option<String>) -> ClinicResult<GroupingPolicy> {
    parse_or_default(value)
}

/// Parse the medication policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`MedicationPolicy::Concatenate`].
pub fn medication_policy_from_env_value(value: Option<String>) -> ClinicResult<MedicationPolicy> {
    parse_or_default(value)
}

fn parse_or_default<T>(value: Option<String>) -> ClinicResult<T>
where
    T: FromStr<Err = ClinicError> + Default,
{
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<T>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_grouping_policy_defaults_when_unset_or_blank() {
        assert_eq!(
            grouping_policy_from_env_value(None).unwrap(),
            GroupingPolicy::PerPatient
        );
        assert_eq!(
            grouping_policy_from_env_value(Some("  ".into())).unwrap(),
            GroupingPolicy::PerPatient
        );
    }

    #[test]
    fn test_grouping_policy_parses_aliases() {
        assert_eq!(
            grouping_policy_from_env_value(Some("Department".into())).unwrap(),
            GroupingPolicy::PerDepartment
        );
        assert_eq!(
            "per-patient".parse::<GroupingPolicy>().unwrap(),
            GroupingPolicy::PerPatient
        );
    }

    #[test]
    fn test_grouping_policy_rejects_unknown() {
        let err = grouping_policy_from_env_value(Some("ward".into())).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_medication_policy_parsing() {
        assert_eq!(
            medication_policy_from_env_value(None).unwrap(),
            MedicationPolicy::Concatenate
        );
        assert_eq!(
            medication_policy_from_env_value(Some("dedupe".into())).unwrap(),
            MedicationPolicy::DeduplicateByCode
        );
        assert!(medication_policy_from_env_value(Some("merge".into())).is_err());
    }

    #[test]
    fn test_store_path_from_env_value() {
        assert_eq!(store_path_from_env_value(None), None);
        assert_eq!(store_path_from_env_value(Some(" ".into())), None);
        assert_eq!(
            store_path_from_env_value(Some("default".into())),
            Some(PathBuf::from(DEFAULT_STORE_PATH))
        );
        assert_eq!(
            store_path_from_env_value(Some("/tmp/x.json".into())),
            Some(PathBuf::from("/tmp/x.json"))
        );
    }

    #[test]
    fn test_new_rejects_directory_store_path() {
        let temp_dir = TempDir::new().unwrap();
        let result = CoreConfig::new(
            Some(temp_dir.path().to_path_buf()),
            GroupingPolicy::PerPatient,
            MedicationPolicy::Concatenate,
        );
        assert!(matches!(result, Err(ClinicError::InvalidInput(_))));
    }

    #[test]
    fn test_open_store_uses_json_file_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        let cfg = CoreConfig::new(
            Some(path.clone()),
            GroupingPolicy::PerDepartment,
            MedicationPolicy::Concatenate,
        )
        .unwrap();

        let store = cfg.open_store().unwrap();
        store
            .insert("Tasks", serde_json::json!({"id": "task1"}))
            .unwrap();
        assert!(path.is_file());
        assert_eq!(cfg.grouping(), GroupingPolicy::PerDepartment);
    }
}
