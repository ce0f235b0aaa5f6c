//! Constants used throughout the clinic core crate.
//!
//! Table names and environment variable names live here so that the store layout and the
//! startup configuration stay consistent between the library and the CLI.

/// Document store table holding task records.
pub const TASKS_TABLE: &str = "Tasks";

/// Document store table holding patient request records.
pub const REQUESTS_TABLE: &str = "PatientRequest";

/// Default location of the JSON document store when persistence is requested without a path.
pub const DEFAULT_STORE_PATH: &str = "clinic_data/db.json";

/// Environment variable naming the JSON document store file.
pub const STORE_PATH_ENV: &str = "CLINIC_STORE_PATH";

/// Environment variable selecting the grouping policy (`patient` or `department`).
pub const GROUPING_ENV: &str = "CLINIC_GROUPING";

/// Environment variable selecting the medication policy (`concatenate` or `dedupe`).
pub const MEDICATIONS_ENV: &str = "CLINIC_MEDICATIONS";
