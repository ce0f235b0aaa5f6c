//! Patient request identifiers.
//!
//! Request ids use a *canonical* UUID representation: **32 lowercase hexadecimal characters**
//! (no hyphens), the same value you would get from `Uuid::new_v4().simple().to_string()`.
//!
//! Canonical form is required for externally supplied identifiers (for example from the
//! CLI). Use [`RequestId::parse`] to validate an input string; uppercase, hyphenated or
//! wrong-length values are rejected rather than normalised.

use crate::{ClinicError, ClinicResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Identifier of a patient request, always in canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(Uuid);

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestId {
    /// Generates a fresh random identifier (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> ClinicResult<Self> {
        if !Self::is_canonical(input) {
            return Err(ClinicError::InvalidInput(format!(
                "request id must be 32 lowercase hex characters without hyphens, got: '{input}'"
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| ClinicError::InvalidInput(format!("invalid request id: {e}")))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RequestId {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestId::parse(s)
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RequestId::parse(&s).map_err(serde::de::Error::custom)
    }
}
