//! Semantic schema version.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Schema version stored under the `schema_version` key.
///
/// Ordering follows semantic-version precedence, so `1.10.0 > 1.9.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion(semver::Version);

impl SchemaVersion {
    /// Parse a version string such as `"1.3.0"`.
    pub fn parse(value: &str) -> CoreResult<Self> {
        semver::Version::parse(value.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidVersion {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Borrow the underlying semver value.
    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SchemaVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SchemaVersion> for String {
    fn from(value: SchemaVersion) -> Self {
        value.to_string()
    }
}
