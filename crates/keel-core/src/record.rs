//! Persisted bookkeeping records: migration attempts and the installation marker.

use crate::version::SchemaVersion;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Outcome of a single migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Success,
    Failed,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Success => "success",
            MigrationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(MigrationStatus::Success),
            "failed" => Ok(MigrationStatus::Failed),
            other => Err(format!("unknown migration status '{other}'")),
        }
    }
}

/// Latest recorded attempt for one migration unit.
///
/// The log holds at most one record per filename; a retry overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
    /// Unit file name (unique key)
    pub filename: String,

    /// Target version of the run that made this attempt
    pub version_tag: String,

    /// When the attempt finished
    pub executed_at: DateTime<Utc>,

    /// Wall-clock duration of the attempt in milliseconds
    pub execution_time_ms: u64,

    pub status: MigrationStatus,

    /// Error reported by the database when `status` is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Checksum of the unit body at the time of the attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl MigrationRecord {
    /// Build a success record.
    pub fn success(
        filename: impl Into<String>,
        version_tag: &SchemaVersion,
        execution_time_ms: u64,
        checksum: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            version_tag: version_tag.to_string(),
            executed_at: Utc::now(),
            execution_time_ms,
            status: MigrationStatus::Success,
            error_message: None,
            checksum,
        }
    }

    /// Build a failure record.
    pub fn failed(
        filename: impl Into<String>,
        version_tag: &SchemaVersion,
        execution_time_ms: u64,
        error_message: impl Into<String>,
        checksum: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            version_tag: version_tag.to_string(),
            executed_at: Utc::now(),
            execution_time_ms,
            status: MigrationStatus::Failed,
            error_message: Some(error_message.into()),
            checksum,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == MigrationStatus::Success
    }
}

/// Kind of run currently holding the advisory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Installing,
    Updating,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Installing => "installing",
            RunKind::Updating => "updating",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "installing" => Ok(RunKind::Installing),
            "updating" => Ok(RunKind::Updating),
            other => Err(format!("unknown run kind '{other}'")),
        }
    }
}

/// Advisory lock held while a run is in progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveRun {
    pub kind: RunKind,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

/// Persisted installation flag plus the advisory run lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallationMarker {
    pub installed: bool,

    /// Version the last successful run brought the schema to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_run: Option<ActiveRun>,
}

impl InstallationMarker {
    /// Marker for a database that has never completed an install.
    pub fn not_installed() -> Self {
        Self {
            installed: false,
            version: None,
            installed_at: None,
            updated_at: None,
            active_run: None,
        }
    }

    /// Mark a fully successful run that brought the schema to `version`.
    ///
    /// `installed_at` is set once, on the first successful install.
    pub fn mark_completed(&mut self, version: &SchemaVersion) {
        let now = Utc::now();
        if !self.installed {
            self.installed = true;
            self.installed_at = Some(now);
        }
        self.version = Some(version.to_string());
        self.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [MigrationStatus::Success, MigrationStatus::Failed] {
            assert_eq!(status.as_str().parse::<MigrationStatus>().unwrap(), status);
        }
        assert!("abandoned".parse::<MigrationStatus>().is_err());
    }

    #[test]
    fn test_failed_record_keeps_message() {
        let v = SchemaVersion::parse("1.0.0").unwrap();
        let rec = MigrationRecord::failed("002_x.sql", &v, 12, "syntax error", None);
        assert!(!rec.is_success());
        assert_eq!(rec.error_message.as_deref(), Some("syntax error"));
        assert_eq!(rec.version_tag, "1.0.0");
    }

    #[test]
    fn test_mark_completed_sets_installed_at_once() {
        let mut marker = InstallationMarker::not_installed();
        marker.mark_completed(&SchemaVersion::parse("1.0.0").unwrap());
        let first_install = marker.installed_at;
        assert!(marker.installed);
        assert!(first_install.is_some());

        marker.mark_completed(&SchemaVersion::parse("1.1.0").unwrap());
        assert_eq!(marker.installed_at, first_install);
        assert_eq!(marker.version.as_deref(), Some("1.1.0"));
    }
}
