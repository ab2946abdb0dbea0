//! Installation state derived from persisted bookkeeping.
//!
//! The engine never stores an [`InstallState`] directly. It is recomputed on
//! every invocation from the installation marker, the stored schema version
//! and the current plan, so the persisted data is the single source of truth.

use crate::record::{InstallationMarker, RunKind};
use crate::version::SchemaVersion;
use serde::Serialize;
use std::fmt;

/// Lifecycle state of a deployed database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    /// No completed install
    NotInstalled,
    /// Install requested and validated, lock not yet taken
    FreshInstallPending,
    /// Install run holds the lock
    Installing,
    /// Installed and nothing left to apply
    InstalledUpToDate,
    /// Installed, but the catalog targets a newer version or has pending units
    UpdateAvailable,
    /// Update run holds the lock
    Updating,
}

impl InstallState {
    /// Compute the state from persisted data.
    ///
    /// `pending` is the number of units the planner would run right now.
    pub fn evaluate(
        marker: Option<&InstallationMarker>,
        stored: Option<&SchemaVersion>,
        target: &SchemaVersion,
        pending: usize,
    ) -> Self {
        let Some(marker) = marker else {
            return InstallState::NotInstalled;
        };

        if let Some(run) = &marker.active_run {
            return match run.kind {
                RunKind::Installing => InstallState::Installing,
                RunKind::Updating => InstallState::Updating,
            };
        }

        if !marker.installed {
            return InstallState::NotInstalled;
        }

        let behind = stored.map_or(true, |v| v < target);
        if behind || pending > 0 {
            InstallState::UpdateAvailable
        } else {
            InstallState::InstalledUpToDate
        }
    }

    /// A run is in progress and holds the advisory lock.
    pub fn is_running(self) -> bool {
        matches!(self, InstallState::Installing | InstallState::Updating)
    }

    /// Whether `operation` may start from this state.
    pub fn allows(self, operation: Operation) -> bool {
        match operation {
            Operation::Install => self == InstallState::NotInstalled,
            Operation::Update => matches!(
                self,
                InstallState::UpdateAvailable | InstallState::InstalledUpToDate
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstallState::NotInstalled => "not_installed",
            InstallState::FreshInstallPending => "fresh_install_pending",
            InstallState::Installing => "installing",
            InstallState::InstalledUpToDate => "installed_up_to_date",
            InstallState::UpdateAvailable => "update_available",
            InstallState::Updating => "updating",
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Install,
    Update,
}

impl Operation {
    /// Lock kind taken while this operation runs.
    pub fn run_kind(self) -> RunKind {
        match self {
            Operation::Install => RunKind::Installing,
            Operation::Update => RunKind::Updating,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => f.write_str("install"),
            Operation::Update => f.write_str("update"),
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
