//! Phase status lines and run outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UpdateError;

/// A step of an update run that reports its own status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Self-heal cleanup at the start of a run.
    Prepare,
    /// Looking up the latest release and comparing it with the marker.
    Check,
    /// Downloading the release package.
    Fetch,
    /// Checking the package digest.
    Verify,
    /// Unpacking the package into `update/`.
    Extract,
    /// Phase A: moving `latest/` into `outdated/`.
    Rotate,
    /// Phase B: moving the staged payload into `latest/`.
    ApplyPayload,
    /// Phase C: replacing the updater and uninstaller.
    SwapBinaries,
    /// Marking the transaction committed.
    Commit,
    /// Restoring `latest/` from `outdated/`.
    Recovery,
    /// Removing rollback and staging leftovers.
    Cleanup,
    /// Writing the version marker.
    Marker,
}

impl Phase {
    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Check => "check",
            Self::Fetch => "fetch",
            Self::Verify => "verify",
            Self::Extract => "extract",
            Self::Rotate => "rotate",
            Self::ApplyPayload => "apply payload",
            Self::SwapBinaries => "swap binaries",
            Self::Commit => "commit",
            Self::Recovery => "recovery",
            Self::Cleanup => "cleanup",
            Self::Marker => "version marker",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Status line of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase this line belongs to.
    pub phase: Phase,
    /// Whether the phase succeeded.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
}

impl PhaseReport {
    /// A successful phase.
    pub fn ok(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            success: true,
            message: message.into(),
        }
    }

    /// A failed phase.
    pub fn failed(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "FAILED" };
        write!(f, "[{status}] {}: {}", self.phase, self.message)
    }
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The installed version already matches the latest release.
    UpToDate,
    /// The new release is installed and the marker updated.
    UpdatedSuccessfully,
    /// Failed before anything in the installation changed.
    UpdateAborted,
    /// Failed after rotation; the previous installation was restored.
    UpdateFailedRolledBack,
    /// Failed and the previous installation could not be restored.
    UpdateFailedUnrecoverable,
    /// Another updater holds the instance lock; nothing was touched.
    AnotherInstanceRunning,
}

impl RunOutcome {
    /// Returns whether the run ended without an update failure.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::UpToDate | Self::UpdatedSuccessfully)
    }

    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::UpToDate | Self::UpdatedSuccessfully => 0,
            Self::UpdateAborted | Self::UpdateFailedRolledBack | Self::AnotherInstanceRunning => 1,
            Self::UpdateFailedUnrecoverable => 2,
        }
    }

    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UpToDate => "Application is up to date",
            Self::UpdatedSuccessfully => "Update installed successfully",
            Self::UpdateAborted => "Update aborted, installation unchanged",
            Self::UpdateFailedRolledBack => "Update failed, previous version restored",
            Self::UpdateFailedUnrecoverable => {
                "Update failed and could not be rolled back, manual inspection of \
                 'latest' and 'outdated' is required"
            }
            Self::AnotherInstanceRunning => {
                "Can't check for updates: another process is still running"
            }
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Everything a run did.
#[derive(Debug)]
pub struct RunReport {
    /// Final outcome.
    pub outcome: RunOutcome,
    /// Version marker content before the run.
    pub installed_version: Option<String>,
    /// Tag of the latest release, if it was looked up.
    pub release_version: Option<String>,
    /// Status lines in execution order.
    pub phases: Vec<PhaseReport>,
    /// Error that decided the outcome.
    pub error: Option<UpdateError>,
    /// Non-fatal problems (cleanup, marker, status file).
    pub warnings: Vec<String>,
}

impl RunReport {
    /// Empty report with the given outcome.
    #[must_use]
    pub fn new(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            installed_version: None,
            release_version: None,
            phases: Vec::new(),
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Returns the failed phase lines.
    pub fn failed_phases(&self) -> impl Iterator<Item = &PhaseReport> {
        self.phases.iter().filter(|p| !p.success)
    }
}
