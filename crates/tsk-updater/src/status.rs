//! Update status file for post-update feedback.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};
use crate::report::{RunOutcome, RunReport};

/// Outcome of the last locked run, written by the updater and read by the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// Whether the run ended without an update failure.
    pub success: bool,
    /// Final outcome.
    pub outcome: RunOutcome,
    /// Release tag the run targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Installed tag before the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Error message if the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateStatus {
    /// Builds the status for a finished run.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            success: report.outcome.is_success(),
            outcome: report.outcome,
            version: report.release_version.clone(),
            previous_version: report.installed_version.clone(),
            timestamp: Utc::now(),
            error: report.error.as_ref().map(ToString::to_string),
        }
    }

    /// Writes the status as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| UpdateError::Io(format!("failed to write {}: {e}", path.display())))?;
        tracing::debug!("Status written to {}", path.display());
        Ok(())
    }

    /// Reads the status, `None` if there is no status file.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| UpdateError::Io(format!("failed to read {}: {e}", path.display())))?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
