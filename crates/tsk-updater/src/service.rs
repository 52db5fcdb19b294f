//! Update run orchestration.
//!
//! A run takes the instance lock, heals leftovers of an interrupted run,
//! compares the installed tag with the latest release, stages the package and
//! hands over to [`StagedApply`]. The version marker is only rewritten after
//! the transaction committed.

use crate::cleanup::{CleanupReport, cleanup_outdated, cleanup_staging, recover_leftovers};
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::fs_ops::{FileSystem, StdFileSystem};
use crate::github::GitHubClient;
use crate::guard::InstanceLock;
use crate::layout::InstallLayout;
use crate::marker::VersionMarker;
use crate::report::{Phase, PhaseReport, RunOutcome, RunReport};
use crate::status::UpdateStatus;
use crate::steps::check::{ReleaseLocator, UpdateCandidate, check_for_update};
use crate::steps::download::{Fetcher, HttpFetcher, format_bytes};
use crate::steps::extract::{ArchiveExtractor, Extractor};
use crate::steps::verify::{VerificationStatus, verify_download};
use crate::transaction::{StagedApply, TransactionState};

/// Runs updates against one installation.
pub struct UpdateService {
    layout: InstallLayout,
    asset_name: String,
    verify_digest: bool,
    locator: Box<dyn ReleaseLocator>,
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    fs: Box<dyn FileSystem>,
}

impl UpdateService {
    /// Creates a service talking to GitHub over HTTP.
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_collaborators(
            config,
            Box::new(GitHubClient::new(config)?),
            Box::new(HttpFetcher::new(config)?),
            Box::new(ArchiveExtractor),
        ))
    }

    /// Creates a service with the given release source, download and unpacking.
    #[must_use]
    pub fn with_collaborators(
        config: &UpdaterConfig,
        locator: Box<dyn ReleaseLocator>,
        fetcher: Box<dyn Fetcher>,
        extractor: Box<dyn Extractor>,
    ) -> Self {
        Self {
            layout: InstallLayout::new(config),
            asset_name: config.archive_name.clone(),
            verify_digest: config.verify_digest,
            locator,
            fetcher,
            extractor,
            fs: Box::new(StdFileSystem),
        }
    }

    /// Replaces the filesystem used for rotation, swaps and cleanup.
    #[must_use]
    pub fn with_file_system(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Turns digest verification on or off.
    #[must_use]
    pub fn with_digest_verification(mut self, enabled: bool) -> Self {
        self.verify_digest = enabled;
        self
    }

    /// Paths of the installation.
    #[must_use]
    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Installed version tag from the marker.
    pub fn installed_version(&self) -> Result<Option<String>> {
        VersionMarker::new(self.layout.version_file()).read()
    }

    /// Status of the last locked run.
    pub fn last_status(&self) -> Result<Option<UpdateStatus>> {
        UpdateStatus::read(&self.layout.status_file())
    }

    /// Performs one update run.
    ///
    /// Never fails: every problem ends up in the report's outcome and phase
    /// lines. When the lock is held elsewhere nothing under the root is
    /// touched, the status file included.
    pub fn run(&self) -> RunReport {
        let _lock = match InstanceLock::acquire(&self.layout.lock_file()) {
            Ok(lock) => lock,
            Err(e) => {
                let outcome = if matches!(e, UpdateError::LockContention { .. }) {
                    RunOutcome::AnotherInstanceRunning
                } else {
                    RunOutcome::UpdateAborted
                };
                tracing::warn!("{e}");
                let mut report = RunReport::new(outcome);
                report
                    .phases
                    .push(PhaseReport::failed(Phase::Prepare, e.to_string()));
                report.error = Some(e);
                return report;
            }
        };

        let mut report = self.run_locked();
        let status = UpdateStatus::from_report(&report);
        if let Err(e) = status.write(&self.layout.status_file()) {
            tracing::warn!("{e}");
            report.warnings.push(e.to_string());
        }
        tracing::info!("{}", report.outcome);
        report
    }

    /// Takes the lock and removes rollback and staging leftovers only.
    pub fn cleanup(&self) -> Result<CleanupReport> {
        let _lock = InstanceLock::acquire(&self.layout.lock_file())?;
        let mut report = recover_leftovers(&self.layout, self.fs.as_ref());
        report.merge(cleanup_staging(&self.layout, self.fs.as_ref()));
        Ok(report)
    }

    fn run_locked(&self) -> RunReport {
        let mut report = RunReport::new(RunOutcome::UpToDate);

        let healed = recover_leftovers(&self.layout, self.fs.as_ref());
        record_cleanup(&mut report, Phase::Prepare, &healed);

        let marker = VersionMarker::new(self.layout.version_file());
        let installed = match marker.read() {
            Ok(installed) => installed,
            Err(e) => return abort(report, Phase::Check, e),
        };
        report.installed_version.clone_from(&installed);

        let candidate = match check_for_update(
            self.locator.as_ref(),
            installed.as_deref(),
            &self.asset_name,
        ) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                report.release_version.clone_from(&installed);
                report.phases.push(PhaseReport::ok(
                    Phase::Check,
                    format!("already at {}", installed.as_deref().unwrap_or_default()),
                ));
                return report;
            }
            Err(e) => return abort(report, Phase::Check, e),
        };
        report.release_version = Some(candidate.version_tag.clone());
        report.phases.push(PhaseReport::ok(
            Phase::Check,
            format!(
                "update available: {} -> {}",
                installed.as_deref().unwrap_or("none"),
                candidate.version_tag
            ),
        ));

        if let Err(e) = self.stage(&candidate, &mut report.phases) {
            let staging = cleanup_staging(&self.layout, self.fs.as_ref());
            record_cleanup(&mut report, Phase::Cleanup, &staging);
            report.outcome = RunOutcome::UpdateAborted;
            report.error = Some(e);
            return report;
        }

        let transaction = StagedApply::new(&self.layout, self.fs.as_ref()).apply();
        report.phases.extend(transaction.phases);
        report.error = transaction.error;

        report.outcome = match transaction.state {
            TransactionState::Committed => {
                let outdated = cleanup_outdated(&self.layout, self.fs.as_ref());
                record_cleanup(&mut report, Phase::Cleanup, &outdated);
                let staging = cleanup_staging(&self.layout, self.fs.as_ref());
                record_cleanup(&mut report, Phase::Cleanup, &staging);
                self.write_marker(&marker, &candidate.version_tag, &mut report);
                RunOutcome::UpdatedSuccessfully
            }
            TransactionState::RolledBack => {
                let staging = cleanup_staging(&self.layout, self.fs.as_ref());
                record_cleanup(&mut report, Phase::Cleanup, &staging);
                RunOutcome::UpdateFailedRolledBack
            }
            TransactionState::Failed => {
                tracing::error!(
                    "Leaving {} in place for manual inspection",
                    self.layout.update().display()
                );
                RunOutcome::UpdateFailedUnrecoverable
            }
            // Phase A failed and undid itself.
            _ => {
                let staging = cleanup_staging(&self.layout, self.fs.as_ref());
                record_cleanup(&mut report, Phase::Cleanup, &staging);
                RunOutcome::UpdateAborted
            }
        };
        report
    }

    /// Downloads, verifies and unpacks the package into `update/`.
    fn stage(&self, candidate: &UpdateCandidate, phases: &mut Vec<PhaseReport>) -> Result<()> {
        let archive = self.layout.archive();

        let written = self
            .fetcher
            .fetch(&candidate.asset, &archive)
            .inspect_err(|e| phases.push(PhaseReport::failed(Phase::Fetch, e.to_string())))?;
        phases.push(PhaseReport::ok(
            Phase::Fetch,
            format!("downloaded {} ({})", candidate.asset.name, format_bytes(written)),
        ));

        let verification = verify_download(&archive, &candidate.asset, self.verify_digest)
            .inspect_err(|e| phases.push(PhaseReport::failed(Phase::Verify, e.to_string())))?;
        phases.push(PhaseReport::ok(
            Phase::Verify,
            match verification {
                VerificationStatus::Verified(hash) => format!("sha256 {hash}"),
                VerificationStatus::Unavailable => "no digest published, skipped".to_string(),
                VerificationStatus::Disabled => "verification disabled".to_string(),
            },
        ));

        let update = self.layout.update();
        self.extractor
            .extract(&archive, &update)
            .inspect_err(|e| phases.push(PhaseReport::failed(Phase::Extract, e.to_string())))?;
        phases.push(PhaseReport::ok(
            Phase::Extract,
            format!("unpacked into {}", update.display()),
        ));
        Ok(())
    }

    fn write_marker(&self, marker: &VersionMarker, tag: &str, report: &mut RunReport) {
        match marker.write(tag) {
            Ok(()) => report
                .phases
                .push(PhaseReport::ok(Phase::Marker, format!("installed version is now {tag}"))),
            Err(e) => {
                // The payload is in place; the next run re-applies the same release.
                tracing::warn!("{e}");
                report.warnings.push(e.to_string());
                report
                    .phases
                    .push(PhaseReport::failed(Phase::Marker, e.to_string()));
            }
        }
        tracing::debug!("Marker at {}", self.layout.version_file().display());
    }
}

fn abort(mut report: RunReport, phase: Phase, error: UpdateError) -> RunReport {
    tracing::warn!("{phase} failed: {error}");
    report
        .phases
        .push(PhaseReport::failed(phase, error.to_string()));
    report.outcome = RunOutcome::UpdateAborted;
    report.error = Some(error);
    report
}

fn record_cleanup(report: &mut RunReport, phase: Phase, cleanup: &CleanupReport) {
    if cleanup.is_noop() {
        return;
    }
    let line = if cleanup.is_clean() {
        PhaseReport::ok(phase, cleanup.summary())
    } else {
        PhaseReport::failed(phase, cleanup.summary())
    };
    report.phases.push(line);
    report
        .warnings
        .extend(cleanup.failures.iter().map(ToString::to_string));
}
