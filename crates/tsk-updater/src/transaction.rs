//! Staged-apply transaction.
//!
//! ```text
//! Idle -> RotatedToOutdated -> PayloadApplied -> BinariesSwapped -> Committed
//!              |                     |                  |
//!              +---------------------+------------------+--> Recovery -> RolledBack | Failed
//! ```
//!
//! Phase A moves `latest/` into `outdated/`. Past that point every failure runs
//! Recovery, which rebuilds `latest/` from `outdated/`. A failure in Phase A
//! leaves the installation as it was and needs no recovery.

use std::fmt;

use crate::error::{Result, UpdateError};
use crate::fs_ops::FileSystem;
use crate::layout::{InstallLayout, SelfBinary};
use crate::report::{Phase, PhaseReport};
use crate::rotation::{move_entries, purge_dir, rotate};
use crate::swap::{BinarySwap, SwapRecord};

/// Where a transaction is. Kept in memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Nothing changed yet.
    Idle,
    /// The previous payload sits in `outdated/`; failures now need recovery.
    RotatedToOutdated,
    /// The staged payload is in `latest/`.
    PayloadApplied,
    /// Both self-binaries were replaced.
    BinariesSwapped,
    /// Everything applied.
    Committed,
    /// A later phase failed and the previous payload was restored.
    RolledBack,
    /// Recovery failed, or Phase A failed and could not undo itself.
    Failed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of [`StagedApply::apply`].
#[derive(Debug)]
pub struct TransactionReport {
    /// Terminal state: `Committed`, `RolledBack`, `Failed`, or `Idle` when
    /// Phase A failed cleanly.
    pub state: TransactionState,
    /// Status lines of each phase that ran.
    pub phases: Vec<PhaseReport>,
    /// Error that ended the transaction early.
    pub error: Option<UpdateError>,
}

/// One application of the staged release onto an installation.
pub struct StagedApply<'a> {
    layout: &'a InstallLayout,
    fs: &'a dyn FileSystem,
    state: TransactionState,
    phases: Vec<PhaseReport>,
}

impl<'a> StagedApply<'a> {
    /// Creates an idle transaction.
    #[must_use]
    pub fn new(layout: &'a InstallLayout, fs: &'a dyn FileSystem) -> Self {
        Self {
            layout,
            fs,
            state: TransactionState::Idle,
            phases: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Runs phases A, B and C, recovering on failure after Phase A.
    pub fn apply(mut self) -> TransactionReport {
        if let Err(e) = self.rotate_phase() {
            self.phases.push(PhaseReport::failed(Phase::Rotate, e.to_string()));
            if matches!(e, UpdateError::Recovery(_)) {
                self.transition(TransactionState::Failed);
            }
            return self.finish(Some(e));
        }

        if let Err(e) = self.apply_payload_phase() {
            self.phases
                .push(PhaseReport::failed(Phase::ApplyPayload, e.to_string()));
            return self.recover(e);
        }

        if let Err(e) = self.swap_binaries_phase() {
            self.phases
                .push(PhaseReport::failed(Phase::SwapBinaries, e.to_string()));
            return self.recover(e);
        }

        self.transition(TransactionState::Committed);
        self.phases
            .push(PhaseReport::ok(Phase::Commit, "transaction committed"));
        self.finish(None)
    }

    fn transition(&mut self, next: TransactionState) {
        tracing::info!("Transaction {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish(self, error: Option<UpdateError>) -> TransactionReport {
        TransactionReport {
            state: self.state,
            phases: self.phases,
            error,
        }
    }

    /// Phase A.
    fn rotate_phase(&mut self) -> Result<()> {
        let latest = self.layout.latest();
        let message = if self.fs.is_dir(&latest) {
            rotate(
                self.fs,
                &latest,
                &self.layout.outdated(),
                self.layout.executable_suffix(),
            )?;
            "moved latest to outdated"
        } else {
            self.fs.create_dir(&latest).map_err(|e| {
                UpdateError::Rotation(format!("failed to create {}: {e}", latest.display()))
            })?;
            "no previous installation, created latest"
        };

        self.transition(TransactionState::RotatedToOutdated);
        self.phases.push(PhaseReport::ok(Phase::Rotate, message));
        Ok(())
    }

    /// Phase B. A package without an application subtree is malformed.
    fn apply_payload_phase(&mut self) -> Result<()> {
        let staged = self.layout.staged_app();
        if !self.fs.is_dir(&staged) {
            return Err(UpdateError::PayloadApply(format!(
                "package has no application files at {}",
                staged.display()
            )));
        }

        let latest = self.layout.latest();
        let moved = move_entries(self.fs, &staged, &latest)
            .map_err(|f| UpdateError::PayloadApply(f.describe(&staged, &latest)))?;

        self.transition(TransactionState::PayloadApplied);
        self.phases.push(PhaseReport::ok(
            Phase::ApplyPayload,
            format!("moved {} entries into latest", moved.len()),
        ));
        Ok(())
    }

    /// Phase C. Skipped without a state change unless both binaries are staged.
    fn swap_binaries_phase(&mut self) -> Result<()> {
        let swap = BinarySwap::new(self.layout, self.fs);
        if !swap.staged_binaries_present() {
            self.phases.push(PhaseReport::ok(
                Phase::SwapBinaries,
                "no staged binaries, skipped",
            ));
            return Ok(());
        }

        // Only what this phase backed up or installed is reverted on failure.
        let mut records = Vec::new();
        for binary in SelfBinary::ALL {
            let result = swap.back_up(binary).and_then(|backup| {
                records.push(SwapRecord { binary, backup });
                swap.move_in(binary)
            });
            if let Err(e) = result {
                let failures = swap.undo(&records);
                if !failures.is_empty() {
                    tracing::warn!(
                        "{} binaries could not be restored after a failed swap",
                        failures.len()
                    );
                }
                return Err(e);
            }
        }

        self.transition(TransactionState::BinariesSwapped);
        self.phases
            .push(PhaseReport::ok(Phase::SwapBinaries, "replaced updater and uninstaller"));
        Ok(())
    }

    /// Rebuilds `latest/` from `outdated/`.
    fn recover(mut self, cause: UpdateError) -> TransactionReport {
        tracing::warn!("Rolling back after: {cause}");
        match self.restore_previous() {
            Ok(()) => {
                self.transition(TransactionState::RolledBack);
                self.phases.push(PhaseReport::ok(
                    Phase::Recovery,
                    "restored previous installation from outdated",
                ));
                self.finish(Some(cause))
            }
            Err(step) => {
                let error = UpdateError::Recovery(format!(
                    "{cause}; then {step}; manual inspection of {} and {} is required",
                    self.layout.latest().display(),
                    self.layout.outdated().display()
                ));
                tracing::error!("{error}");
                self.transition(TransactionState::Failed);
                self.phases
                    .push(PhaseReport::failed(Phase::Recovery, error.to_string()));
                self.finish(Some(error))
            }
        }
    }

    fn restore_previous(&self) -> std::result::Result<(), String> {
        let latest = self.layout.latest();
        let outdated = self.layout.outdated();

        purge_dir(self.fs, &latest, self.layout.executable_suffix())
            .map_err(|e| format!("removing {} failed: {e}", latest.display()))?;
        self.fs
            .create_dir(&latest)
            .map_err(|e| format!("recreating {} failed: {e}", latest.display()))?;

        if self.fs.is_dir(&outdated) {
            move_entries(self.fs, &outdated, &latest).map_err(|f| f.describe(&outdated, &latest))?;
            self.fs
                .remove_dir_all(&outdated)
                .map_err(|e| format!("removing {} failed: {e}", outdated.display()))?;
        }
        Ok(())
    }
}
