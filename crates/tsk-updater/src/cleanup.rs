//! Removal of rollback and staging leftovers.
//!
//! Both cleanups are best-effort and idempotent: they report what they could
//! not remove and never fail a run.

use std::path::{Path, PathBuf};

use crate::error::UpdateError;
use crate::fs_ops::FileSystem;
use crate::layout::{InstallLayout, SelfBinary};
use crate::rotation::{move_entries, purge_dir};
use crate::swap::BinarySwap;

/// What a cleanup pass did.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Paths that were removed.
    pub removed: Vec<PathBuf>,
    /// Paths that were put back instead of removed.
    pub restored: Vec<PathBuf>,
    /// Removals that failed.
    pub failures: Vec<UpdateError>,
}

impl CleanupReport {
    /// Returns whether nothing was found to do.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.restored.is_empty() && self.failures.is_empty()
    }

    /// Returns whether every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Appends everything `other` did.
    pub fn merge(&mut self, other: Self) {
        self.removed.extend(other.removed);
        self.restored.extend(other.restored);
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, message: String) {
        tracing::warn!("{message}");
        self.failures.push(UpdateError::Cleanup(message));
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_noop() {
            return "nothing to clean up".to_string();
        }
        let mut summary = format!("removed {} item(s)", self.removed.len());
        if !self.restored.is_empty() {
            summary.push_str(&format!(", restored {} item(s)", self.restored.len()));
        }
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failure(s)", self.failures.len()));
        }
        summary
    }
}

/// Removes a lingering `outdated/` and leftover `_outdated` binaries.
///
/// Run after a commit. A backup whose live copy is missing is kept, since it
/// is the only copy of that binary.
pub fn cleanup_outdated(layout: &InstallLayout, fs: &dyn FileSystem) -> CleanupReport {
    let mut report = CleanupReport::default();
    purge_outdated(layout, fs, &mut report);
    remove_backups(layout, fs, &mut report);
    report
}

/// Heals what an interrupted run left behind, then cleans up like
/// [`cleanup_outdated`].
///
/// Run at the start of every invocation and by the cleanup command. A run
/// that died right after rotation leaves `latest/` empty and `outdated/` full;
/// then `outdated/` is moved back into `latest/` instead of being deleted. The
/// same goes for a backup binary whose live copy is missing.
pub fn recover_leftovers(layout: &InstallLayout, fs: &dyn FileSystem) -> CleanupReport {
    let mut report = CleanupReport::default();
    let latest = layout.latest();
    let outdated = layout.outdated();

    if fs.has_entries(&outdated) && !fs.has_entries(&latest) {
        tracing::warn!(
            "{} is empty but {} is not, restoring the previous installation",
            latest.display(),
            outdated.display()
        );
        restore_outdated(fs, &outdated, &latest, &mut report);
    } else {
        purge_outdated(layout, fs, &mut report);
    }

    let swap = BinarySwap::new(layout, fs);
    for binary in SelfBinary::ALL {
        let backup = layout.backup_binary(binary);
        if fs.exists(&backup) && !fs.exists(&layout.live_binary(binary)) {
            match swap.restore(binary) {
                Ok(_) => report.restored.push(backup),
                Err(e) => report.fail(e.to_string()),
            }
        }
    }
    remove_backups(layout, fs, &mut report);

    report
}

fn purge_outdated(layout: &InstallLayout, fs: &dyn FileSystem, report: &mut CleanupReport) {
    let outdated = layout.outdated();
    if !fs.is_dir(&outdated) {
        return;
    }
    match purge_dir(fs, &outdated, layout.executable_suffix()) {
        Ok(()) => report.removed.push(outdated),
        Err(e) => report.fail(format!("failed to remove {}: {e}", outdated.display())),
    }
}

fn remove_backups(layout: &InstallLayout, fs: &dyn FileSystem, report: &mut CleanupReport) {
    for binary in SelfBinary::ALL {
        let backup = layout.backup_binary(binary);
        if !fs.exists(&backup) || !fs.exists(&layout.live_binary(binary)) {
            continue;
        }
        match fs.remove_file(&backup) {
            Ok(()) => report.removed.push(backup),
            Err(e) => report.fail(format!("failed to remove {}: {e}", backup.display())),
        }
    }
}

fn restore_outdated(
    fs: &dyn FileSystem,
    outdated: &Path,
    latest: &Path,
    report: &mut CleanupReport,
) {
    if let Err(e) = fs.create_dir(latest) {
        report.fail(format!("failed to create {}: {e}", latest.display()));
        return;
    }
    if let Err(failure) = move_entries(fs, outdated, latest) {
        report.fail(failure.describe(outdated, latest));
        return;
    }
    report.restored.push(latest.to_path_buf());
    match fs.remove_dir_all(outdated) {
        Ok(()) => report.removed.push(outdated.to_path_buf()),
        Err(e) => report.fail(format!("failed to remove {}: {e}", outdated.display())),
    }
}

/// Removes the `update/` staging tree and the downloaded archive.
pub fn cleanup_staging(layout: &InstallLayout, fs: &dyn FileSystem) -> CleanupReport {
    let mut report = CleanupReport::default();

    let update = layout.update();
    if fs.exists(&update) {
        match fs.remove_dir_all(&update) {
            Ok(()) => report.removed.push(update),
            Err(e) => report.fail(format!("failed to remove {}: {e}", update.display())),
        }
    }

    let archive = layout.archive();
    if fs.exists(&archive) {
        match fs.remove_file(&archive) {
            Ok(()) => report.removed.push(archive),
            Err(e) => report.fail(format!("failed to remove {}: {e}", archive.display())),
        }
    }

    report
}
