//! Replacing the updater and uninstaller binaries.
//!
//! Either binary may be the running process, so neither is ever deleted in
//! place. The live copy is renamed to its `_outdated` backup first and the
//! staged copy is renamed into the freed name.

use std::path::PathBuf;

use crate::error::{Result, UpdateError};
use crate::fs_ops::FileSystem;
use crate::layout::{InstallLayout, SelfBinary};

/// What a swap of one binary did, or got as far as doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRecord {
    /// Binary that was replaced.
    pub binary: SelfBinary,
    /// Backup of the previous live copy, if there was one.
    pub backup: Option<PathBuf>,
}

/// Swaps self-binaries between the staging area and the install root.
pub struct BinarySwap<'a> {
    layout: &'a InstallLayout,
    fs: &'a dyn FileSystem,
}

impl<'a> BinarySwap<'a> {
    /// Creates a swapper for `layout`.
    #[must_use]
    pub fn new(layout: &'a InstallLayout, fs: &'a dyn FileSystem) -> Self {
        Self { layout, fs }
    }

    /// Returns whether the staging area carries both replacement binaries.
    #[must_use]
    pub fn staged_binaries_present(&self) -> bool {
        SelfBinary::ALL
            .iter()
            .all(|b| self.fs.exists(&self.layout.staged_binary(*b)))
    }

    /// Backs up the live copy of `binary` (if any) and moves the staged copy into place.
    pub fn swap(&self, binary: SelfBinary) -> Result<SwapRecord> {
        let backup = self.back_up(binary)?;
        self.move_in(binary)?;
        Ok(SwapRecord { binary, backup })
    }

    /// Renames the live copy of `binary` to its `_outdated` name.
    ///
    /// Returns the backup path, or `None` when there was no live copy. A stale
    /// backup from an earlier run is replaced.
    pub fn back_up(&self, binary: SelfBinary) -> Result<Option<PathBuf>> {
        let live = self.layout.live_binary(binary);
        let backup = self.layout.backup_binary(binary);
        let staged = self.layout.staged_binary(binary);

        if !self.fs.exists(&staged) {
            return Err(UpdateError::BinarySwap(format!(
                "staged {binary} {} is missing",
                staged.display()
            )));
        }
        if !self.fs.exists(&live) {
            return Ok(None);
        }

        if self.fs.exists(&backup) {
            self.fs.remove_file(&backup).map_err(|e| {
                UpdateError::BinarySwap(format!(
                    "failed to remove stale backup {}: {e}",
                    backup.display()
                ))
            })?;
        }
        self.fs.rename(&live, &backup).map_err(|e| {
            UpdateError::BinarySwap(format!(
                "failed to back up {binary} to {}: {e}",
                backup.display()
            ))
        })?;
        Ok(Some(backup))
    }

    /// Moves the staged copy of `binary` under its live name.
    pub fn move_in(&self, binary: SelfBinary) -> Result<()> {
        let live = self.layout.live_binary(binary);
        let staged = self.layout.staged_binary(binary);

        self.fs.rename(&staged, &live).map_err(|e| {
            UpdateError::BinarySwap(format!(
                "failed to move new {binary} into {}: {e}",
                live.display()
            ))
        })?;
        tracing::info!("Replaced {binary} at {}", live.display());
        Ok(())
    }

    /// Reverts the given swaps, last first.
    ///
    /// A recorded backup is put back. A binary that had no live copy before
    /// is removed again. Backups not in `records` are left alone. Best-effort:
    /// failures are logged and returned, never raised.
    pub fn undo(&self, records: &[SwapRecord]) -> Vec<UpdateError> {
        let mut failures = Vec::new();
        for record in records.iter().rev() {
            let binary = record.binary;
            let result = match record.backup {
                Some(_) => self.restore(binary).map(|_| ()),
                None => self.remove_installed(binary),
            };
            if let Err(e) = result {
                tracing::warn!("Could not restore {binary}: {e}");
                failures.push(e);
            }
        }
        failures
    }

    fn remove_installed(&self, binary: SelfBinary) -> Result<()> {
        let live = self.layout.live_binary(binary);
        if !self.fs.exists(&live) {
            return Ok(());
        }
        self.fs.remove_file(&live).map_err(|e| {
            UpdateError::BinarySwap(format!(
                "failed to remove new {binary} {}: {e}",
                live.display()
            ))
        })
    }

    /// Puts the backup of `binary` back under its live name, if a backup exists.
    pub fn restore(&self, binary: SelfBinary) -> Result<bool> {
        let live = self.layout.live_binary(binary);
        let backup = self.layout.backup_binary(binary);

        if !self.fs.exists(&backup) {
            return Ok(false);
        }
        if self.fs.exists(&live) {
            self.fs.remove_file(&live).map_err(|e| {
                UpdateError::BinarySwap(format!(
                    "failed to remove new {binary} {}: {e}",
                    live.display()
                ))
            })?;
        }
        self.fs.rename(&backup, &live).map_err(|e| {
            UpdateError::BinarySwap(format!(
                "failed to restore {binary} from {}: {e}",
                backup.display()
            ))
        })?;

        tracing::info!("Restored {binary} from backup");
        Ok(true)
    }
}
