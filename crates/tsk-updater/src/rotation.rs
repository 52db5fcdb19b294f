//! Moving a directory's contents into another directory.
//!
//! [`purge_dir`] and [`move_entries`] are shared with the transaction's
//! payload phase, recovery and cleanup.

use std::ffi::OsString;
use std::io;
use std::path::Path;

use crate::error::{Result, UpdateError};
use crate::fs_ops::FileSystem;

/// A move that stopped partway.
#[derive(Debug)]
pub struct MoveFailure {
    /// Entries that were moved before the failure, in order.
    pub moved: Vec<OsString>,
    /// Entry whose move failed, `None` if listing the source failed.
    pub entry: Option<OsString>,
    /// Underlying error.
    pub source: io::Error,
}

impl MoveFailure {
    /// Describes the failure for an error message.
    #[must_use]
    pub fn describe(&self, from: &Path, to: &Path) -> String {
        match &self.entry {
            Some(entry) => format!(
                "moving {} from {} to {} failed after {} entries: {}",
                entry.to_string_lossy(),
                from.display(),
                to.display(),
                self.moved.len(),
                self.source
            ),
            None => format!("listing {} failed: {}", from.display(), self.source),
        }
    }
}

/// Removes `dir` and everything in it. A missing `dir` is not an error.
///
/// Top-level entries ending in `executable_suffix` are removed one at a time
/// first and their failures ignored, so a locked executable does not stop the
/// rest of the tree from being inspected. An empty suffix skips that pass.
pub fn purge_dir(fs: &dyn FileSystem, dir: &Path, executable_suffix: &str) -> io::Result<()> {
    if !fs.exists(dir) {
        return Ok(());
    }

    if !executable_suffix.is_empty() {
        for name in fs.read_dir_names(dir)? {
            if !name.to_string_lossy().ends_with(executable_suffix) {
                continue;
            }
            let path = dir.join(&name);
            if fs.is_dir(&path) {
                continue;
            }
            if let Err(e) = fs.remove_file(&path) {
                tracing::warn!("Could not remove {}: {e}", path.display());
            }
        }
    }

    fs.remove_dir_all(dir)
}

/// Moves every entry of `from` into `to`. Both must exist.
///
/// On success returns the moved names in order.
pub fn move_entries(
    fs: &dyn FileSystem,
    from: &Path,
    to: &Path,
) -> std::result::Result<Vec<OsString>, MoveFailure> {
    let names = fs.read_dir_names(from).map_err(|source| MoveFailure {
        moved: Vec::new(),
        entry: None,
        source,
    })?;

    let mut moved = Vec::with_capacity(names.len());
    for name in names {
        tracing::debug!("Moving {} -> {}", from.join(&name).display(), to.display());
        if let Err(source) = fs.rename(&from.join(&name), &to.join(&name)) {
            return Err(MoveFailure {
                moved,
                entry: Some(name),
                source,
            });
        }
        moved.push(name);
    }
    Ok(moved)
}

/// Moves `names` from `to` back into `from`, undoing a partial [`move_entries`].
fn move_back(fs: &dyn FileSystem, names: &[OsString], from: &Path, to: &Path) -> io::Result<()> {
    for name in names.iter().rev() {
        fs.rename(&to.join(name), &from.join(name))?;
    }
    Ok(())
}

/// Moves the contents of `source` into a fresh `destination`.
///
/// An existing `destination` is purged first. If moving fails partway the
/// entries already moved are put back, so `source` keeps its original entries
/// and the rotation counts as not having happened ([`UpdateError::Rotation`]).
/// If putting them back fails too the installation is split across both
/// directories and [`UpdateError::Recovery`] is returned.
pub fn rotate(
    fs: &dyn FileSystem,
    source: &Path,
    destination: &Path,
    executable_suffix: &str,
) -> Result<()> {
    purge_dir(fs, destination, executable_suffix).map_err(|e| {
        UpdateError::Rotation(format!("failed to purge {}: {e}", destination.display()))
    })?;

    fs.create_dir(destination).map_err(|e| {
        UpdateError::Rotation(format!("failed to create {}: {e}", destination.display()))
    })?;

    match move_entries(fs, source, destination) {
        Ok(moved) => {
            tracing::info!(
                "Rotated {} entries from {} to {}",
                moved.len(),
                source.display(),
                destination.display()
            );
            Ok(())
        }
        Err(failure) => {
            let message = failure.describe(source, destination);
            if let Err(undo) = move_back(fs, &failure.moved, source, destination) {
                tracing::error!("Could not move entries back into {}: {undo}", source.display());
                return Err(UpdateError::Recovery(format!(
                    "{message}; moving entries back into {} failed: {undo}",
                    source.display()
                )));
            }
            if let Err(e) = fs.remove_dir_all(destination) {
                tracing::warn!("Could not remove {}: {e}", destination.display());
            }
            Err(UpdateError::Rotation(message))
        }
    }
}
