//! Single-instance guard.
//!
//! The guard is an OS advisory exclusive lock on a file in the install root.
//! The OS drops it when the process exits, including on a crash, so there is
//! no stale-lock cleanup. Acquisition never waits.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use crate::error::{Result, UpdateError};

/// Held instance lock. Released on drop.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Tries to take the exclusive lock on `path`, creating the file if needed.
    ///
    /// Returns [`UpdateError::LockContention`] when another process holds it.
    /// On that error the caller must not touch the installation.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| UpdateError::Lock(format!("failed to open {}: {e}", path.display())))?;

        match file.try_lock() {
            Ok(()) => {
                tracing::debug!("Acquired instance lock {}", path.display());
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(TryLockError::WouldBlock) => Err(UpdateError::LockContention {
                lock_path: path.to_path_buf(),
            }),
            Err(TryLockError::Error(e)) => Err(UpdateError::Lock(format!(
                "failed to lock {}: {e}",
                path.display()
            ))),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release instance lock {}: {e}", self.path.display());
        }
    }
}
