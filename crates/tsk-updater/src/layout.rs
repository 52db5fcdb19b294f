//! On-disk layout of an installation.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::UpdaterConfig;

/// Directory holding the active payload.
pub const LATEST_DIR: &str = "latest";

/// Directory holding the rollback copy of the previous payload.
pub const OUTDATED_DIR: &str = "outdated";

/// Staging directory the release package is unpacked into.
pub const UPDATE_DIR: &str = "update";

/// Installed version marker.
pub const VERSION_FILE: &str = "version";

/// Outcome of the last locked run.
pub const STATUS_FILE: &str = "update_status.json";

/// Suffix inserted into a self-binary's name for its backup copy.
pub const BACKUP_SUFFIX: &str = "_outdated";

/// The two executables that live at the install root and may be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelfBinary {
    /// The updater itself.
    Updater,
    /// The uninstaller.
    Uninstaller,
}

impl SelfBinary {
    /// Both binaries, in swap order.
    pub const ALL: [Self; 2] = [Self::Updater, Self::Uninstaller];

    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Updater => "updater",
            Self::Uninstaller => "uninstaller",
        }
    }
}

impl fmt::Display for SelfBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Resolved paths of one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    staged_app_dir: String,
    archive_name: String,
    lock_file_name: String,
    updater_binary: String,
    uninstaller_binary: String,
    executable_suffix: String,
}

impl InstallLayout {
    /// Builds the layout described by `config`.
    #[must_use]
    pub fn new(config: &UpdaterConfig) -> Self {
        Self {
            root: config.install_root.clone(),
            staged_app_dir: config.staged_app_dir.clone(),
            archive_name: config.archive_name.clone(),
            lock_file_name: config.lock_file_name.clone(),
            updater_binary: config.updater_binary.clone(),
            uninstaller_binary: config.uninstaller_binary.clone(),
            executable_suffix: config.executable_suffix.clone(),
        }
    }

    /// Install root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `latest/`
    #[must_use]
    pub fn latest(&self) -> PathBuf {
        self.root.join(LATEST_DIR)
    }

    /// `outdated/`
    #[must_use]
    pub fn outdated(&self) -> PathBuf {
        self.root.join(OUTDATED_DIR)
    }

    /// `update/`
    #[must_use]
    pub fn update(&self) -> PathBuf {
        self.root.join(UPDATE_DIR)
    }

    /// Application subtree of the staging area, moved into `latest/` by Phase B.
    #[must_use]
    pub fn staged_app(&self) -> PathBuf {
        self.update().join(&self.staged_app_dir)
    }

    /// Version marker file.
    #[must_use]
    pub fn version_file(&self) -> PathBuf {
        self.root.join(VERSION_FILE)
    }

    /// Lock file held by the instance guard.
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(&self.lock_file_name)
    }

    /// Downloaded release package.
    #[must_use]
    pub fn archive(&self) -> PathBuf {
        self.root.join(&self.archive_name)
    }

    /// Status file of the last run.
    #[must_use]
    pub fn status_file(&self) -> PathBuf {
        self.root.join(STATUS_FILE)
    }

    /// Suffix of executables that may be locked while running.
    #[must_use]
    pub fn executable_suffix(&self) -> &str {
        &self.executable_suffix
    }

    /// File name of a self-binary.
    #[must_use]
    pub fn binary_name(&self, binary: SelfBinary) -> &str {
        match binary {
            SelfBinary::Updater => &self.updater_binary,
            SelfBinary::Uninstaller => &self.uninstaller_binary,
        }
    }

    /// Live copy of a self-binary at the root.
    #[must_use]
    pub fn live_binary(&self, binary: SelfBinary) -> PathBuf {
        self.root.join(self.binary_name(binary))
    }

    /// Backup copy of a self-binary at the root.
    #[must_use]
    pub fn backup_binary(&self, binary: SelfBinary) -> PathBuf {
        self.root.join(backup_name(self.binary_name(binary)))
    }

    /// Replacement copy of a self-binary inside the staging area.
    #[must_use]
    pub fn staged_binary(&self, binary: SelfBinary) -> PathBuf {
        self.update().join(self.binary_name(binary))
    }
}

/// Returns the backup name for a binary: `updater.exe` becomes `updater_outdated.exe`.
#[must_use]
pub fn backup_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}{BACKUP_SUFFIX}.{ext}"),
        _ => format!("{name}{BACKUP_SUFFIX}"),
    }
}
