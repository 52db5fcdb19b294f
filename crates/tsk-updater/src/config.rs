//! Configuration for the updater.
//!
//! All paths the updater touches derive from one [`UpdaterConfig`] value; see
//! [`crate::layout::InstallLayout`] for the resolved layout.

use std::env::consts::EXE_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};

/// Default GitHub repository owner.
pub const DEFAULT_REPO_OWNER: &str = "HerrNamenlos123";

/// Default GitHub repository name.
pub const DEFAULT_REPO_NAME: &str = "TechnicalSketcher";

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Name of the release asset that carries the update package.
pub const DEFAULT_ARCHIVE_NAME: &str = "AutomaticUpdaterRelease.zip";

/// File name of the config file the CLI looks for in the install root.
pub const CONFIG_FILE_NAME: &str = "updater.json";

/// Updater settings.
///
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Install root holding `latest/`, `outdated/`, `update/` and the self-binaries.
    pub install_root: PathBuf,

    /// GitHub repository owner.
    pub repo_owner: String,

    /// GitHub repository name.
    pub repo_name: String,

    /// GitHub API base URL (overridable for tests and mirrors).
    pub api_base_url: String,

    /// Name of the release asset to download.
    pub archive_name: String,

    /// Name of the lock file in the install root.
    pub lock_file_name: String,

    /// Name of the application subtree inside `update/`.
    pub staged_app_dir: String,

    /// File name of the updater binary.
    pub updater_binary: String,

    /// File name of the uninstaller binary.
    pub uninstaller_binary: String,

    /// Suffix of executables that may be locked while running.
    ///
    /// Entries ending in this suffix are deleted one by one before a tree is
    /// removed. Empty disables that pass.
    pub executable_suffix: String,

    /// Verify the archive against the SHA256 digest GitHub publishes.
    pub verify_digest: bool,

    /// Connect and read timeout for HTTP requests, in seconds.
    pub http_timeout_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("."),
            repo_owner: DEFAULT_REPO_OWNER.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            lock_file_name: "lock".to_string(),
            staged_app_dir: "latest".to_string(),
            updater_binary: format!("updater{EXE_SUFFIX}"),
            uninstaller_binary: format!("uninstall{EXE_SUFFIX}"),
            executable_suffix: EXE_SUFFIX.to_string(),
            verify_digest: true,
            http_timeout_secs: 60,
        }
    }
}

impl UpdaterConfig {
    /// Creates a default configuration for the given install root.
    #[must_use]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: root.into(),
            ..Default::default()
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            UpdateError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            UpdateError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that names which become path components are usable.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("archive_name", &self.archive_name),
            ("lock_file_name", &self.lock_file_name),
            ("staged_app_dir", &self.staged_app_dir),
            ("updater_binary", &self.updater_binary),
            ("uninstaller_binary", &self.uninstaller_binary),
        ];
        for (field, value) in names {
            if value.is_empty() || value.contains(['/', '\\']) || value == ".." {
                return Err(UpdateError::Config(format!(
                    "{field} must be a plain file name, got {value:?}"
                )));
            }
        }
        if self.updater_binary == self.uninstaller_binary {
            return Err(UpdateError::Config(
                "updater_binary and uninstaller_binary must differ".to_string(),
            ));
        }
        if self.repo_owner.is_empty() || self.repo_name.is_empty() {
            return Err(UpdateError::Config(
                "repo_owner and repo_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the URL of the latest-release endpoint.
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url.trim_end_matches('/'),
            self.repo_owner,
            self.repo_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdaterConfig::default();
        assert_eq!(config.archive_name, "AutomaticUpdaterRelease.zip");
        assert_eq!(config.lock_file_name, "lock");
        assert_eq!(config.staged_app_dir, "latest");
        assert!(config.updater_binary.starts_with("updater"));
        assert!(config.verify_digest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: UpdaterConfig =
            serde_json::from_str(r#"{"repo_owner": "someone", "verify_digest": false}"#).unwrap();
        assert_eq!(config.repo_owner, "someone");
        assert_eq!(config.repo_name, DEFAULT_REPO_NAME);
        assert!(!config.verify_digest);
    }

    #[test]
    fn test_from_file_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"archive_name": "../evil.zip"}"#).unwrap();

        let result = UpdaterConfig::from_file(&path);
        assert!(matches!(result, Err(UpdateError::Config(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = UpdaterConfig::from_file(Path::new("/nonexistent/updater.json"));
        assert!(matches!(result, Err(UpdateError::Config(_))));
    }

    #[test]
    fn test_latest_release_url() {
        let config = UpdaterConfig {
            api_base_url: "http://127.0.0.1:1234/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.latest_release_url(),
            "http://127.0.0.1:1234/repos/HerrNamenlos123/TechnicalSketcher/releases/latest"
        );
    }
}
