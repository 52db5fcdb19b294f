//! Error types for the self-update system.
//!
//! Every phase of a run converts the fault it hit into one of these kinds.
//! Only [`UpdateError::Recovery`] is fatal: it means the previous installation
//! could not be put back and someone has to look at `latest/` and `outdated/`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during an update run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpdateError {
    /// Another updater process holds the instance lock.
    #[error("another updater instance is running (lock held on {})", lock_path.display())]
    LockContention {
        /// Path of the lock file that is held.
        lock_path: PathBuf,
    },

    /// The lock file could not be opened or locked for a reason other than contention.
    #[error("failed to acquire instance lock: {0}")]
    Lock(String),

    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// GitHub API rate limit exceeded.
    #[error("GitHub API rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds until rate limit resets.
        retry_after: u64,
    },

    /// The release does not carry the expected package asset.
    #[error("no release asset named {0}")]
    NoAssetFound(String),

    /// SHA256 checksum verification failed.
    #[error("checksum verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Expected SHA256 hash from the release metadata.
        expected: String,
        /// Actual SHA256 hash of the downloaded archive.
        actual: String,
    },

    /// Failed to parse JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Downloading the release package failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Unpacking the release package into the staging area failed.
    #[error("extraction failed: {0}")]
    Extract(String),

    /// Moving the active payload into the rollback area failed.
    #[error("rotation failed: {0}")]
    Rotation(String),

    /// Moving the staged payload into the active area failed.
    #[error("applying payload failed: {0}")]
    PayloadApply(String),

    /// Replacing the updater or uninstaller binary failed.
    #[error("binary swap failed: {0}")]
    BinarySwap(String),

    /// Restoring the previous installation failed.
    #[error("recovery failed: {0}")]
    Recovery(String),

    /// Removing leftover rollback or staging artifacts failed.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error outside of a transaction phase.
    #[error("I/O error: {0}")]
    Io(String),
}

impl UpdateError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::LockContention { .. } => {
                "Can't check for updates: another updater process is still running."
            }
            Self::Network(_) | Self::Fetch(_) => {
                "Could not download the update. Please check your internet connection."
            }
            Self::RateLimited { .. } => "GitHub API rate limit reached. Please try again later.",
            Self::NoAssetFound(_) => "The latest release does not contain an update package.",
            Self::ChecksumMismatch { .. } => {
                "Security verification failed. The download may have been tampered with."
            }
            Self::Extract(_) => "Could not extract the update package.",
            Self::Rotation(_) | Self::PayloadApply(_) | Self::BinarySwap(_) => {
                "Could not install the update. The previous version was kept."
            }
            Self::Recovery(_) => {
                "The update failed and the previous version could not be restored. \
                 Inspect the 'latest' and 'outdated' folders manually."
            }
            Self::Cleanup(_) => "Some temporary update files could not be removed.",
            Self::Config(_) => "The updater configuration is invalid.",
            Self::Lock(_) | Self::JsonParse(_) | Self::Io(_) => "An unexpected error occurred.",
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimited { .. }
                | Self::Fetch(_)
                | Self::LockContention { .. }
                | Self::Io(_)
        )
    }

    /// Returns whether the installation may be left in an inconsistent state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Recovery(_))
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<std::io::Error> for UpdateError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for UpdateError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

impl From<zip::result::ZipError> for UpdateError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Extract(err.to_string())
    }
}

/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, UpdateError>;
