//! Self-updater for TechnicalSketcher installations.
//!
//! This crate replaces an installed application tree with a newer release from
//! GitHub and restores the previous tree if anything goes wrong on the way.
//!
//! # Overview
//!
//! An installation root holds:
//!
//! - `latest/` - the active application files
//! - `outdated/` - the previous files while an update is in progress
//! - `update/` - the unpacked release package
//! - the updater and uninstaller binaries, plus their `_outdated` backups
//! - `version` - the installed release tag
//! - `lock` - the single-instance lock
//!
//! # Architecture
//!
//! [`UpdateService::run`] drives one update:
//!
//! 1. take the [`InstanceLock`], or report another running instance
//! 2. heal leftovers of an interrupted run ([`recover_leftovers`])
//! 3. compare the [`VersionMarker`] with the latest release
//! 4. download, verify and unpack the package into `update/`
//! 5. apply it with [`StagedApply`]: rotate, move the payload, swap binaries
//! 6. on failure after rotation, restore `latest/` from `outdated/`
//! 7. clean up and write the new tag to the marker
//!
//! Release lookup, download, unpacking and filesystem access all sit behind
//! traits so each step can be replaced in tests.
//!
//! # Example
//!
//! ```no_run
//! use tsk_updater::{UpdateService, UpdaterConfig};
//!
//! fn update() -> tsk_updater::Result<()> {
//!     let config = UpdaterConfig::for_root("/opt/technical-sketcher");
//!     let report = UpdateService::new(&config)?.run();
//!     for phase in &report.phases {
//!         println!("{phase}");
//!     }
//!     println!("{}", report.outcome);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod error;
pub mod layout;
pub mod release;
pub mod report;

// Installation state
pub mod fs_ops;
pub mod guard;
pub mod marker;
pub mod status;

// Transaction
pub mod cleanup;
pub mod rotation;
pub mod swap;
pub mod transaction;

// Individual steps
pub mod steps;

// GitHub API
pub mod github;

pub mod service;

// Re-export main types for convenience
pub use cleanup::{CleanupReport, cleanup_outdated, cleanup_staging, recover_leftovers};
pub use config::UpdaterConfig;
pub use error::{Result, UpdateError};
pub use fs_ops::{FileSystem, StdFileSystem};
pub use guard::InstanceLock;
pub use layout::{InstallLayout, SelfBinary};
pub use marker::VersionMarker;
pub use release::{ReleaseAsset, ReleaseInfo};
pub use report::{Phase, PhaseReport, RunOutcome, RunReport};
pub use service::UpdateService;
pub use status::UpdateStatus;
pub use transaction::{StagedApply, TransactionReport, TransactionState};

// Re-export step traits and implementations
pub use github::GitHubClient;
pub use steps::check::{ReleaseLocator, UpdateCandidate, check_for_update};
pub use steps::download::{Fetcher, HttpFetcher, format_bytes};
pub use steps::extract::{ArchiveExtractor, ArchiveType, Extractor, detect_archive_type};
pub use steps::verify::{VerificationStatus, verify_download, verify_sha256};

/// Current version of the updater.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
