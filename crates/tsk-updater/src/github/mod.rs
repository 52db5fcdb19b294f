//! GitHub API client and types.
//!
//! This module provides the release locator backed by the GitHub Releases API.

pub mod client;
pub mod types;

pub use client::GitHubClient;
pub use types::{GitHubAsset, GitHubRelease};
