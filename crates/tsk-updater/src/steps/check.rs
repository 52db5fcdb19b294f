//! Check for available updates.

use crate::error::{Result, UpdateError};
use crate::release::{ReleaseAsset, ReleaseInfo};

/// Source of the newest release.
pub trait ReleaseLocator {
    /// Returns the latest published release.
    fn latest_release(&self) -> Result<ReleaseInfo>;
}

/// A release that differs from the installed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    /// Tag to record once the update commits.
    pub version_tag: String,
    /// Package to download.
    pub asset: ReleaseAsset,
}

/// Looks up the latest release and compares its tag with `installed`.
///
/// Tags are opaque: any difference counts as an update, including a lower
/// version. Returns `None` when they are equal.
pub fn check_for_update(
    locator: &dyn ReleaseLocator,
    installed: Option<&str>,
    asset_name: &str,
) -> Result<Option<UpdateCandidate>> {
    tracing::info!(
        "Checking for updates (installed: {})",
        installed.unwrap_or("none")
    );

    let release = locator.latest_release()?;
    let latest = release.version_tag.trim();

    if installed.map(str::trim) == Some(latest) {
        tracing::info!("No update available (latest: {latest})");
        return Ok(None);
    }

    let asset = release
        .find_asset(asset_name)
        .ok_or_else(|| UpdateError::NoAssetFound(asset_name.to_string()))?;

    tracing::info!(
        "Update available: {} -> {latest} (asset: {})",
        installed.unwrap_or("none"),
        asset.name
    );

    Ok(Some(UpdateCandidate {
        version_tag: latest.to_string(),
        asset: asset.clone(),
    }))
}
