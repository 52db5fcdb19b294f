//! GitHub API types.

use serde::Deserialize;

use crate::release::{ReleaseAsset, ReleaseInfo};

/// Raw release data from the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    /// The release tag name (e.g., "v0.1.0").
    pub tag_name: String,

    /// The release title/name.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether this is a pre-release.
    #[serde(default)]
    pub prerelease: bool,

    /// Whether this is a draft release.
    #[serde(default)]
    pub draft: bool,

    /// Release assets.
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,

    /// HTML URL to the release page.
    #[serde(default)]
    pub html_url: String,

    /// Publication timestamp.
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Release asset data from the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    /// Asset filename.
    pub name: String,

    /// Direct download URL.
    pub browser_download_url: String,

    /// Upload state: "uploaded" (complete) or "open" (still uploading).
    #[serde(default = "default_state")]
    pub state: String,

    /// SHA256 digest (format: "sha256:..."), null until GitHub computed it.
    #[serde(default)]
    pub digest: Option<String>,

    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
}

fn default_state() -> String {
    "uploaded".to_string()
}

impl GitHubAsset {
    /// Returns whether this asset is fully uploaded and ready for download.
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.state == "uploaded"
    }
}

impl From<GitHubRelease> for ReleaseInfo {
    fn from(release: GitHubRelease) -> Self {
        let assets = release
            .assets
            .into_iter()
            .filter(GitHubAsset::is_uploaded)
            .map(|asset| ReleaseAsset {
                name: asset.name,
                download_url: asset.browser_download_url,
                digest: asset.digest,
                size: asset.size,
            })
            .collect();

        Self {
            version_tag: release.tag_name,
            assets,
        }
    }
}
