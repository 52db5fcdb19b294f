//! Release description handed from the locator to the fetcher.

/// A downloadable asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Asset file name.
    pub name: String,
    /// Direct download URL.
    pub download_url: String,
    /// Digest published with the asset (`sha256:<hex>`), if any.
    pub digest: Option<String>,
    /// Size in bytes, 0 if unknown.
    pub size: u64,
}

impl ReleaseAsset {
    /// Returns the SHA256 hex digest, if one was published.
    #[must_use]
    pub fn sha256(&self) -> Option<&str> {
        self.digest
            .as_deref()
            .and_then(|d| d.strip_prefix("sha256:"))
    }
}

/// The newest published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Opaque version tag, compared with the installed marker by equality.
    pub version_tag: String,
    /// Assets that are ready for download.
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseInfo {
    /// Finds an asset by exact name.
    #[must_use]
    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, digest: Option<&str>) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            download_url: format!("https://example.com/{name}"),
            digest: digest.map(str::to_string),
            size: 10,
        }
    }

    #[test]
    fn test_find_asset_exact_name() {
        let release = ReleaseInfo {
            version_tag: "v1.0".to_string(),
            assets: vec![
                asset("AutomaticUpdaterRelease.zip.sig", None),
                asset("AutomaticUpdaterRelease.zip", None),
            ],
        };
        let found = release.find_asset("AutomaticUpdaterRelease.zip").unwrap();
        assert_eq!(found.name, "AutomaticUpdaterRelease.zip");
        assert!(release.find_asset("Other.zip").is_none());
    }

    #[test]
    fn test_sha256_prefix() {
        assert_eq!(asset("a", Some("sha256:abc")).sha256(), Some("abc"));
        assert_eq!(asset("a", Some("md5:abc")).sha256(), None);
        assert_eq!(asset("a", None).sha256(), None);
    }
}
