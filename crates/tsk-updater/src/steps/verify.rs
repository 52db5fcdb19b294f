//! SHA256 verification for downloaded updates.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, UpdateError};
use crate::release::ReleaseAsset;

/// Verification status for a downloaded package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// SHA256 hash matched.
    Verified(String),
    /// The release publishes no digest for this asset.
    Unavailable,
    /// Verification is turned off in the configuration.
    Disabled,
}

/// Verifies the downloaded archive at `path` against the digest of `asset`.
///
/// A missing digest is not an error: older releases do not carry one.
pub fn verify_download(
    path: &Path,
    asset: &ReleaseAsset,
    enabled: bool,
) -> Result<VerificationStatus> {
    if !enabled {
        return Ok(VerificationStatus::Disabled);
    }
    let Some(digest) = asset.digest.as_deref() else {
        tracing::warn!("No digest published for {}, skipping verification", asset.name);
        return Ok(VerificationStatus::Unavailable);
    };

    let actual = compute_file_sha256(path)?;
    verify_hash(&actual, digest).map(VerificationStatus::Verified)
}

/// Verifies that `data` matches the expected SHA256 digest.
///
/// Returns the verified SHA256 hash on success.
pub fn verify_sha256(data: &[u8], expected_digest: &str) -> Result<String> {
    verify_hash(&compute_sha256(data), expected_digest)
}

fn verify_hash(actual_hash: &str, expected_digest: &str) -> Result<String> {
    // Support both "sha256:abc123" format and plain "abc123" format
    let expected_hash = expected_digest
        .strip_prefix("sha256:")
        .unwrap_or(expected_digest)
        .trim()
        .to_lowercase();

    if expected_hash != actual_hash {
        return Err(UpdateError::ChecksumMismatch {
            expected: expected_hash,
            actual: actual_hash.to_string(),
        });
    }

    tracing::info!("SHA256 verification passed: {actual_hash}");
    Ok(expected_hash)
}

/// Computes the SHA256 hash of the given data.
#[must_use]
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes the SHA256 hash of a file without loading it whole.
pub fn compute_file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| UpdateError::Io(format!("failed to open {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA256 of "Hello, World!"
    const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    fn asset(digest: Option<String>) -> ReleaseAsset {
        ReleaseAsset {
            name: "pkg.zip".to_string(),
            download_url: String::new(),
            digest,
            size: 13,
        }
    }

    #[test]
    fn test_verify_sha256_valid() {
        let result = verify_sha256(b"Hello, World!", &format!("sha256:{HELLO_SHA256}"));
        assert_eq!(result.unwrap(), HELLO_SHA256);
    }

    #[test]
    fn test_verify_sha256_without_prefix() {
        assert!(verify_sha256(b"Hello, World!", HELLO_SHA256).is_ok());
    }

    #[test]
    fn test_verify_sha256_mismatch() {
        let wrong_digest =
            "sha256:0000000000000000000000000000000000000000000000000000000000000000";
        let result = verify_sha256(b"Hello, World!", wrong_digest);
        assert!(matches!(result, Err(UpdateError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_verify_download_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.zip");
        std::fs::write(&path, b"Hello, World!").unwrap();

        let status =
            verify_download(&path, &asset(Some(format!("sha256:{HELLO_SHA256}"))), true).unwrap();
        assert_eq!(status, VerificationStatus::Verified(HELLO_SHA256.to_string()));
    }

    #[test]
    fn test_verify_download_without_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.zip");
        std::fs::write(&path, b"anything").unwrap();

        let status = verify_download(&path, &asset(None), true).unwrap();
        assert_eq!(status, VerificationStatus::Unavailable);
    }

    #[test]
    fn test_verify_download_disabled() {
        let status = verify_download(
            Path::new("/nonexistent"),
            &asset(Some("sha256:00".to_string())),
            false,
        )
        .unwrap();
        assert_eq!(status, VerificationStatus::Disabled);
    }

    #[test]
    fn test_compute_sha256() {
        assert_eq!(compute_sha256(b"Hello, World!"), HELLO_SHA256);
    }
}
