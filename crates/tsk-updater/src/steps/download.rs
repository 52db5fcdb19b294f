//! Download the release package.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderMap;

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::github::client::build_http_client;
use crate::release::ReleaseAsset;

/// Materializes a release asset as a local file.
pub trait Fetcher {
    /// Writes the bytes of `asset` to `dest` and returns how many were written.
    fn fetch(&self, asset: &ReleaseAsset, dest: &Path) -> Result<u64>;
}

/// Blocking HTTP download.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher using the timeout from `config`.
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.http_timeout_secs, HeaderMap::new())?,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, asset: &ReleaseAsset, dest: &Path) -> Result<u64> {
        tracing::info!("Downloading {} from {}", asset.name, asset.download_url);

        let mut response = self
            .client
            .get(&asset.download_url)
            .send()
            .map_err(|e| UpdateError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Fetch(format!(
                "download failed with status {status}"
            )));
        }

        // Stream into `<name>.part`, renamed once complete.
        let part = partial_path(dest);
        let written = match write_body(&mut response, &part) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&part);
                return Err(e);
            }
        };

        if asset.size > 0 && written != asset.size {
            let _ = fs::remove_file(&part);
            return Err(UpdateError::Fetch(format!(
                "expected {} bytes, received {written}",
                asset.size
            )));
        }

        fs::rename(&part, dest).map_err(|e| {
            let _ = fs::remove_file(&part);
            UpdateError::Fetch(format!("failed to move download to {}: {e}", dest.display()))
        })?;

        tracing::info!("Downloaded {} ({})", asset.name, format_bytes(written));
        Ok(written)
    }
}

fn write_body(response: &mut Response, part: &Path) -> Result<u64> {
    let mut file = File::create(part)
        .map_err(|e| UpdateError::Fetch(format!("failed to create {}: {e}", part.display())))?;
    let written = response
        .copy_to(&mut file)
        .map_err(|e| UpdateError::Fetch(format!("failed to read body: {e}")))?;
    file.flush()
        .and_then(|()| file.sync_all())
        .map_err(|e| UpdateError::Fetch(format!("failed to write {}: {e}", part.display())))?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Format bytes as a human-readable string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
