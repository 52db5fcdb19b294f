//! GitHub API client for fetching release information.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use super::types::GitHubRelease;
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::release::ReleaseInfo;
use crate::steps::check::ReleaseLocator;

/// User agent string for all requests.
pub(crate) const USER_AGENT_VALUE: &str = concat!(
    "tsk-updater/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/HerrNamenlos123/TechnicalSketcher)"
);

/// Builds the blocking HTTP client shared by the locator and the fetcher.
pub(crate) fn build_http_client(timeout_secs: u64, headers: HeaderMap) -> Result<Client> {
    let timeout = Duration::from_secs(timeout_secs.max(1));
    Client::builder()
        .default_headers(headers)
        .user_agent(USER_AGENT_VALUE)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| UpdateError::Network(format!("failed to create HTTP client: {e}")))
}

/// GitHub API client for the latest-release endpoint.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    latest_url: String,
}

impl GitHubClient {
    /// Creates a client for the repository and API base URL in `config`.
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        Ok(Self {
            client: build_http_client(config.http_timeout_secs, headers)?,
            latest_url: config.latest_release_url(),
        })
    }

    /// Fetches the latest release.
    pub fn get_latest_release(&self) -> Result<GitHubRelease> {
        tracing::debug!("Fetching latest release from {}", self.latest_url);

        let response = self.client.get(&self.latest_url).send()?;
        Self::handle_response(response)
    }

    /// Checks the HTTP response for errors and parses the JSON body.
    fn handle_response(response: Response) -> Result<GitHubRelease> {
        let status = response.status();

        if status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|remaining| remaining.to_str().unwrap_or("1") == "0")
        {
            let retry_after = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|reset| {
                    let now = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    reset.saturating_sub(now)
                })
                .unwrap_or(60);

            return Err(UpdateError::RateLimited { retry_after });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(UpdateError::Network(
                "No releases found for this repository".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(UpdateError::Network(format!(
                "GitHub API error ({status}): {body}"
            )));
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl ReleaseLocator for GitHubClient {
    fn latest_release(&self) -> Result<ReleaseInfo> {
        let release = self.get_latest_release()?;
        if release.draft {
            tracing::warn!("Latest release {} is a draft", release.tag_name);
        }
        Ok(release.into())
    }
}
