//! Release registry access.
//!
//! The updater publishes its own builds as GitHub releases. Only a few fields
//! of the REST API matter here: the release tag, the asset download URLs and
//! the core rate limit counters.
//!
//! [`ReleaseSource`] abstracts the registry so the self-update orchestrator
//! can be exercised against an in-memory source; [`GitHubReleaseSource`] is
//! the real implementation.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::GitHubSettings;
use crate::transfer::{TransferClient, TransferError};

/// Errors raised while querying the registry.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The request failed or returned an error status.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The response body was not the expected JSON.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// Underlying decode error
        #[source]
        source: reqwest::Error,
    },
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// File name of the asset
    pub name: String,
    /// Direct download URL
    pub browser_download_url: String,
}

/// A tagged release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Release tag, e.g. `v1.2.0`
    pub tag_name: String,
    /// Attached files in upload order
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// The first asset, which is the one installed.
    #[must_use]
    pub fn primary_asset(&self) -> Option<&ReleaseAsset> {
        self.assets.first()
    }
}

/// Remaining request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    /// Whether no requests are left.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining < 1
    }

    /// Time until the quota resets, never negative.
    #[must_use]
    pub fn resets_in(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.reset_at - now).max(TimeDelta::zero())
    }
}

/// Read access to a release registry.
pub trait ReleaseSource: Send + Sync {
    /// Current rate limit for the core API.
    fn get_rate_limit(&self) -> impl Future<Output = Result<RateLimit, ReleaseError>> + Send;

    /// Most recent release of `owner/repo`, `None` when there is none.
    fn get_latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> impl Future<Output = Result<Option<Release>, ReleaseError>> + Send;
}

impl<T: ReleaseSource> ReleaseSource for &T {
    fn get_rate_limit(&self) -> impl Future<Output = Result<RateLimit, ReleaseError>> + Send {
        (**self).get_rate_limit()
    }

    fn get_latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> impl Future<Output = Result<Option<Release>, ReleaseError>> + Send {
        (**self).get_latest_release(owner, repo)
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: CoreLimit,
}

#[derive(Debug, Deserialize)]
struct CoreLimit {
    remaining: u32,
    reset: i64,
}

/// [`ReleaseSource`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubReleaseSource {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubReleaseSource {
    /// Creates a source sharing `transfer`'s HTTP client.
    #[must_use]
    pub fn new(transfer: &TransferClient, settings: &GitHubSettings) -> Self {
        Self {
            client: transfer.http().clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.resolved_token(),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, TransferError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(|source| TransferError::Request {
            url: url.to_string(),
            source,
        })
    }
}

fn check_status(url: &str, response: &reqwest::Response) -> Result<(), TransferError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransferError::Status {
            url: url.to_string(),
            status,
        })
    }
}

impl ReleaseSource for GitHubReleaseSource {
    async fn get_rate_limit(&self) -> Result<RateLimit, ReleaseError> {
        let url = format!("{}/rate_limit", self.api_url);
        let response = self.get(&url).await?;
        check_status(&url, &response)?;

        let body: RateLimitResponse = response.json().await.map_err(|source| ReleaseError::Decode {
            url: url.clone(),
            source,
        })?;
        let core = body.resources.core;
        debug!("GitHub rate limit: {} remaining, resets at {}", core.remaining, core.reset);

        Ok(RateLimit {
            remaining: core.remaining,
            reset_at: DateTime::<Utc>::from_timestamp(core.reset, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Option<Release>, ReleaseError> {
        let url = format!("{}/repos/{}/{}/releases?per_page=1", self.api_url, owner, repo);
        debug!("Fetching latest release from: {}", url);

        let response = self.get(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Repository {}/{} not found", owner, repo);
            return Ok(None);
        }
        check_status(&url, &response)?;

        let releases: Vec<Release> = response.json().await.map_err(|source| ReleaseError::Decode {
            url: url.clone(),
            source,
        })?;
        Ok(releases.into_iter().next())
    }
}
