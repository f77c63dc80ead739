//! Theme package discovery and download.
//!
//! A [`Package`] describes the theme archive to install: its version, where
//! to download it from and where the download is stored. It is built once per
//! run by [`discover`] from the configured [`PackageSource`]:
//!
//! | Source   | Metadata                                                    |
//! |----------|-------------------------------------------------------------|
//! | `direct` | a fixed URL, `latest.zip` on the theme's website by default |
//! | `scrape` | the first `/downloads/<version>.zip` link on a web page     |
//! | `github` | the first asset of the latest GitHub release                |
//!
//! The archive is downloaded into the system temporary directory and owned
//! by a [`TempDownload`] guard that deletes it when dropped, whether the
//! merge succeeded or not.

use std::path::{Path, PathBuf};

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::release::{ReleaseError, ReleaseSource};
use crate::transfer::{ProgressSink, TransferClient, TransferError, file_name_from_url};

/// Download location used when no source is configured.
pub const DEFAULT_PACKAGE_URL: &str = "http://metroforsteam.com/downloads/latest.zip";

/// Matches absolute or root-relative links to `/downloads/<version>.zip`.
const DOWNLOAD_LINK_PATTERN: &str =
    r#"(?P<url>(?:https?://[^"'\s<>]*)?/downloads/(?P<version>[^/"'\s<>]+)\.zip)"#;

/// Errors raised while discovering the package.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Fetching the download page failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Querying the release registry failed.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// The download page has no package link.
    #[error("no package download link found on {page_url}")]
    NoDownloadLink {
        /// Page that was searched
        page_url: String,
    },

    /// The repository has no releases.
    #[error("{owner}/{repo} has no releases")]
    NoRelease {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },

    /// The latest release has nothing to download.
    #[error("release {tag} of {owner}/{repo} has no assets")]
    NoAsset {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
        /// Release tag
        tag: String,
    },

    /// A URL could not be parsed.
    #[error("invalid package URL '{url}'")]
    InvalidUrl {
        /// The rejected URL
        url: String,
    },
}

/// Where package metadata comes from.
///
/// ```toml
/// [package]
/// source = "scrape"
/// page_url = "https://metroforsteam.com/"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum PackageSource {
    /// A fixed archive URL.
    Direct {
        /// Archive URL
        #[serde(default = "default_package_url")]
        url: String,
        /// Version label; derived from the file name when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    /// A web page linking to `/downloads/<version>.zip`.
    Scrape {
        /// Page to search
        page_url: String,
    },
    /// The first asset of a repository's latest release.
    Github {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },
}

impl Default for PackageSource {
    fn default() -> Self {
        Self::Direct {
            url: default_package_url(),
            version: None,
        }
    }
}

fn default_package_url() -> String {
    DEFAULT_PACKAGE_URL.to_string()
}

/// The theme archive chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Version label of the package
    pub version: String,
    /// Where the archive is downloaded from
    pub download_url: String,
    /// Where the archive is stored while merging
    pub download_path: PathBuf,
    /// Theme folder name, also the archive entry prefix
    pub theme_name: String,
}

impl Package {
    /// Builds a package, naming the download after the URL's last path
    /// segment inside `download_dir`.
    pub fn new(
        version: impl Into<String>,
        download_url: impl Into<String>,
        theme_name: impl Into<String>,
        download_dir: &Path,
    ) -> Result<Self, DiscoveryError> {
        let download_url = download_url.into();
        let file_name = file_name_from_url(&download_url).ok_or_else(|| DiscoveryError::InvalidUrl {
            url: download_url.clone(),
        })?;
        Ok(Self {
            version: version.into(),
            download_path: download_dir.join(file_name),
            download_url,
            theme_name: theme_name.into(),
        })
    }

    /// Downloads the archive to [`Package::download_path`].
    ///
    /// The returned guard deletes the file when dropped. A failed download
    /// removes any partial file before returning.
    pub async fn download(
        &self,
        client: &TransferClient,
        sink: &dyn ProgressSink,
    ) -> Result<TempDownload, TransferError> {
        let guard = TempDownload::new(&self.download_path);
        client.download_to_file(&self.download_url, guard.path(), sink).await?;
        Ok(guard)
    }
}

/// Resolves `source` into a [`Package`] stored under `download_dir`.
pub async fn discover<S: ReleaseSource>(
    source: &PackageSource,
    client: &TransferClient,
    releases: &S,
    theme_name: &str,
    download_dir: &Path,
) -> Result<Package, DiscoveryError> {
    match source {
        PackageSource::Direct {
            url,
            version,
        } => {
            let version = match version {
                Some(version) => version.clone(),
                None => file_name_from_url(url)
                    .map(|name| name.trim_end_matches(".zip").to_string())
                    .ok_or_else(|| DiscoveryError::InvalidUrl {
                        url: url.clone(),
                    })?,
            };
            Package::new(version, url.clone(), theme_name, download_dir)
        }
        PackageSource::Scrape {
            page_url,
        } => {
            let page = client.download_to_string(page_url).await?;
            let (url, version) = find_download_link(&page, page_url)?;
            debug!("Found package {} at {}", version, url);
            Package::new(version, url, theme_name, download_dir)
        }
        PackageSource::Github {
            owner,
            repo,
        } => {
            let release = releases.get_latest_release(owner, repo).await?.ok_or_else(|| {
                DiscoveryError::NoRelease {
                    owner: owner.clone(),
                    repo: repo.clone(),
                }
            })?;
            let asset = release.primary_asset().ok_or_else(|| DiscoveryError::NoAsset {
                owner: owner.clone(),
                repo: repo.clone(),
                tag: release.tag_name.clone(),
            })?;
            Package::new(
                release.tag_name.trim_start_matches('v'),
                asset.browser_download_url.clone(),
                theme_name,
                download_dir,
            )
        }
    }
}

/// First `/downloads/<version>.zip` link in `page`, resolved against
/// `page_url`.
fn find_download_link(page: &str, page_url: &str) -> Result<(String, String), DiscoveryError> {
    let no_link = || DiscoveryError::NoDownloadLink {
        page_url: page_url.to_string(),
    };
    let pattern = Regex::new(DOWNLOAD_LINK_PATTERN).map_err(|_| no_link())?;
    let captures = pattern.captures(page).ok_or_else(no_link)?;
    let link = &captures["url"];
    let version = captures["version"].to_string();

    let base = Url::parse(page_url).map_err(|_| DiscoveryError::InvalidUrl {
        url: page_url.to_string(),
    })?;
    let url = base.join(link).map_err(|_| DiscoveryError::InvalidUrl {
        url: link.to_string(),
    })?;
    Ok((url.to_string(), version))
}

/// A downloaded file that is deleted when the guard is dropped.
#[derive(Debug)]
pub struct TempDownload {
    path: PathBuf,
}

impl TempDownload {
    /// Takes ownership of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// The guarded path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDownload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary download {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary download {}: {}", self.path.display(), e),
        }
    }
}
