//! Configuration management for the updater.
//!
//! All settings live in a single TOML file. Nothing is required: a missing
//! file, or a file with only some sections, falls back to defaults that
//! install "Metro for Steam" into the detected Steam skins folder and check
//! `Hertizch/MetroForSteamAutoUpdater` for updater releases.
//!
//! # Location
//!
//! - `--config <path>` when given
//! - otherwise `<config dir>/skin-updater/config.toml`
//!   (`~/.config` on Linux, `~/Library/Application Support` on macOS,
//!   `%APPDATA%` on Windows)
//!
//! # Example
//!
//! ```toml
//! skins_path = "D:/Games/Steam/skins"
//! theme_name = "Metro for Steam"
//!
//! [package]
//! source = "scrape"
//! page_url = "https://metroforsteam.com/"
//!
//! [github]
//! token = "ghp_xxxxxxxxxxxx"
//!
//! [upgrade]
//! enabled = true
//!
//! [network]
//! connect_timeout_secs = 30
//! ```
//!
//! # Authentication
//!
//! The GitHub token only raises the API rate limit. It is read from
//! `SKIN_UPDATER_GITHUB_TOKEN`, then `GITHUB_TOKEN`, then the `[github]`
//! section. A missing token is not an error. On Unix the file is written
//! with `0600` permissions since it may hold the token.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::package::PackageSource;
use crate::upgrade::config::UpgradeConfig;

/// Environment variable checked first for a GitHub token.
pub const TOKEN_ENV: &str = "SKIN_UPDATER_GITHUB_TOKEN";

/// Fallback environment variable for a GitHub token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Top-level updater configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Explicit skins directory, bypassing Steam detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skins_path: Option<PathBuf>,

    /// Name of the theme folder, also the archive entry prefix.
    #[serde(default = "default_theme_name")]
    pub theme_name: String,

    /// File that unhandled faults are appended to.
    ///
    /// Defaults to `skin-updater.log` next to the executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Where the theme package metadata comes from.
    #[serde(default)]
    pub package: PackageSource,

    /// GitHub API access.
    #[serde(default)]
    pub github: GitHubSettings,

    /// Self-update behaviour.
    #[serde(default)]
    pub upgrade: UpgradeConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub network: NetworkSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            skins_path: None,
            theme_name: default_theme_name(),
            log_file: None,
            package: PackageSource::default(),
            github: GitHubSettings::default(),
            upgrade: UpgradeConfig::default(),
            network: NetworkSettings::default(),
        }
    }
}

fn default_theme_name() -> String {
    "Metro for Steam".to_string()
}

/// GitHub REST API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// API base URL, overridable for GitHub Enterprise or tests.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access token used to raise the rate limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
        }
    }
}

impl GitHubSettings {
    /// The token to authenticate with, if any.
    ///
    /// Environment variables win over the configuration file. Empty values
    /// are treated as absent.
    #[must_use]
    pub fn resolved_token(&self) -> Option<String> {
        [TOKEN_ENV, GITHUB_TOKEN_ENV]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .chain(self.token.clone())
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty())
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

/// HTTP client settings shared by every transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect timeout in seconds; `None` uses the client default.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: Option<u64>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    format!("skin-updater/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout_secs() -> Option<u64> {
    Some(30)
}

impl AppConfig {
    /// Loads configuration from `path`, or from [`AppConfig::default_path`]
    /// when `path` is `None`. A missing file yields the defaults.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Default configuration file location.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(config_dir.join("skin-updater").join("config.toml"))
    }
}
