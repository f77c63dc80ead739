use std::path::{Path, PathBuf};

use chrono::{TimeDelta, Utc};
use tracing::{debug, info, warn};

use super::config::UpgradeConfig;
use super::script::{RelaunchScript, ScriptFlavor, ScriptLauncher};
use crate::core::UpdaterError;
use crate::release::ReleaseSource;
use crate::transfer::{ProgressSink, TransferClient, TransferError, file_name_from_url};
use crate::version::Version;

/// Where the running executable lives and where its replacement goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    executable: PathBuf,
}

impl InstallTarget {
    /// Targets the given executable path.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Targets the running executable.
    pub fn current() -> std::io::Result<Self> {
        std::env::current_exe().map(Self::new)
    }

    /// Path of the executable being replaced.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Directory containing the executable.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.executable.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Where a downloaded binary called `file_name` is stored.
    ///
    /// The file goes next to the executable. A name equal to the executable's
    /// own gets a `.new` suffix so the running binary is not overwritten.
    #[must_use]
    pub fn download_path(&self, file_name: &str) -> PathBuf {
        let same_name = self.executable.file_name().is_some_and(|own| own == file_name);
        if same_name {
            self.directory().join(format!("{file_name}.new"))
        } else {
            self.directory().join(file_name)
        }
    }
}

/// Terminal state of a self-update check.
#[derive(Debug)]
pub enum SelfUpdateOutcome {
    /// Self-update is turned off.
    Disabled,
    /// No API requests left; nothing was checked.
    RateLimited {
        /// Time until the quota resets
        resets_in: TimeDelta,
    },
    /// The repository has no releases.
    NoReleases,
    /// The running version is current.
    ///
    /// `latest` is `None` when the release tag could not be parsed.
    UpToDate {
        /// Running version
        current: Version,
        /// Latest published version
        latest: Option<Version>,
    },
    /// A newer release exists but has nothing to download.
    NoAsset {
        /// Version of that release
        version: Version,
    },
    /// Downloading the new binary failed.
    DownloadFailed {
        /// Version that was being downloaded
        version: Version,
        /// Why the download failed
        error: TransferError,
    },
    /// The relaunch script is running; the process should exit now.
    Replacing {
        /// Version being installed
        version: Version,
        /// Path of the started script
        script: PathBuf,
    },
}

impl SelfUpdateOutcome {
    /// Whether the process must exit so the script can replace it.
    #[must_use]
    pub fn requires_exit(&self) -> bool {
        matches!(self, Self::Replacing { .. })
    }
}

/// Checks for a newer updater release and replaces the running executable.
///
/// The check walks a fixed sequence and stops at the first terminal state:
///
/// ```text
/// rate limit ──exhausted──▶ RateLimited
///     │
/// latest release ──none──▶ NoReleases
///     │
/// compare ──latest <= current──▶ UpToDate
///     │
/// first asset ──none──▶ NoAsset
///     │
/// download ──error──▶ DownloadFailed
///     │
/// write + launch relaunch script ──▶ Replacing
/// ```
///
/// The release source and script launcher are injected so the sequence can
/// be tested without GitHub or spawning processes.
///
/// # Examples
///
/// ```rust,no_run
/// use skin_updater::config::AppConfig;
/// use skin_updater::release::GitHubReleaseSource;
/// use skin_updater::transfer::{NoProgress, TransferClient};
/// use skin_updater::upgrade::{DetachedLauncher, InstallTarget, SelfUpdater};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let transfer = TransferClient::new(&config.network)?;
/// let source = GitHubReleaseSource::new(&transfer, &config.github);
/// let updater = SelfUpdater::new(
///     source,
///     DetachedLauncher,
///     transfer,
///     config.upgrade.clone(),
///     InstallTarget::current()?,
/// );
///
/// if updater.run(&NoProgress).await?.requires_exit() {
///     std::process::exit(2);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater<S, L> {
    source: S,
    launcher: L,
    transfer: TransferClient,
    config: UpgradeConfig,
    target: InstallTarget,
    current: Version,
    script_dir: PathBuf,
    flavor: ScriptFlavor,
}

impl<S: ReleaseSource, L: ScriptLauncher> SelfUpdater<S, L> {
    /// Creates an updater for the running binary version.
    ///
    /// Scripts are written to the system temporary directory in the
    /// platform's native dialect.
    pub fn new(
        source: S,
        launcher: L,
        transfer: TransferClient,
        config: UpgradeConfig,
        target: InstallTarget,
    ) -> Self {
        Self {
            source,
            launcher,
            transfer,
            config,
            target,
            current: Version::current(),
            script_dir: std::env::temp_dir(),
            flavor: ScriptFlavor::native(),
        }
    }

    /// Overrides the version compared against the latest release.
    #[must_use]
    pub fn with_current_version(mut self, current: Version) -> Self {
        self.current = current;
        self
    }

    /// Overrides where relaunch scripts are written.
    #[must_use]
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }

    /// Version of the running binary.
    #[must_use]
    pub fn current_version(&self) -> Version {
        self.current
    }

    /// Runs the check and, if a newer release exists, starts the replacement.
    ///
    /// Registry and script failures come back as [`UpdaterError::Release`]
    /// and [`UpdaterError::ScriptLaunch`]; neither should stop the package
    /// update.
    pub async fn run(&self, sink: &dyn ProgressSink) -> Result<SelfUpdateOutcome, UpdaterError> {
        if !self.config.enabled {
            debug!("Self-update disabled");
            return Ok(SelfUpdateOutcome::Disabled);
        }

        let limit = self.source.get_rate_limit().await?;
        if limit.is_exhausted() {
            let resets_in = limit.resets_in(Utc::now());
            warn!("GitHub rate limit exhausted, resets in {} minute(s)", resets_in.num_minutes());
            return Ok(SelfUpdateOutcome::RateLimited {
                resets_in,
            });
        }

        let Some(release) =
            self.source.get_latest_release(&self.config.repo_owner, &self.config.repo_name).await?
        else {
            info!("No releases found for {}/{}", self.config.repo_owner, self.config.repo_name);
            return Ok(SelfUpdateOutcome::NoReleases);
        };

        let latest = match Version::parse(&release.tag_name) {
            Ok(latest) => latest,
            Err(e) => {
                warn!("Ignoring release with unparsable tag '{}': {}", release.tag_name, e);
                return Ok(SelfUpdateOutcome::UpToDate {
                    current: self.current,
                    latest: None,
                });
            }
        };

        if latest <= self.current {
            debug!("Running {} is not older than latest {}", self.current, latest);
            return Ok(SelfUpdateOutcome::UpToDate {
                current: self.current,
                latest: Some(latest),
            });
        }

        let Some(asset) = release.primary_asset() else {
            warn!("Release {} has no assets", release.tag_name);
            return Ok(SelfUpdateOutcome::NoAsset {
                version: latest,
            });
        };

        info!("Updating from {} to {}", self.current, latest);
        let file_name =
            file_name_from_url(&asset.browser_download_url).unwrap_or_else(|| asset.name.clone());
        let new_binary = self.target.download_path(&file_name);

        if let Err(error) =
            self.transfer.download_to_file(&asset.browser_download_url, &new_binary, sink).await
        {
            remove_download(&new_binary);
            return Ok(SelfUpdateOutcome::DownloadFailed {
                version: latest,
                error,
            });
        }

        let script = RelaunchScript::replace_executable(
            self.target.executable(),
            &new_binary,
            self.config.relaunch_delay_secs,
        );
        let launched = script
            .write(self.flavor, &self.script_dir)
            .and_then(|script_path| self.launcher.launch(&script_path).map(|()| script_path));
        match launched {
            Ok(script_path) => Ok(SelfUpdateOutcome::Replacing {
                version: latest,
                script: script_path,
            }),
            Err(e) => {
                remove_download(&new_binary);
                Err(e.into())
            }
        }
    }
}

/// Deletes a downloaded binary that will not be installed.
fn remove_download(path: &Path) {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!("Failed to remove downloaded binary {}: {}", path.display(), e);
        }
        _ => {}
    }
}
