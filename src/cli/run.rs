//! The update run: skins folder, self-update, package, merge.
//!
//! [`Pipeline`] drives one run in strict order and decides the exit code.
//! Each stage reports its own failure on the console; a failed stage only
//! skips the stages that depend on it.
//!
//! | Stage           | On failure                                           |
//! |-----------------|------------------------------------------------------|
//! | skins folder    | `PathNotFound`, the run stops before any request      |
//! | self-update     | reported, the theme update continues                 |
//! | package lookup  | reported, nothing to download                        |
//! | download        | reported, nothing to merge                           |
//! | merge           | reported without counts                              |

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::{ErrorContext, UpdaterError, user_friendly_error};
use crate::merge::{ExtractionResult, MergePlanner};
use crate::package::{self, Package};
use crate::release::ReleaseSource;
use crate::skins::PathResolver;
use crate::transfer::TransferClient;
use crate::upgrade::{InstallTarget, ScriptLauncher, SelfUpdateOutcome, SelfUpdater};
use crate::utils::progress::DownloadProgress;
use crate::version::Version;

/// Exit code for a normal run.
pub const EXIT_OK: i32 = 0;
/// Exit code for a fatal setup or extraction error.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code while the relaunch script replaces the executable.
pub const EXIT_REPLACING: i32 = 2;

/// Settings resolved once per run from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Effective configuration
    pub config: AppConfig,
    /// Where the theme archive is downloaded to
    pub download_dir: PathBuf,
    /// Where relaunch scripts are written
    pub script_dir: PathBuf,
}

impl RunContext {
    /// A context using the system temporary directory for downloads and
    /// scripts.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            download_dir: std::env::temp_dir(),
            script_dir: std::env::temp_dir(),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The theme was merged.
    Completed(ExtractionResult),
    /// A stage failed after the error was reported.
    Failed,
    /// The updater is being replaced and must exit now.
    Replacing {
        /// Version being installed
        version: Version,
    },
}

impl RunOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed(_) => EXIT_OK,
            Self::Failed => EXIT_FAILURE,
            Self::Replacing { .. } => EXIT_REPLACING,
        }
    }
}

/// One update run with its collaborators injected.
pub struct Pipeline<P, S, L> {
    context: RunContext,
    resolver: P,
    releases: S,
    launcher: L,
    transfer: TransferClient,
    target: InstallTarget,
}

impl<P: PathResolver, S: ReleaseSource, L: ScriptLauncher> Pipeline<P, S, L> {
    /// Creates a pipeline.
    pub fn new(
        context: RunContext,
        resolver: P,
        releases: S,
        launcher: L,
        transfer: TransferClient,
        target: InstallTarget,
    ) -> Self {
        Self {
            context,
            resolver,
            releases,
            launcher,
            transfer,
            target,
        }
    }

    /// Runs every stage.
    ///
    /// Only a missing skins folder is returned as an error; every other
    /// stage failure is reported and mapped to [`RunOutcome::Failed`].
    pub async fn run(&self) -> Result<RunOutcome> {
        let skins_path = self.skins_path()?;
        println!("Steam skins path: {}", skins_path.display().to_string().cyan());

        if let Some(version) = self.self_update().await {
            return Ok(RunOutcome::Replacing {
                version,
            });
        }

        let Some(package) = self.discover_package().await else {
            return Ok(RunOutcome::Failed);
        };

        println!("Downloading {} {}...", package.theme_name, package.version);
        let progress = DownloadProgress::new("Downloading");
        let download = match package.download(&self.transfer, &progress).await {
            Ok(download) => download,
            Err(e) => {
                println!("{}", "Download failed".red());
                user_friendly_error(UpdaterError::from(e).into()).display();
                return Ok(RunOutcome::Failed);
            }
        };
        println!("{}", "Download complete".green());

        let planner = MergePlanner::new(&package.theme_name, &skins_path);
        let archive = download.path().to_path_buf();
        let merged = tokio::task::spawn_blocking(move || planner.merge(&archive))
            .await
            .context("Extraction task failed")?;
        drop(download);

        match merged {
            Ok(result) => {
                println!(
                    "Package extracted - ({} file(s) - {} folder(s) - {} skipped file(s)).",
                    result.files_extracted, result.folders_extracted, result.skipped
                );
                println!(
                    "\n{}",
                    "COMPLETE! - You need to restart Steam for the skin to update!".green().bold()
                );
                Ok(RunOutcome::Completed(result))
            }
            Err(e) => {
                println!("{}", "Failed to extract package".red());
                user_friendly_error(UpdaterError::from(e).into()).display();
                Ok(RunOutcome::Failed)
            }
        }
    }

    fn skins_path(&self) -> Result<PathBuf, UpdaterError> {
        match self.resolver.skins_path() {
            Some(path) if path.is_dir() => Ok(path),
            path => Err(UpdaterError::PathNotFound {
                path,
            }),
        }
    }

    /// Returns the version being installed when the process must exit.
    async fn self_update(&self) -> Option<Version> {
        println!("Checking for a newer version of the updater...");
        let updater = SelfUpdater::new(
            &self.releases,
            &self.launcher,
            self.transfer.clone(),
            self.context.config.upgrade.clone(),
            self.target.clone(),
        )
        .with_script_dir(&self.context.script_dir);

        let progress = DownloadProgress::new("Updating");
        match updater.run(&progress).await {
            Ok(SelfUpdateOutcome::Replacing {
                version,
                script,
            }) => {
                debug!("Relaunch script started: {}", script.display());
                println!("{}", format!("Updating to version {version}, restarting...").green());
                Some(version)
            }
            Ok(SelfUpdateOutcome::Disabled) => {
                debug!("Self-update skipped");
                None
            }
            Ok(SelfUpdateOutcome::RateLimited {
                resets_in,
            }) => {
                let error = UpdaterError::RateLimited {
                    minutes: resets_in.num_minutes(),
                };
                println!("{} {}", "Unable to check for updates:".yellow(), error);
                None
            }
            Ok(SelfUpdateOutcome::NoReleases) => {
                println!("No releases found");
                None
            }
            Ok(SelfUpdateOutcome::UpToDate {
                ..
            }) => {
                println!("No updates found, continuing...");
                None
            }
            Ok(SelfUpdateOutcome::NoAsset {
                version,
            }) => {
                println!("{}", format!("Version {version} has no download, continuing...").yellow());
                None
            }
            Ok(SelfUpdateOutcome::DownloadFailed {
                version,
                error,
            }) => {
                println!("{}", format!("Failed to download version {version}").red());
                user_friendly_error(UpdaterError::from(error).into()).display();
                None
            }
            Err(e) => {
                user_friendly_error(e.into()).display();
                None
            }
        }
    }

    async fn discover_package(&self) -> Option<Package> {
        let config = &self.context.config;
        match package::discover(
            &config.package,
            &self.transfer,
            &self.releases,
            &config.theme_name,
            &self.context.download_dir,
        )
        .await
        {
            Ok(package) => {
                info!("Package {} from {}", package.version, package.download_url);
                Some(package)
            }
            Err(e) => {
                ErrorContext::new(format!("Failed to find the theme package: {e}"))
                    .with_suggestion("Check the [package] section of the config file")
                    .display();
                None
            }
        }
    }
}
