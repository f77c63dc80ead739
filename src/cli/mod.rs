//! Command-line interface for the updater.
//!
//! The updater has no subcommands: running it performs one update run
//! (see [`run`]). Flags adjust logging and console behaviour and override
//! values from the configuration file.
//!
//! # Flags
//!
//! | Flag                  | Effect                                              |
//! |-----------------------|-----------------------------------------------------|
//! | `-v`, `--verbose`     | debug logging                                       |
//! | `-q`, `--quiet`       | errors only                                         |
//! | `-c`, `--config`      | alternative configuration file                      |
//! | `--skins-path`        | skins folder, bypassing Steam detection             |
//! | `--skip-self-update`  | do not check for a newer updater                    |
//! | `--no-progress`       | hide progress bars                                  |
//! | `--no-pause`          | exit without waiting for Enter                      |
//! | `--init-config`       | write the default configuration file and exit       |
//!
//! # Exit Codes
//!
//! - `0`: the run finished
//! - `1`: the skins folder is missing, a stage failed, or an unhandled fault
//! - `2`: a newer updater is being installed by the relaunch script

pub mod run;


use std::io::IsTerminal;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures::FutureExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;
use crate::core::{FaultLog, UpdaterError, install_panic_hook, user_friendly_error};
use crate::release::GitHubReleaseSource;
use crate::skins::SteamSkinsResolver;
use crate::transfer::TransferClient;
use crate::upgrade::{DetachedLauncher, InstallTarget};
use crate::utils::progress::NO_PROGRESS_ENV;

pub use run::{EXIT_FAILURE, EXIT_OK, EXIT_REPLACING, Pipeline, RunContext, RunOutcome};

/// Runtime configuration derived from the flags.
///
/// Kept separate from parsing so logging and environment setup can be
/// tested without a real command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Filter directive for `tracing`, overridden by `RUST_LOG`.
    pub log_level: String,

    /// Whether progress bars are hidden.
    ///
    /// When `true`, [`CliConfig::apply_to_env`] sets
    /// `SKIN_UPDATER_NO_PROGRESS` so every bar created afterwards is hidden.
    pub no_progress: bool,

    /// Configuration file to load instead of the default location.
    pub config_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            no_progress: false,
            config_path: None,
        }
    }
}

impl CliConfig {
    /// Defaults: `warn` logging, progress shown, default config location.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the settings that travel through the environment.
    pub fn apply_to_env(&self) {
        if self.no_progress {
            // SAFETY: runs during startup before anything else reads the environment
            unsafe {
                std::env::set_var(NO_PROGRESS_ENV, "1");
            }
        }
    }
}

/// Initializes `tracing` output to stderr.
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless.
pub fn init_logging(level: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Keeps the Metro for Steam skin up to date.
#[derive(Debug, Parser)]
#[command(
    name = "skin-updater",
    about = "Keeps a Steam skin up to date",
    version,
    long_about = "Downloads the latest Metro for Steam package and merges it into the Steam \
                  skins folder, keeping your custom.styles. Checks for a newer version of \
                  itself first and restarts when one is installed."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Steam skins folder, bypassing detection
    #[arg(long, value_name = "PATH")]
    skins_path: Option<PathBuf>,

    /// Do not check for a newer version of the updater
    #[arg(long)]
    skip_self_update: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,

    /// Exit without waiting for Enter
    #[arg(long)]
    no_pause: bool,

    /// Write the default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    /// Builds the runtime configuration from the flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Applies flag overrides on top of the loaded configuration.
    #[must_use]
    pub fn apply_overrides(&self, mut config: AppConfig) -> AppConfig {
        if let Some(path) = &self.skins_path {
            config.skins_path = Some(path.clone());
        }
        if self.skip_self_update {
            config.upgrade.enabled = false;
        }
        config
    }

    /// Performs the run and returns the process exit code.
    ///
    /// Errors escaping the run and panics are written to the fault log and
    /// end with exit code 1. Unless `--no-pause` is given or stdin is not a
    /// terminal, waits for Enter before returning, except when the updater
    /// is being replaced.
    pub async fn execute(self) -> i32 {
        let cli_config = self.build_config();
        cli_config.apply_to_env();
        init_logging(&cli_config.log_level);

        let config = match AppConfig::load_with_optional(cli_config.config_path.clone()).await {
            Ok(config) => self.apply_overrides(config),
            Err(e) => {
                let error = UpdaterError::Config {
                    message: format!("{e:#}"),
                };
                user_friendly_error(error.into()).display();
                return EXIT_FAILURE;
            }
        };

        if self.init_config {
            return match write_default_config(cli_config.config_path).await {
                Ok(path) => {
                    println!("{} {}", "Wrote configuration to".green(), path.display());
                    EXIT_OK
                }
                Err(e) => {
                    user_friendly_error(e).display();
                    EXIT_FAILURE
                }
            };
        }

        let log = config.log_file.clone().map_or_else(FaultLog::beside_executable, FaultLog::new);
        install_panic_hook(log.clone());

        let code = match AssertUnwindSafe(run_with_defaults(config)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome.exit_code(),
            Ok(Err(e)) => {
                if !is_task_panic(&e) {
                    log.record_error(&e);
                }
                user_friendly_error(e).display();
                EXIT_FAILURE
            }
            // the panic hook has already recorded it
            Err(_) => EXIT_FAILURE,
        };

        if code != EXIT_REPLACING && !self.no_pause {
            pause_before_exit();
        }
        code
    }
}

/// Whether `error` is a background task's panic, which the panic hook has
/// already recorded.
fn is_task_panic(error: &anyhow::Error) -> bool {
    error.downcast_ref::<tokio::task::JoinError>().is_some_and(tokio::task::JoinError::is_panic)
}

/// Builds the production pipeline and runs it.
async fn run_with_defaults(config: AppConfig) -> Result<RunOutcome> {
    let transfer = TransferClient::new(&config.network)?;
    let releases = GitHubReleaseSource::new(&transfer, &config.github);
    let resolver = SteamSkinsResolver::new(config.skins_path.clone());
    let target = InstallTarget::current().context("Failed to locate the running executable")?;

    let pipeline =
        Pipeline::new(RunContext::new(config), resolver, releases, DetachedLauncher, transfer, target);
    pipeline.run().await
}

async fn write_default_config(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    AppConfig::default().save_to(&path).await?;
    Ok(path)
}

fn pause_before_exit() {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return;
    }
    println!("Press Enter to exit...");
    let mut line = String::new();
    let _ = stdin.read_line(&mut line);
}
