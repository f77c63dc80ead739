//! Error handling for the updater
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** for the failures a pipeline stage knows how to
//!    recover from
//! 2. **User-friendly messages** with actionable suggestions for the console
//!
//! # Architecture
//!
//! - [`UpdaterError`] - one variant per failure category of the run pipeline
//! - [`ErrorContext`] - a message plus optional details and suggestion,
//!   printed in color by [`ErrorContext::display`]
//! - [`user_friendly_error`] - converts any [`anyhow::Error`] into an
//!   [`ErrorContext`]
//!
//! # Propagation Policy
//!
//! | Variant            | Effect on the run                                   |
//! |--------------------|-----------------------------------------------------|
//! | `PathNotFound`     | fatal, exit code 1 before any network access        |
//! | `Transfer`         | the step is skipped, later independent stages run   |
//! | `Archive`          | aborts extraction only, the run still pauses/exits  |
//! | `VersionParse`     | treated as "no update available"                    |
//! | `RateLimited`      | skips the self-update check only                    |
//! | `ScriptLaunch`     | self-update abandoned, package update continues     |
//! | `PackageDiscovery` | no package to download, extraction cannot run       |
//!
//! Anything that is not an [`UpdaterError`] and escapes the pipeline is an
//! unhandled fault: it is appended to the log file and the process exits
//! with code 1.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::merge::MergeError;
use crate::package::DiscoveryError;
use crate::release::ReleaseError;
use crate::transfer::TransferError;
use crate::upgrade::ScriptLaunchError;
use crate::version::VersionParseError;

/// Failure categories of the update pipeline.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The target skins directory does not exist.
    #[error("Steam skins path does not exist at {}", display_path(path))]
    PathNotFound {
        /// The path that was checked, if one could be determined at all
        path: Option<PathBuf>,
    },

    /// A download or HTTP request failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The release registry could not be queried.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// The archive could not be read or written out.
    #[error(transparent)]
    Archive(#[from] MergeError),

    /// A version string was malformed.
    #[error(transparent)]
    VersionParse(#[from] VersionParseError),

    /// The release registry quota is exhausted.
    #[error("GitHub API rate limit exceeded, resets in {minutes} minute(s)")]
    RateLimited {
        /// Minutes until the quota resets
        minutes: i64,
    },

    /// The relaunch script could not be written or started.
    #[error(transparent)]
    ScriptLaunch(#[from] ScriptLaunchError),

    /// No package could be discovered from the configured source.
    #[error(transparent)]
    PackageDiscovery(#[from] DiscoveryError),

    /// The configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Filesystem error outside of extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref().map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string())
}

/// A user-facing error message with optional details and suggestion.
///
/// # Display Format
///
/// 1. **Error**: the main message in red
/// 2. **Details**: additional context in yellow (optional)
/// 3. **Suggestion**: an actionable next step in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use skin_updater::core::ErrorContext;
///
/// let context = ErrorContext::new("Failed to download package")
///     .with_details("The server returned HTTP 503")
///     .with_suggestion("Try again in a few minutes");
///
/// context.display();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// The main error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a context with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message.red());

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with actionable suggestions.
///
/// [`UpdaterError`] variants get tailored suggestions. I/O errors get
/// permission or missing-file guidance. Everything else is shown with its
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(updater_error) = error.downcast_ref::<UpdaterError>() {
        return create_error_context(updater_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(error.to_string())
                    .with_suggestion("Close Steam and try again, or check the permissions of the skins folder")
                    .with_details("The updater was not allowed to read or write a file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(error.to_string())
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    ErrorContext::new(message_with_chain(&error))
}

fn message_with_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn create_error_context(error: &UpdaterError) -> ErrorContext {
    let context = ErrorContext::new(error.to_string());
    match error {
        UpdaterError::PathNotFound { .. } => context
            .with_suggestion("Please double-check your Steam path, or set `skins_path` in the config file / pass --skins-path")
            .with_details("The skins folder is looked up from the standard Steam install locations"),

        UpdaterError::Transfer(TransferError::Status { status, .. }) if status.as_u16() == 404 => context
            .with_suggestion("The package location may have moved. Check the [package] section of the config file"),

        UpdaterError::Transfer(_) | UpdaterError::Release(_) => context
            .with_suggestion("Check your internet connection and try again")
            .with_details("Proxy settings are ignored; the updater always connects directly"),

        UpdaterError::Archive(_) => context
            .with_suggestion("Close Steam so no skin files are locked, then run the updater again"),

        UpdaterError::RateLimited { .. } => context
            .with_suggestion("Set a GitHub token in SKIN_UPDATER_GITHUB_TOKEN or the [github] config section to raise the limit"),

        UpdaterError::ScriptLaunch(_) => context
            .with_suggestion("Download the latest updater release manually from GitHub"),

        UpdaterError::PackageDiscovery(_) => context
            .with_suggestion("Check the [package] section of the config file"),

        UpdaterError::Config { .. } => context
            .with_suggestion("Fix the config file or delete it to use the defaults"),

        UpdaterError::VersionParse(_) | UpdaterError::Io(_) => context,
    }
}
