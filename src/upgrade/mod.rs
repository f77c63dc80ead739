//! Self-update for the updater binary.
//!
//! The updater checks its own GitHub repository on every start and, when a
//! newer release is published, swaps itself out before updating the theme.
//!
//! # Components
//!
//! - [`SelfUpdater`]: the check-download-relaunch sequence
//! - [`RelaunchScript`] / [`ScriptLauncher`]: the detached script that
//!   replaces the executable after this process exits
//! - [`InstallTarget`]: the executable being replaced
//! - [`config::UpgradeConfig`]: repository and pacing settings
//!
//! # Update Process Flow
//!
//! ```text
//! 1. Rate limit
//!    └── no requests left: report when the quota resets and stop
//!
//! 2. Latest release
//!    ├── none published: stop
//!    └── tag not newer than the running version: stop
//!
//! 3. Download
//!    └── first asset, saved next to the executable
//!
//! 4. Relaunch script
//!    ├── wait, delete old binary, wait, rename new binary, wait, start it
//!    └── started detached; the caller exits with code 2
//! ```
//!
//! A failure at any step ends the self-update only. The theme update runs
//! regardless.

pub mod config;
pub mod script;
pub mod self_updater;


pub use config::UpgradeConfig;
pub use script::{
    DetachedLauncher, RelaunchScript, ScriptFlavor, ScriptLaunchError, ScriptLauncher, ScriptStep,
};
pub use self_updater::{InstallTarget, SelfUpdateOutcome, SelfUpdater};
