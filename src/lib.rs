//! skin-updater: keeps a Steam skin up to date and updates itself.
//!
//! One run of the updater:
//!
//! 1. finds the Steam `skins` folder ([`skins`])
//! 2. checks GitHub for a newer updater and, if there is one, replaces the
//!    running executable through a detached relaunch script ([`upgrade`])
//! 3. discovers the latest theme package ([`package`]) and downloads it
//!    ([`transfer`])
//! 4. merges the archive into `<skins>/<theme>`, keeping a newer local
//!    `custom.styles` ([`archive`], [`merge`])
//!
//! # Modules
//!
//! - [`archive`]: zip entries as plain structs
//! - [`cli`]: flags, logging setup and the run pipeline
//! - [`config`]: the TOML configuration file
//! - [`core`]: error types, console error rendering and the fault log
//! - [`merge`]: selective extraction with path remapping
//! - [`package`]: theme package discovery and temporary downloads
//! - [`release`]: GitHub release and rate limit queries
//! - [`skins`]: Steam skins folder lookup
//! - [`transfer`]: HTTP downloads with progress reporting
//! - [`upgrade`]: the self-update sequence and relaunch scripts
//! - [`utils`]: progress bars
//! - [`version`]: dotted version parsing and ordering

// Core functionality modules
pub mod cli;
pub mod config;
pub mod core;

// Theme installation
pub mod archive;
pub mod merge;
pub mod package;
pub mod skins;

// Network and self-update
pub mod release;
pub mod transfer;
pub mod upgrade;

// Supporting modules
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
