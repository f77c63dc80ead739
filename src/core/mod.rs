//! Core error handling and fault reporting.
//!
//! - [`UpdaterError`] - the failure categories of the run pipeline
//! - [`ErrorContext`] / [`user_friendly_error`] - console rendering of errors
//!   with details and suggestions
//! - [`FaultLog`] - append-only file for unhandled errors and panics

pub mod error;
pub mod fault_log;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};
pub use fault_log::{DEFAULT_LOG_FILE, FaultLog, install_panic_hook};
