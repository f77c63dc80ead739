//! Console utilities shared by the CLI.
//!
//! - [`progress`]: `indicatif` download bars implementing the transfer
//!   progress sink

pub mod progress;

pub use progress::{DownloadProgress, NO_PROGRESS_ENV, ProgressStyle, is_progress_disabled};
