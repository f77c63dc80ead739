//! Append-only log of unhandled faults.
//!
//! Recovered failures are reported through `tracing` and the console. Errors
//! that escape the run pipeline, and panics, are additionally appended to a
//! plain text file so they survive the console window closing.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use colored::Colorize;

/// File name used when no log file is configured.
pub const DEFAULT_LOG_FILE: &str = "skin-updater.log";

/// Writes timestamped fault reports to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultLog {
    path: PathBuf,
}

impl FaultLog {
    /// Creates a fault log writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// `skin-updater.log` next to the running executable, or in the working
    /// directory when the executable path is unavailable.
    #[must_use]
    pub fn beside_executable() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Self::new(dir.join(DEFAULT_LOG_FILE))
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or written.
    pub fn append(&self, details: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"), details.trim_end())?;
        writeln!(file)?;
        Ok(())
    }

    /// Appends one entry, reporting a write failure on the console instead of
    /// returning it.
    pub fn record(&self, details: &str) {
        if let Err(e) = self.append(details) {
            eprintln!(
                "{} could not write to log file {}: {}",
                "warning:".yellow().bold(),
                self.path.display(),
                e
            );
        }
    }

    /// Formats an error with its full cause chain and records it.
    pub fn record_error(&self, error: &anyhow::Error) {
        self.record(&format!("Unhandled error: {error:?}"));
    }
}

/// Installs a panic hook that records the panic in `log` before running the
/// previously installed hook.
pub fn install_panic_hook(log: FaultLog) {
    let log = Arc::new(log);
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic payload>".to_string());
        log.record(&format!("Panic at {location}: {payload}"));
        previous(info);
    }));
}
