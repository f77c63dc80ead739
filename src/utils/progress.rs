//! Download progress rendering
//!
//! [`DownloadProgress`] draws an `indicatif` bar for a single download and
//! plugs into the transfer client as a [`ProgressSink`]. When the total size
//! is unknown it shows a spinner with the byte count instead.
//!
//! # Environment Variables
//!
//! - `SKIN_UPDATER_NO_PROGRESS`: set to any value to hide all progress bars.
//!   The `--no-progress` flag sets it for the current process.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

use crate::transfer::{ProgressEvent, ProgressSink, TransferError};

/// Environment variable that disables progress bars.
pub const NO_PROGRESS_ENV: &str = "SKIN_UPDATER_NO_PROGRESS";

/// Checks if progress bars should be disabled.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress bar for one download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    inner: IndicatifBar,
}

impl DownloadProgress {
    /// Creates a bar labelled `prefix`, hidden when progress is disabled.
    pub fn new(prefix: impl Into<String>) -> Self {
        let inner = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(ProgressStyle::spinner());
            bar
        };
        inner.set_prefix(prefix.into());
        Self {
            inner,
        }
    }

    /// A bar that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Whether the bar is drawn.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    /// Current position in bytes.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Total length in bytes, once known.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.inner.length()
    }
}

impl ProgressSink for DownloadProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(total) = event.total_bytes {
            if self.inner.length() != Some(total) {
                self.inner.set_style(ProgressStyle::download());
                self.inner.set_length(total);
            }
        }
        self.inner.set_position(event.bytes_received);
    }

    fn on_complete(&self, result: Result<u64, &TransferError>) {
        match result {
            Ok(_) => self.inner.finish_and_clear(),
            Err(e) => self.inner.abandon_with_message(e.to_string()),
        }
    }
}

/// Progress styles shared by the updater's bars.
pub struct ProgressStyle;

impl ProgressStyle {
    /// Byte bar for downloads with a known size.
    ///
    /// ```text
    /// {prefix} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})
    /// ```
    pub fn download() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Spinner for downloads of unknown size.
    pub fn spinner() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes} {msg}")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }
}
