//! HTTP transfers with progress reporting.
//!
//! [`TransferClient`] wraps a `reqwest` client configured for the updater:
//! a fixed `User-Agent` (GitHub rejects anonymous agents), no ambient proxy,
//! and an optional connect timeout. Downloads are streamed chunk by chunk so
//! progress can be reported to a [`ProgressSink`] without buffering the whole
//! body.
//!
//! Rendering is not this module's concern. The CLI plugs an `indicatif` bar
//! in through [`ProgressSink`]; tests plug in a recorder or [`NoProgress`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use skin_updater::config::NetworkSettings;
//! use skin_updater::transfer::{NoProgress, TransferClient};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = TransferClient::new(&NetworkSettings::default())?;
//! let bytes = client
//!     .download_to_file("https://example.com/latest.zip", Path::new("/tmp/latest.zip"), &NoProgress)
//!     .await?;
//! println!("downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::NetworkSettings;

/// Errors raised by [`TransferClient`].
#[derive(Debug, Error)]
pub enum TransferError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connecting, sending the request or reading the body failed.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// Status returned by the server
        status: StatusCode,
    },

    /// The destination file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A progress notification for an in-flight download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes written so far.
    pub bytes_received: u64,
    /// Expected length from `Content-Length`, if the server sent one.
    pub total_bytes: Option<u64>,
}

impl ProgressEvent {
    /// Percentage complete, derived from the byte counts.
    ///
    /// Returns `None` when the total is unknown or zero; callers should show an
    /// indeterminate indicator in that case.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some(self.bytes_received as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

/// Receives progress and completion notifications from a download.
pub trait ProgressSink: Send + Sync {
    /// Called after each chunk has been written.
    fn on_progress(&self, event: &ProgressEvent);

    /// Called once when the download finishes, successfully or not.
    fn on_complete(&self, result: Result<u64, &TransferError>) {
        let _ = result;
    }
}

/// A sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// HTTP client used for package, release and binary downloads.
#[derive(Debug, Clone)]
pub struct TransferClient {
    client: reqwest::Client,
}

impl TransferClient {
    /// Builds a client from the network settings.
    ///
    /// The ambient proxy configuration (`HTTP_PROXY` and friends) is always
    /// ignored.
    pub fn new(network: &NetworkSettings) -> Result<Self, TransferError> {
        let mut builder = reqwest::Client::builder().no_proxy().user_agent(&network.user_agent);
        if let Some(secs) = network.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(TransferError::Client)?;
        Ok(Self {
            client,
        })
    }

    /// The underlying `reqwest` client, shared with the release source.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Streams `url` into `dest`, replacing any existing file.
    ///
    /// Returns the number of bytes written. The sink receives one
    /// [`ProgressEvent`] per chunk and a final [`ProgressSink::on_complete`].
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64, TransferError> {
        debug!("Downloading {} to {}", url, dest.display());
        let result = self.stream_to_file(url, dest, sink).await;
        match &result {
            Ok(bytes) => {
                debug!("Downloaded {} bytes from {}", bytes, url);
                sink.on_complete(Ok(*bytes));
            }
            Err(e) => {
                warn!("Download of {} failed: {}", url, e);
                sink.on_complete(Err(e));
            }
        }
        result
    }

    /// Fetches `url` and returns the body as text.
    pub async fn download_to_string(&self, url: &str) -> Result<String, TransferError> {
        debug!("Fetching {}", url);
        let response = self.get(url).await?;
        response.text().await.map_err(|source| TransferError::Request {
            url: url.to_string(),
            source,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, TransferError> {
        let response =
            self.client.get(url).send().await.map_err(|source| TransferError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64, TransferError> {
        let response = self.get(url).await?;
        let total_bytes = response.content_length();

        let write_err = |source| TransferError::Write {
            path: dest.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(dest).await.map_err(write_err)?;
        let mut stream = response.bytes_stream();
        let mut bytes_received = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| TransferError::Request {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(write_err)?;
            bytes_received += chunk.len() as u64;
            sink.on_progress(&ProgressEvent {
                bytes_received,
                total_bytes,
            });
        }

        file.flush().await.map_err(write_err)?;
        Ok(bytes_received)
    }
}

/// Final non-empty path segment of `url`, used to name downloaded files.
#[must_use]
pub fn file_name_from_url(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
}
