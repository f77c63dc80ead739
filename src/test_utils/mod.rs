//! Test utilities for the updater
//!
//! Shared by unit tests and the integration suite (through the `test-utils`
//! feature):
//! - [`init_test_logging`] - one-time tracing setup
//! - [`ZipFixture`] - builds real zip archives with controlled timestamps
//! - [`FakeReleaseSource`] - in-memory release registry that counts calls
//! - [`RecordingLauncher`] - script launcher that records instead of spawning
//! - [`StaticResolver`] - path resolver returning a fixed path

pub mod fixtures;

pub use fixtures::ZipFixture;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use chrono::{TimeDelta, Utc};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::release::{RateLimit, Release, ReleaseAsset, ReleaseError, ReleaseSource};
use crate::skins::PathResolver;
use crate::upgrade::{ScriptLaunchError, ScriptLauncher};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. Without either, tests run
/// silently.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Builds a release with one asset per URL.
pub fn release(tag: &str, asset_urls: &[&str]) -> Release {
    Release {
        tag_name: tag.to_string(),
        assets: asset_urls
            .iter()
            .map(|url| ReleaseAsset {
                name: url.rsplit('/').next().unwrap_or_default().to_string(),
                browser_download_url: (*url).to_string(),
            })
            .collect(),
    }
}

/// An in-memory [`ReleaseSource`].
///
/// Clones share the call counter, so a test can keep one handle and move
/// another into the code under test.
#[derive(Debug, Clone)]
pub struct FakeReleaseSource {
    rate_limit: RateLimit,
    release: Option<Release>,
    latest_release_calls: Arc<AtomicUsize>,
}

impl FakeReleaseSource {
    /// A source with a healthy quota serving `release`.
    pub fn new(release: Option<Release>) -> Self {
        Self {
            rate_limit: RateLimit {
                remaining: 60,
                reset_at: Utc::now() + TimeDelta::hours(1),
            },
            release,
            latest_release_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose quota is used up, resetting in `minutes`.
    pub fn exhausted(minutes: i64) -> Self {
        let mut source = Self::new(None);
        source.rate_limit = RateLimit {
            remaining: 0,
            reset_at: Utc::now() + TimeDelta::minutes(minutes),
        };
        source
    }

    /// How often [`ReleaseSource::get_latest_release`] was called.
    pub fn latest_release_calls(&self) -> usize {
        self.latest_release_calls.load(Ordering::SeqCst)
    }
}

impl ReleaseSource for FakeReleaseSource {
    async fn get_rate_limit(&self) -> Result<RateLimit, ReleaseError> {
        Ok(self.rate_limit)
    }

    async fn get_latest_release(&self, _owner: &str, _repo: &str) -> Result<Option<Release>, ReleaseError> {
        self.latest_release_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.release.clone())
    }
}

/// A [`ScriptLauncher`] that records scripts instead of running them.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launched: Arc<Mutex<Vec<PathBuf>>>,
    fail: bool,
}

impl RecordingLauncher {
    /// A launcher that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher that always fails to spawn.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Scripts launched so far.
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ScriptLauncher for RecordingLauncher {
    fn launch(&self, script: &Path) -> Result<(), ScriptLaunchError> {
        if self.fail {
            return Err(ScriptLaunchError::Spawn {
                script: script.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "spawn refused"),
            });
        }
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(script.to_path_buf());
        }
        Ok(())
    }
}

/// A [`PathResolver`] returning a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver(pub Option<PathBuf>);

impl PathResolver for StaticResolver {
    fn skins_path(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}
