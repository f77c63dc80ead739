//! Locating the Steam skins folder.
//!
//! [`SteamSkinsResolver`] returns the configured override when there is one,
//! otherwise the first standard Steam install location whose `skins` folder
//! exists. The run pipeline checks the returned path and stops with
//! `PathNotFound` before any network access if it is missing.

use std::path::PathBuf;

use tracing::debug;

/// Finds the directory themes are installed into.
pub trait PathResolver: Send + Sync {
    /// The skins directory, or the best guess when none exists.
    ///
    /// `None` means no location could be determined at all.
    fn skins_path(&self) -> Option<PathBuf>;
}

/// Default resolver for Steam installations.
#[derive(Debug, Clone, Default)]
pub struct SteamSkinsResolver {
    override_path: Option<PathBuf>,
}

impl SteamSkinsResolver {
    /// Creates a resolver. `override_path` wins over every standard location.
    #[must_use]
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
        }
    }

    /// Standard `skins` locations for the current platform, most likely first.
    #[must_use]
    pub fn candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        #[cfg(windows)]
        {
            for var in ["ProgramFiles(x86)", "ProgramFiles"] {
                if let Some(dir) = std::env::var_os(var) {
                    candidates.push(PathBuf::from(dir).join("Steam").join("skins"));
                }
            }
        }

        #[cfg(target_os = "macos")]
        {
            if let Some(data) = dirs::data_dir() {
                candidates.push(data.join("Steam/Steam.AppBundle/Steam/Contents/MacOS/skins"));
            }
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join(".steam/steam/skins"));
            }
            if let Some(data) = dirs::data_dir() {
                candidates.push(data.join("Steam/skins"));
            }
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam/skins"));
            }
        }

        candidates
    }
}

impl PathResolver for SteamSkinsResolver {
    fn skins_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            debug!("Using configured skins path {}", path.display());
            return Some(path.clone());
        }

        let candidates = Self::candidates();
        let found = candidates.iter().find(|path| path.is_dir()).cloned();
        match found {
            Some(path) => {
                debug!("Found Steam skins folder at {}", path.display());
                Some(path)
            }
            None => candidates.into_iter().next(),
        }
    }
}
