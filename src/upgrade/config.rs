use serde::{Deserialize, Serialize};

/// Configuration settings for the self-update check.
///
/// `UpgradeConfig` tells the orchestrator which GitHub repository publishes
/// the updater's own releases and how the relaunch script should pace itself.
///
/// # Default Behavior
///
/// - Self-update checks run on every start
/// - Releases come from `Hertizch/MetroForSteamAutoUpdater`
/// - The relaunch script waits 2 seconds between steps
///
/// # TOML Example
///
/// ```toml
/// [upgrade]
/// enabled = true
/// repo_owner = "Hertizch"
/// repo_name = "MetroForSteamAutoUpdater"
/// relaunch_delay_secs = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Whether to check for a newer updater release at startup.
    ///
    /// The `--skip-self-update` flag overrides this for a single run.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Owner of the repository publishing updater releases.
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    /// Name of the repository publishing updater releases.
    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Seconds the relaunch script waits between delete, rename and launch.
    ///
    /// The first delay gives the current process time to exit and release
    /// its executable.
    #[serde(default = "default_relaunch_delay_secs")]
    pub relaunch_delay_secs: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            relaunch_delay_secs: default_relaunch_delay_secs(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_repo_owner() -> String {
    "Hertizch".to_string()
}

fn default_repo_name() -> String {
    "MetroForSteamAutoUpdater".to_string()
}

fn default_relaunch_delay_secs() -> u64 {
    2
}
