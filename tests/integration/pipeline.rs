//! Complete runs with injected collaborators.

use std::path::{Path, PathBuf};

use skin_updater::cli::run::{EXIT_FAILURE, EXIT_OK, EXIT_REPLACING, Pipeline, RunContext, RunOutcome};
use skin_updater::config::{AppConfig, NetworkSettings};
use skin_updater::core::UpdaterError;
use skin_updater::package::PackageSource;
use skin_updater::test_utils::{
    FakeReleaseSource, RecordingLauncher, StaticResolver, ZipFixture, init_test_logging, release,
};
use skin_updater::transfer::TransferClient;
use skin_updater::upgrade::InstallTarget;
use tempfile::TempDir;
use wiremock::MockServer;

use crate::common::{mock_file, mock_status};

const THEME: &str = "Metro for Steam";

struct Setup {
    temp: TempDir,
    server: MockServer,
}

impl Setup {
    async fn new() -> Self {
        init_test_logging(None);
        let temp = TempDir::new().unwrap();
        for dir in ["skins", "downloads", "scripts", "bin"] {
            std::fs::create_dir(temp.path().join(dir)).unwrap();
        }
        Self {
            temp,
            server: MockServer::start().await,
        }
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    fn pipeline(
        &self,
        releases: FakeReleaseSource,
        launcher: RecordingLauncher,
    ) -> Pipeline<StaticResolver, FakeReleaseSource, RecordingLauncher> {
        let mut config = AppConfig::default();
        config.package = PackageSource::Direct {
            url: format!("{}/downloads/4.2.zip", self.server.uri()),
            version: None,
        };
        let context = RunContext {
            config,
            download_dir: self.dir("downloads"),
            script_dir: self.dir("scripts"),
        };
        Pipeline::new(
            context,
            StaticResolver(Some(self.dir("skins"))),
            releases,
            launcher,
            TransferClient::new(&NetworkSettings::default()).unwrap(),
            InstallTarget::new(self.dir("bin").join("skin-updater")),
        )
    }
}

fn is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn test_run_installs_theme() {
    let setup = Setup::new().await;
    let archive = ZipFixture::theme_release("Metro for Steam 4.2").to_bytes().unwrap();
    mock_file(&setup.server, "/downloads/4.2.zip", archive).await;

    let releases = FakeReleaseSource::new(None);
    let launcher = RecordingLauncher::new();
    let outcome = setup.pipeline(releases.clone(), launcher.clone()).run().await.unwrap();

    let RunOutcome::Completed(result) = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(result.files_extracted, 3);
    assert_eq!(result.folders_extracted, 2);
    assert_eq!(outcome.exit_code(), EXIT_OK);

    assert!(setup.dir("skins").join(THEME).join("steam.styles").is_file());
    assert!(is_empty(&setup.dir("downloads")), "temporary archive left behind");
    assert_eq!(releases.latest_release_calls(), 1);
    assert!(launcher.launched().is_empty());
}

#[tokio::test]
async fn test_run_twice_preserves_customisation() {
    let setup = Setup::new().await;
    let archive = ZipFixture::theme_release("Metro for Steam 4.2").to_bytes().unwrap();
    mock_file(&setup.server, "/downloads/4.2.zip", archive).await;

    let pipeline = setup.pipeline(FakeReleaseSource::new(None), RecordingLauncher::new());
    pipeline.run().await.unwrap();

    let custom = setup.dir("skins").join(THEME).join("custom.styles");
    std::fs::write(&custom, "user edits").unwrap();

    let outcome = pipeline.run().await.unwrap();
    let RunOutcome::Completed(result) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(result.skipped, 1);
    assert_eq!(std::fs::read_to_string(custom).unwrap(), "user edits");
}

#[tokio::test]
async fn test_failed_download_reports_failure() {
    let setup = Setup::new().await;
    mock_status(&setup.server, "/downloads/4.2.zip", 404).await;

    let outcome = setup.pipeline(FakeReleaseSource::new(None), RecordingLauncher::new()).run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Failed));
    assert_eq!(outcome.exit_code(), EXIT_FAILURE);
    assert!(is_empty(&setup.dir("downloads")));
    assert!(!setup.dir("skins").join(THEME).exists());
}

#[tokio::test]
async fn test_corrupt_package_reports_failure() {
    let setup = Setup::new().await;
    mock_file(&setup.server, "/downloads/4.2.zip", b"not a zip".to_vec()).await;

    let outcome = setup.pipeline(FakeReleaseSource::new(None), RecordingLauncher::new()).run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Failed));
    assert!(is_empty(&setup.dir("downloads")));
}

#[tokio::test]
async fn test_exhausted_rate_limit_still_installs_theme() {
    let setup = Setup::new().await;
    let archive = ZipFixture::theme_release("Metro for Steam 4.2").to_bytes().unwrap();
    mock_file(&setup.server, "/downloads/4.2.zip", archive).await;

    let releases = FakeReleaseSource::exhausted(30);
    let outcome = setup.pipeline(releases.clone(), RecordingLauncher::new()).run().await.unwrap();

    assert_eq!(outcome.exit_code(), EXIT_OK);
    assert_eq!(releases.latest_release_calls(), 0);
}

#[tokio::test]
async fn test_newer_release_replaces_updater() {
    let setup = Setup::new().await;
    mock_file(&setup.server, "/releases/skin-updater", b"new binary".to_vec()).await;

    let asset = format!("{}/releases/skin-updater", setup.server.uri());
    let releases = FakeReleaseSource::new(Some(release("v99.0.0", &[asset.as_str()])));
    let launcher = RecordingLauncher::new();

    let outcome = setup.pipeline(releases, launcher.clone()).run().await.unwrap();

    let RunOutcome::Replacing {
        version,
    } = &outcome
    else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(version.to_string(), "99.0.0");
    assert_eq!(outcome.exit_code(), EXIT_REPLACING);

    let new_binary = setup.dir("bin").join("skin-updater.new");
    assert_eq!(std::fs::read(new_binary).unwrap(), b"new binary");

    let launched = launcher.launched();
    assert_eq!(launched.len(), 1);
    assert!(launched[0].starts_with(setup.dir("scripts")));

    // The theme is not touched while the updater replaces itself.
    assert!(!setup.dir("skins").join(THEME).exists());
}

#[tokio::test]
async fn test_failed_relaunch_continues_with_theme() {
    let setup = Setup::new().await;
    mock_file(&setup.server, "/releases/skin-updater", b"new binary".to_vec()).await;
    let archive = ZipFixture::theme_release("Metro for Steam 4.2").to_bytes().unwrap();
    mock_file(&setup.server, "/downloads/4.2.zip", archive).await;

    let asset = format!("{}/releases/skin-updater", setup.server.uri());
    let releases = FakeReleaseSource::new(Some(release("v99.0.0", &[asset.as_str()])));

    let outcome = setup.pipeline(releases, RecordingLauncher::failing()).run().await.unwrap();
    assert_eq!(outcome.exit_code(), EXIT_OK);
}

#[tokio::test]
async fn test_missing_skins_folder_makes_no_requests() {
    let setup = Setup::new().await;
    std::fs::remove_dir(setup.dir("skins")).unwrap();

    let releases = FakeReleaseSource::new(None);
    let err = setup.pipeline(releases.clone(), RecordingLauncher::new()).run().await.unwrap_err();

    assert!(matches!(err.downcast_ref::<UpdaterError>(), Some(UpdaterError::PathNotFound { .. })));
    assert_eq!(releases.latest_release_calls(), 0);
    assert!(setup.server.received_requests().await.unwrap_or_default().is_empty());
}
