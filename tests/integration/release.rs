//! The GitHub release source against a mock API.

use chrono::Utc;
use serial_test::serial;
use skin_updater::config::{GITHUB_TOKEN_ENV, GitHubSettings, NetworkSettings, TOKEN_ENV};
use skin_updater::release::{GitHubReleaseSource, ReleaseError, ReleaseSource};
use skin_updater::transfer::{TransferClient, TransferError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{mock_rate_limit, mock_releases, mock_status};

fn source(server: &MockServer, token: Option<&str>) -> GitHubReleaseSource {
    let transfer = TransferClient::new(&NetworkSettings::default()).unwrap();
    let settings = GitHubSettings {
        api_url: format!("{}/", server.uri()),
        token: token.map(ToString::to_string),
    };
    GitHubReleaseSource::new(&transfer, &settings)
}

#[tokio::test]
async fn test_rate_limit_reads_core_resource() {
    let server = MockServer::start().await;
    let reset = Utc::now().timestamp() + 600;
    mock_rate_limit(&server, 42, reset).await;

    let limit = source(&server, None).get_rate_limit().await.unwrap();
    assert_eq!(limit.remaining, 42);
    assert_eq!(limit.reset_at.timestamp(), reset);
    assert!(!limit.is_exhausted());
}

#[tokio::test]
async fn test_exhausted_rate_limit() {
    let server = MockServer::start().await;
    mock_rate_limit(&server, 0, Utc::now().timestamp() + 1800).await;

    let limit = source(&server, None).get_rate_limit().await.unwrap();
    assert!(limit.is_exhausted());
    assert!(limit.resets_in(Utc::now()).num_minutes() >= 29);
}

#[tokio::test]
async fn test_latest_release_takes_first_entry() {
    let server = MockServer::start().await;
    let releases = serde_json::json!([
        {
            "tag_name": "v1.3.0",
            "name": "1.3.0",
            "assets": [
                {"name": "MetroForSteamAutoUpdater.exe", "browser_download_url": "https://example.com/a.exe"},
                {"name": "MetroForSteamAutoUpdater.pdb", "browser_download_url": "https://example.com/a.pdb"}
            ]
        }
    ]);
    mock_releases(&server, "Hertizch", "MetroForSteamAutoUpdater", releases, 1).await;

    let release = source(&server, None)
        .get_latest_release("Hertizch", "MetroForSteamAutoUpdater")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(release.tag_name, "v1.3.0");
    assert_eq!(release.assets.len(), 2);
    assert_eq!(release.primary_asset().unwrap().browser_download_url, "https://example.com/a.exe");
}

#[tokio::test]
async fn test_empty_release_list() {
    let server = MockServer::start().await;
    mock_releases(&server, "owner", "repo", serde_json::json!([]), 1).await;

    let release = source(&server, None).get_latest_release("owner", "repo").await.unwrap();
    assert!(release.is_none());
}

#[tokio::test]
async fn test_missing_repository_is_none() {
    let server = MockServer::start().await;
    mock_status(&server, "/repos/owner/gone/releases", 404).await;

    let release = source(&server, None).get_latest_release("owner", "gone").await.unwrap();
    assert!(release.is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    mock_status(&server, "/rate_limit", 500).await;

    let err = source(&server, None).get_rate_limit().await.unwrap_err();
    assert!(matches!(err, ReleaseError::Transfer(TransferError::Status { .. })));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = source(&server, None).get_rate_limit().await.unwrap_err();
    assert!(matches!(err, ReleaseError::Decode { .. }));
}

#[tokio::test]
#[serial]
async fn test_token_sent_as_bearer() {
    unsafe {
        std::env::remove_var(TOKEN_ENV);
        std::env::remove_var(GITHUB_TOKEN_ENV);
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/owner/repo/releases"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"tag_name": "v2.0"}])))
        .expect(1)
        .mount(&server)
        .await;

    let release = source(&server, Some("secret-token")).get_latest_release("owner", "repo").await.unwrap();
    assert_eq!(release.unwrap().tag_name, "v2.0");
}
