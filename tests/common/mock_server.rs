//! Mock server helpers
//!
//! wiremock endpoints mimicking the theme website and the GitHub API.

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve `body` at `route`.
pub async fn mock_file(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Answer `route` with `status` and no body.
pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve an HTML page at `route`.
pub async fn mock_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html).insert_header("content-type", "text/html"))
        .mount(server)
        .await;
}

/// GitHub `/rate_limit` with the given remaining count and reset epoch.
pub async fn mock_rate_limit(server: &MockServer, remaining: u32, reset: i64) {
    let body = serde_json::json!({
        "resources": {
            "core": { "limit": 60, "remaining": remaining, "reset": reset, "used": 60 - remaining },
            "search": { "limit": 10, "remaining": 10, "reset": reset, "used": 0 }
        },
        "rate": { "limit": 60, "remaining": remaining, "reset": reset, "used": 60 - remaining }
    });
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// GitHub release listing for `owner/repo`, expecting exactly `expected_calls`
/// requests.
pub async fn mock_releases(
    server: &MockServer,
    owner: &str,
    repo: &str,
    releases: serde_json::Value,
    expected_calls: u64,
) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{owner}/{repo}/releases")))
        .and(query_param("per_page", "1"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(releases))
        .expect(expected_calls)
        .mount(server)
        .await;
}
