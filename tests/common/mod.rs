//! Shared helpers for tests running against a WireMock server.

#![allow(dead_code)]

use github_api::config::RetryConfig;
use github_api::{GitHubClient, GitHubClientBuilder};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Starts a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Builder pointed at the mock server with millisecond retries.
pub fn client_builder(server: &MockServer) -> GitHubClientBuilder {
    GitHubClient::builder()
        .base_url(server.uri())
        .user_agent("github-api-tests/1.0")
        .retry(RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            multiplier: 2.0,
            jitter: 0.0,
            enabled: true,
        })
}

/// GET mock carrying the headers every request must send.
pub fn api_get(path_matcher: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(path_matcher))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .and(header("user-agent", "github-api-tests/1.0"))
}

/// Success response with a JSON body.
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Error response with a GitHub-style JSON body.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    }))
}

/// Minimal event payload.
pub fn event(id: &str, kind: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "type": kind,
        "actor": {
            "id": 1,
            "login": "octocat",
            "url": "https://api.github.com/users/octocat",
            "avatar_url": "https://avatars.githubusercontent.com/u/1?"
        },
        "repo": {
            "id": 1296269,
            "name": "octocat/Hello-World",
            "url": "https://api.github.com/repos/octocat/Hello-World"
        },
        "payload": {},
        "public": true,
        "created_at": "2024-01-01T00:00:00Z"
    })
}
