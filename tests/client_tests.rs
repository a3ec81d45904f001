//! Request dispatch, authentication and error handling against a mock server.

mod common;

use common::*;
use github_api::config::RetryConfig;
use github_api::{basic_auth, token_auth, AuthMethod, GitHubErrorKind, Params, RequestOptions};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_unsupported_verb_never_reaches_server() {
    let server = setup_mock_server().await;
    let client = client_builder(&server).build().unwrap();

    for verb in ["head", "options", "trace", ""] {
        let err = client
            .request(verb, "/events", Params::new(), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::UnsupportedMethod);
    }

    let err = client
        .request("HEAD", "/events", Params::new(), RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.message(), "unknown http method: head");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_verb_names_are_case_insensitive() {
    let server = setup_mock_server().await;

    api_get("/users/octocat/events")
        .respond_with(success_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).build().unwrap();
    let response = client
        .request(" GET ", "/users/octocat/events", Params::new(), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/repos/octocat/hello/issues"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "title": "Found a bug", "labels": ["bug"] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 1347 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).token("ghp_test").build().unwrap();
    let response = client
        .post(
            "/repos/octocat/hello/issues",
            Params::new()
                .with("title", "Found a bug")
                .with("labels", json!(["bug"]))
                .with("milestone", serde_json::Value::Null),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(response.body()["number"], 1347);
}

#[tokio::test]
async fn test_delete_sends_query_and_handles_no_content() {
    let server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .and(path("/repos/octocat/hello/subscription"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).token("ghp_test").build().unwrap();
    let response = client
        .delete("/repos/octocat/hello/subscription", Params::new().with("force", true))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 204);
    assert!(response.body().is_null());
    assert_eq!(response.items().count(), 0);
}

#[tokio::test]
async fn test_per_request_auth_overrides_client_auth() {
    let server = setup_mock_server().await;

    api_get("/user/events")
        .and(header(
            "authorization",
            format!("Basic {}", basic_auth("octocat", "secret")).as_str(),
        ))
        .respond_with(success_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).token("ghp_default").build().unwrap();
    client
        .request(
            "get",
            "/user/events",
            Params::new(),
            RequestOptions::new().auth(AuthMethod::basic("octocat", "secret")),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_token_header_matches_helper() {
    let server = setup_mock_server().await;

    api_get("/user")
        .and(header("authorization", token_auth("ghp_abc").as_str()))
        .respond_with(success_response(json!({ "login": "octocat" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).token("ghp_abc").build().unwrap();
    let response = client.get("/user", Params::new()).await.unwrap();
    assert_eq!(response.body()["login"], "octocat");
    assert_eq!(response.len(), 1);
}

#[tokio::test]
async fn test_comment_paths_require_token() {
    let server = setup_mock_server().await;
    let client = client_builder(&server).build().unwrap();

    let err = client
        .get("/repos/octocat/hello/comments", Params::new())
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), GitHubErrorKind::MissingAuth);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_primary_rate_limit() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(
            error_response(403, "API rate limit exceeded")
                .insert_header("x-ratelimit-limit", "60")
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1")
                .insert_header("x-ratelimit-resource", "core"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).build().unwrap();
    let err = client.events().public(Params::new()).await.unwrap_err();

    assert_eq!(*err.kind(), GitHubErrorKind::PrimaryRateLimitExceeded);
    assert!(err.is_rate_limit());
    assert_eq!(err.rate_limit().unwrap().limit, 60);
    assert_eq!(client.rate_limit().remaining(), Some(0));
    assert_eq!(client.rate_limit().resource().await.as_deref(), Some("core"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(error_response(500, "Server Error"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    api_get("/events")
        .respond_with(success_response(json!([event("1", "PushEvent")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).build().unwrap();
    let response = client.events().public(Params::new()).await.unwrap();
    assert_eq!(response.len(), 1);

    let metrics = client.metrics();
    assert_eq!(metrics.requests, 1);
    assert_eq!(metrics.successes, 1);
    assert_eq!(metrics.retries, 1);
}

#[tokio::test]
async fn test_secondary_rate_limit_is_classified_and_retried() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(error_response(
            403,
            "You have exceeded a secondary rate limit. Please wait a few minutes.",
        ))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    api_get("/events")
        .respond_with(success_response(json!([event("1", "WatchEvent")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).build().unwrap();
    let response = client.events().public(Params::new()).await.unwrap();

    assert_eq!(response.len(), 1);
    assert_eq!(client.metrics().retries, 1);
}

#[tokio::test]
async fn test_secondary_rate_limit_error_kind() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(error_response(
            403,
            "You have exceeded a secondary rate limit. Please wait a few minutes.",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).no_retry().build().unwrap();
    let err = client.events().public(Params::new()).await.unwrap_err();

    assert_eq!(*err.kind(), GitHubErrorKind::SecondaryRateLimitExceeded);
    assert_eq!(err.status_code(), Some(403));
    assert!(err.is_rate_limit());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_too_many_requests_is_retried() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(error_response(429, "Too Many Requests"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    api_get("/events")
        .respond_with(success_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).build().unwrap();
    client.events().public(Params::new()).await.unwrap();

    assert_eq!(client.metrics().retries, 2);
}

#[tokio::test]
async fn test_retry_after_without_quota_headers_is_honoured() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(error_response(429, "Too Many Requests").insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    api_get("/events")
        .respond_with(success_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server)
        .retry(RetryConfig {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.0,
            enabled: true,
        })
        .build()
        .unwrap();

    let started = Instant::now();
    client.events().public(Params::new()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(client.metrics().retries, 1);
}

#[tokio::test]
async fn test_no_retry_fails_fast() {
    let server = setup_mock_server().await;

    api_get("/events")
        .respond_with(error_response(502, "Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).no_retry().build().unwrap();
    let err = client.events().public(Params::new()).await.unwrap_err();

    assert_eq!(*err.kind(), GitHubErrorKind::BadGateway);
    assert_eq!(client.metrics().failures, 1);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = setup_mock_server().await;

    Mock::given(method("PATCH"))
        .and(path("/repos/octocat/hello"))
        .respond_with(error_response(422, "Validation Failed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).token("ghp_test").build().unwrap();
    let err = client
        .patch("/repos/octocat/hello", Params::new().with("name", ""))
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), GitHubErrorKind::UnprocessableEntity);
    assert_eq!(err.status_code(), Some(422));
    assert_eq!(client.metrics().retries, 0);
}

#[tokio::test]
async fn test_extra_headers_and_accept_override() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("accept", "application/vnd.github.raw+json"))
        .and(header("x-trace", "abc"))
        .respond_with(success_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server).build().unwrap();
    client
        .request(
            "get",
            "/events",
            Params::new(),
            RequestOptions::new()
                .accept("application/vnd.github.raw+json")
                .header("X-Trace", "abc"),
        )
        .await
        .unwrap();
}
