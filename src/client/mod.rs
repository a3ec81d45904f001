//! GitHub API client and request dispatcher.

use crate::auth::AuthMethod;
use crate::config::{GitHubConfig, GitHubConfigBuilder, RateLimitConfig, RetryConfig};
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult, RateLimitInfo};
use crate::observability::{redact_header, Metrics, MetricsSnapshot, RequestTimer, TracingHooks};
use crate::pagination::Paginator;
use crate::request::{Params, Request, RequestOptions, Verb};
use crate::resilience::{RateLimitTracker, Resilience};
use crate::response::ApiResponse;
use crate::services::EventsService;
use chrono::DateTime;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// Media type sent unless a request overrides it.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github+json";

/// Body GitHub sends with non-2xx responses.
#[derive(Debug, serde::Deserialize)]
struct GitHubErrorResponse {
    message: String,
    documentation_url: Option<String>,
}

/// Async client for the GitHub REST API.
///
/// One instance owns a connection pool, a rate limit tracker and request
/// metrics. Endpoint services borrow it.
pub struct GitHubClient {
    http: Client,
    config: GitHubConfig,
    resilience: Resilience,
    metrics: Arc<Metrics>,
}

impl GitHubClient {
    /// Validates `config` and builds the HTTP transport.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .build()
            .map_err(|e| {
                GitHubError::new(
                    GitHubErrorKind::InvalidConfiguration,
                    format!("Failed to create HTTP client: {}", e),
                )
                .with_cause(e)
            })?;

        let metrics = Arc::new(Metrics::new());
        let resilience = Resilience::new(
            config.retry.clone(),
            config.rate_limit.clone(),
            metrics.clone(),
        );

        Ok(Self {
            http,
            config,
            resilience,
            metrics,
        })
    }

    /// Starts a builder with default settings.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Creates a client configured from environment variables.
    pub fn from_env() -> GitHubResult<Self> {
        Self::new(GitHubConfig::from_env()?)
    }

    /// REST root every path is joined to.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Gets a snapshot of request metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Gets the rate limit tracker.
    pub fn rate_limit(&self) -> &RateLimitTracker {
        self.resilience.rate_limit()
    }

    /// Gets the events service.
    pub fn events(&self) -> EventsService<'_> {
        EventsService::new(self)
    }

    // Verb helpers

    /// Makes a GET request; params go to the query string.
    pub async fn get(&self, path: &str, params: Params) -> GitHubResult<ApiResponse> {
        self.send(Request::new(Verb::Get, path).params(params)).await
    }

    /// Makes a POST request; params go to the JSON body.
    pub async fn post(&self, path: &str, params: Params) -> GitHubResult<ApiResponse> {
        self.send(Request::new(Verb::Post, path).params(params)).await
    }

    /// Makes a PUT request; params go to the JSON body.
    pub async fn put(&self, path: &str, params: Params) -> GitHubResult<ApiResponse> {
        self.send(Request::new(Verb::Put, path).params(params)).await
    }

    /// Makes a DELETE request; params go to the query string.
    pub async fn delete(&self, path: &str, params: Params) -> GitHubResult<ApiResponse> {
        self.send(Request::new(Verb::Delete, path).params(params)).await
    }

    /// Makes a PATCH request; params go to the JSON body.
    pub async fn patch(&self, path: &str, params: Params) -> GitHubResult<ApiResponse> {
        self.send(Request::new(Verb::Patch, path).params(params)).await
    }

    /// Dispatches a request by verb name.
    ///
    /// Fails with [`GitHubErrorKind::UnsupportedMethod`] unless `method` is one
    /// of `get`, `post`, `put`, `delete` or `patch`.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        params: Params,
        options: RequestOptions,
    ) -> GitHubResult<ApiResponse> {
        let request = Request::parse(method, path)?.params(params).options(options);
        self.send(request).await
    }

    /// Sends a prepared request.
    pub async fn send(&self, request: Request) -> GitHubResult<ApiResponse> {
        let options = request.get_options();
        if request.requires_token() && self.auth_for(options).is_none() {
            return Err(GitHubError::new(
                GitHubErrorKind::MissingAuth,
                format!("{} requires authentication", request.path()),
            ));
        }

        let url = self.build_url(request.path());
        self.execute(request.verb(), &url, request.query(), request.body(), options)
            .await
    }

    /// Walks every page of a list request lazily.
    pub fn paginate(&self, request: Request) -> Paginator<'_> {
        Paginator::new(self, request)
    }

    /// Follows an absolute URL taken from a `Link` header.
    pub(crate) async fn get_url(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> GitHubResult<ApiResponse> {
        self.check_same_origin(url)?;
        self.execute(Verb::Get, url, Vec::new(), None, options).await
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn auth_for<'a>(&'a self, options: &'a RequestOptions) -> Option<&'a AuthMethod> {
        options.auth.as_ref().or(self.config.auth.as_ref())
    }

    fn check_same_origin(&self, url: &str) -> GitHubResult<()> {
        let parse = |s: &str| {
            url::Url::parse(s)
                .map_err(|e| GitHubError::invalid_parameter(format!("Invalid URL {}: {}", s, e)))
        };
        let target = parse(url)?;
        let base = parse(&self.config.base_url)?;
        if target.origin() != base.origin() {
            return Err(GitHubError::invalid_parameter(format!(
                "Refusing to follow {} outside {}",
                url, self.config.base_url
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        verb: Verb,
        url: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> GitHubResult<ApiResponse> {
        let auth = self.auth_for(options);
        let auth_header = auth.map(AuthMethod::header_value);
        let accept = options.accept.as_deref().unwrap_or(DEFAULT_ACCEPT);

        let body_bytes = body
            .map(|b| serde_json::to_vec(&b))
            .transpose()
            .map_err(|e| {
                GitHubError::invalid_parameter(format!("Failed to serialize request body: {}", e))
            })?;

        TracingHooks::on_request_start(
            verb.as_str(),
            url,
            auth.map(AuthMethod::redacted).as_deref(),
        );
        for (name, value) in &options.headers {
            tracing::trace!(
                header = %name,
                value = %redact_header(name, value),
                "Extra request header"
            );
        }

        let timer = RequestTimer::start(&self.metrics);
        let result = self
            .resilience
            .execute(verb.as_str(), url, || {
                let mut request = self
                    .http
                    .request(verb.method(), url)
                    .header(USER_AGENT, &self.config.user_agent)
                    .header(ACCEPT, accept)
                    .header("X-GitHub-Api-Version", &self.config.api_version);

                if !query.is_empty() {
                    request = request.query(&query);
                }
                if let Some(ref value) = auth_header {
                    request = request.header(AUTHORIZATION, value);
                }
                for (name, value) in &options.headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                if let Some(ref bytes) = body_bytes {
                    request = request
                        .header(CONTENT_TYPE, "application/json")
                        .body(bytes.clone());
                }

                self.send_once(request)
            })
            .await;

        match &result {
            Ok(response) => {
                let elapsed = timer.success();
                let status = response.status().as_u16();
                TracingHooks::on_request_complete(verb.as_str(), url, status, elapsed);
            }
            Err(error) => {
                let elapsed = timer.failure();
                TracingHooks::on_request_error(verb.as_str(), url, error, elapsed);
            }
        }

        result
    }

    async fn send_once(&self, request: RequestBuilder) -> GitHubResult<ApiResponse> {
        let response = request.send().await.map_err(Self::map_transport_error)?;

        let rate_limit = Self::extract_rate_limit(response.headers());
        if let Some(ref info) = rate_limit {
            self.resilience.update_rate_limit(info).await;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(response, rate_limit).await);
        }

        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(Self::map_transport_error)?;
        let body = Self::parse_body(status, &bytes)?;

        Ok(ApiResponse::new(status, headers, rate_limit, body))
    }

    fn parse_body(status: StatusCode, bytes: &[u8]) -> GitHubResult<Value> {
        if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(bytes).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_status(status.as_u16())
                .with_cause(e)
        })
    }

    fn map_transport_error(e: reqwest::Error) -> GitHubError {
        let error = if e.is_timeout() {
            GitHubError::timeout(format!("Request timed out: {}", e))
        } else if e.is_connect() {
            GitHubError::new(
                GitHubErrorKind::ConnectionFailed,
                format!("Connection failed: {}", e),
            )
        } else if e.is_builder() {
            GitHubError::invalid_parameter(format!("Invalid request: {}", e))
        } else {
            GitHubError::new(GitHubErrorKind::Unknown, format!("Request failed: {}", e))
        };
        error.with_cause(e)
    }

    fn extract_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let limit = header("x-ratelimit-limit")?.parse().ok()?;
        let remaining = header("x-ratelimit-remaining")?.parse().ok()?;
        let reset_timestamp: i64 = header("x-ratelimit-reset")?.parse().ok()?;
        let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

        Some(RateLimitInfo {
            limit,
            remaining,
            reset_at,
            retry_after: Self::extract_retry_after(headers),
            resource: header("x-ratelimit-resource").map(String::from),
        })
    }

    fn extract_retry_after(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    async fn handle_error_response(
        response: reqwest::Response,
        rate_limit: Option<RateLimitInfo>,
    ) -> GitHubError {
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-github-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let retry_after = Self::extract_retry_after(response.headers());

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(ref info) = rate_limit {
                if info.remaining == 0 {
                    let mut error = GitHubError::rate_limit_exceeded(info.clone())
                        .with_status(status.as_u16());
                    if let Some(id) = request_id {
                        error = error.with_request_id(id);
                    }
                    if let Some(secs) = retry_after {
                        error = error.with_retry_after(secs);
                    }
                    return error;
                }
            }
        }

        let error_body = response.json::<GitHubErrorResponse>().await.ok();

        let message = error_body
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("HTTP {} error", status.as_u16()));
        let documentation_url = error_body.and_then(|e| e.documentation_url);

        let mut error = if status == StatusCode::FORBIDDEN
            && message.to_lowercase().contains("secondary rate limit")
        {
            GitHubError::new(GitHubErrorKind::SecondaryRateLimitExceeded, message)
                .with_status(status.as_u16())
        } else {
            GitHubError::from_response(status.as_u16(), message, None, None)
        };

        if let Some(url) = documentation_url {
            error = error.with_documentation_url(url);
        }
        if let Some(id) = request_id {
            error = error.with_request_id(id);
        }
        if let Some(info) = rate_limit {
            error = error.with_rate_limit(info);
        }
        if let Some(secs) = retry_after {
            error = error.with_retry_after(secs);
        }

        error
    }
}

/// Fluent construction of a [`GitHubClient`].
#[derive(Debug, Default)]
pub struct GitHubClientBuilder {
    config_builder: GitHubConfigBuilder,
}

impl GitHubClientBuilder {
    /// Defaults: github.com, anonymous, retries on.
    pub fn new() -> Self {
        Self::default()
    }

    /// REST root, e.g. a GitHub Enterprise `/api/v3` URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Credentials sent with every request.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth(auth);
        self
    }

    /// Authenticates with a token.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::token(token))
    }

    /// Authenticates with login and password.
    pub fn basic(self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth(AuthMethod::basic(login, password))
    }

    /// Whole-request deadline.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// `User-Agent` value.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the default user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user(user);
        self
    }

    /// Sets the default repository.
    pub fn repo(mut self, repo: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.repo(repo);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config_builder = self.config_builder.retry(config);
        self
    }

    /// Attempt every call once.
    pub fn no_retry(mut self) -> Self {
        self.config_builder = self.config_builder.no_retry();
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config_builder = self.config_builder.rate_limit(config);
        self
    }

    /// Validates the settings and creates the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        GitHubClient::new(self.config_builder.build()?)
    }
}
