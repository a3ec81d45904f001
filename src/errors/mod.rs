//! The crate's single error type and its classification.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Shorthand used by every fallible call in the crate.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// What went wrong, independent of the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// A path that only works with credentials was called without any.
    MissingAuth,
    /// `base_url` is not an absolute http(s) URL.
    InvalidBaseUrl,
    /// Some other setting is unusable.
    InvalidConfiguration,

    /// Verb name other than get, post, put, delete or patch.
    UnsupportedMethod,
    /// No endpoint is registered under the requested name or alias.
    UnknownEndpoint,
    /// An argument has a value that cannot be sent.
    InvalidParameter,
    /// A required path argument was absent or blank.
    MissingParameter,

    /// 400.
    ValidationError,
    /// 401.
    BadCredentials,
    /// 403 that is not a rate limit.
    Forbidden,
    /// 404.
    NotFound,
    /// 409.
    Conflict,
    /// 410.
    Gone,
    /// 422.
    UnprocessableEntity,

    /// Hourly quota used up (`x-ratelimit-remaining: 0`).
    PrimaryRateLimitExceeded,
    /// Abuse detection or 429.
    SecondaryRateLimitExceeded,

    /// Could not open a connection.
    ConnectionFailed,
    /// Deadline elapsed.
    Timeout,

    /// 500.
    InternalError,
    /// 502.
    BadGateway,
    /// 503 or 504.
    ServiceUnavailable,

    /// A 2xx body was not valid JSON, or not of the requested shape.
    DeserializationError,

    /// Anything else.
    Unknown,
}

impl GitHubErrorKind {
    /// Stable snake_case name, used in `Display` and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAuth => "missing_auth",
            Self::InvalidBaseUrl => "invalid_base_url",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::UnsupportedMethod => "unsupported_method",
            Self::UnknownEndpoint => "unknown_endpoint",
            Self::InvalidParameter => "invalid_parameter",
            Self::MissingParameter => "missing_parameter",
            Self::ValidationError => "validation_error",
            Self::BadCredentials => "bad_credentials",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Gone => "gone",
            Self::UnprocessableEntity => "unprocessable_entity",
            Self::PrimaryRateLimitExceeded => "primary_rate_limit_exceeded",
            Self::SecondaryRateLimitExceeded => "secondary_rate_limit_exceeded",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::InternalError => "internal_error",
            Self::BadGateway => "bad_gateway",
            Self::ServiceUnavailable => "service_unavailable",
            Self::DeserializationError => "deserialization_error",
            Self::Unknown => "unknown",
        }
    }

    /// Kind for a non-2xx status when nothing more specific is known.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::ValidationError,
            401 => Self::BadCredentials,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            410 => Self::Gone,
            422 => Self::UnprocessableEntity,
            429 => Self::SecondaryRateLimitExceeded,
            500 => Self::InternalError,
            502 => Self::BadGateway,
            503 | 504 => Self::ServiceUnavailable,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota state parsed from `x-ratelimit-*` and `retry-after` headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the window rolls over.
    pub reset_at: DateTime<Utc>,
    /// Seconds the server asked us to back off, if it said.
    pub retry_after: Option<u64>,
    /// Quota bucket (`core`, `search`, ...).
    pub resource: Option<String>,
}

/// Error returned by every client operation.
///
/// Renders as `[kind] message (HTTP status) [request_id: id]`, omitting the
/// parts that are unknown.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    documentation_url: Option<String>,
    rate_limit: Option<RateLimitInfo>,
    retry_after: Option<u64>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        Ok(())
    }
}

impl GitHubError {
    /// Error of `kind` with no HTTP context attached.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            documentation_url: None,
            rate_limit: None,
            retry_after: None,
            cause: None,
        }
    }

    /// Attaches the response status.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Attaches `x-github-request-id`.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Attaches the `documentation_url` from the error body.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Attaches the quota state seen on the failing response.
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// Attaches the `Retry-After` delay, in seconds.
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    /// Attaches the lower-level error, exposed through `source()`.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Classification.
    pub fn kind(&self) -> &GitHubErrorKind {
        &self.kind
    }

    /// Human-readable message; for API errors, GitHub's own `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, for errors that came from a response.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// `x-github-request-id`, useful when contacting GitHub support.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Link to the relevant REST docs.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Quota state at the time of failure.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    /// Seconds to wait before trying again.
    ///
    /// Uses `Retry-After` when the server sent it, otherwise the time left
    /// until the quota window resets. `Retry-After` counts even on responses
    /// without quota headers.
    pub fn retry_after(&self) -> Option<u64> {
        if self.retry_after.is_some() {
            return self.retry_after;
        }
        let info = self.rate_limit.as_ref()?;
        info.retry_after.or_else(|| {
            let left = info.reset_at - Utc::now();
            (left > chrono::Duration::zero()).then(|| left.num_seconds() as u64)
        })
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        use GitHubErrorKind::*;
        matches!(
            self.kind,
            SecondaryRateLimitExceeded
                | ConnectionFailed
                | Timeout
                | InternalError
                | BadGateway
                | ServiceUnavailable
        )
    }

    /// Whether this is a primary or secondary rate limit.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self.kind,
            GitHubErrorKind::PrimaryRateLimitExceeded | GitHubErrorKind::SecondaryRateLimitExceeded
        )
    }

    /// Error for a non-2xx response, classified by status.
    pub fn from_response(
        status: u16,
        message: String,
        documentation_url: Option<String>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            documentation_url,
            request_id,
            ..Self::new(GitHubErrorKind::from_status(status), message).with_status(status)
        }
    }

    /// Unusable setting.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Verb outside get, post, put, delete and patch.
    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            GitHubErrorKind::UnsupportedMethod,
            format!("unknown http method: {}", method),
        )
    }

    /// Required argument `name` was absent or blank.
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            GitHubErrorKind::MissingParameter,
            format!("{} is required", name),
        )
    }

    /// Argument that cannot be sent as given.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidParameter, message)
    }

    /// Exhausted primary quota.
    pub fn rate_limit_exceeded(info: RateLimitInfo) -> Self {
        Self::new(
            GitHubErrorKind::PrimaryRateLimitExceeded,
            "Rate limit exceeded",
        )
        .with_status(403)
        .with_rate_limit(info)
    }

    /// Elapsed deadline.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Timeout, message)
    }

    /// Body that could not be decoded.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::DeserializationError, message)
    }
}
