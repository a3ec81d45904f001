//! Client settings: endpoint location, credentials, path defaults, timeouts,
//! retry and rate-limit policy.

use crate::auth::AuthMethod;
use crate::errors::{GitHubError, GitHubErrorKind};
use std::time::Duration;

/// Public github.com REST root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Value sent in `X-GitHub-Api-Version`.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Whole-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP/TLS connect deadline.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub rejects requests without a `User-Agent`.
pub const DEFAULT_USER_AGENT: &str = concat!("github-api-rs/", env!("CARGO_PKG_VERSION"));

/// How transient failures are retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per call, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay, `Retry-After` included.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Random spread applied to each delay, as a fraction of it.
    pub jitter: f64,
    /// When false every call is attempted once.
    pub enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
            enabled: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// How the `x-ratelimit-*` quota is honoured.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Remaining share of the quota below which a warning is logged (0.0 to 1.0).
    pub buffer_percentage: f64,
    /// Longest the client will sleep waiting for an exhausted quota to reset.
    /// Longer waits fail immediately with a rate limit error.
    pub max_wait: Duration,
    /// When false the quota is neither tracked nor waited on.
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            buffer_percentage: 0.1,
            max_wait: Duration::from_secs(60 * 60),
            enabled: true,
        }
    }
}

/// Keep-alive settings handed to the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle sockets kept open per host.
    pub max_idle_per_host: usize,
    /// How long an idle socket is kept.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Everything a [`GitHubClient`](crate::GitHubClient) needs to talk to the API.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST root, e.g. `https://ghe.example.com/api/v3` for Enterprise.
    pub base_url: String,
    /// Sent as `X-GitHub-Api-Version`.
    pub api_version: String,
    /// Credentials. Public endpoints work without any.
    pub auth: Option<AuthMethod>,
    /// Whole-request deadline.
    pub timeout: Duration,
    /// Connect deadline.
    pub connect_timeout: Duration,
    /// Sent as `User-Agent`; must not be empty.
    pub user_agent: String,
    /// Owner used when a repository-scoped call names none.
    pub user: Option<String>,
    /// Repository used when a repository-scoped call names none.
    pub repo: Option<String>,
    /// Retry policy.
    pub retry: RetryConfig,
    /// Rate limit policy.
    pub rate_limit: RateLimitConfig,
    /// Connection pool settings.
    pub pool: PoolConfig,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_version: DEFAULT_API_VERSION.into(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.into(),
            user: None,
            repo: None,
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl GitHubConfig {
    /// Starts from the defaults.
    pub fn builder() -> GitHubConfigBuilder {
        GitHubConfigBuilder::new()
    }

    /// Reads settings from the process environment.
    ///
    /// Recognized variables are `GITHUB_API_URL`, `GITHUB_TOKEN`,
    /// `GITHUB_LOGIN` with `GITHUB_PASSWORD`, `GITHUB_USER` and `GITHUB_REPO`.
    /// A token wins over a login/password pair. Blank values count as unset.
    pub fn from_env() -> Result<Self, GitHubError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, GitHubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(url) = var("GITHUB_API_URL") {
            builder = builder.base_url(url);
        }
        let credentials = (var("GITHUB_TOKEN"), var("GITHUB_LOGIN"), var("GITHUB_PASSWORD"));
        builder.config.auth = match credentials {
            (Some(token), _, _) => Some(AuthMethod::token(token)),
            (None, Some(login), Some(password)) => Some(AuthMethod::basic(login, password)),
            _ => None,
        };
        builder.config.user = var("GITHUB_USER");
        builder.config.repo = var("GITHUB_REPO");
        builder.build()
    }

    /// Checks the settings a request cannot succeed without.
    pub fn validate(&self) -> Result<(), GitHubError> {
        let base = url::Url::parse(&self.base_url).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::InvalidBaseUrl,
                format!("Invalid base URL {:?}: {}", self.base_url, e),
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(GitHubError::new(
                GitHubErrorKind::InvalidBaseUrl,
                format!("Base URL scheme must be http or https, got {}", base.scheme()),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(GitHubError::configuration("GitHub requires a non-empty User-Agent"));
        }

        let buffer = self.rate_limit.buffer_percentage;
        if !(0.0..=1.0).contains(&buffer) {
            return Err(GitHubError::configuration(format!(
                "Rate limit buffer must lie in 0.0..=1.0, got {}",
                buffer
            )));
        }

        Ok(())
    }
}

/// Fluent construction of a [`GitHubConfig`], validated on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct GitHubConfigBuilder {
    config: GitHubConfig,
}

impl GitHubConfigBuilder {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// REST root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// `X-GitHub-Api-Version` value.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Credentials sent with every request.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Whole-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Connect deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// `User-Agent` value.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Owner used when a call names none.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = Some(user.into());
        self
    }

    /// Repository used when a call names none.
    pub fn repo(mut self, repo: impl Into<String>) -> Self {
        self.config.repo = Some(repo.into());
        self
    }

    /// Retry policy.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config.retry = config;
        self
    }

    /// Attempt every call once.
    pub fn no_retry(self) -> Self {
        self.retry(RetryConfig::disabled())
    }

    /// Rate limit policy.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Connection pool settings.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.config.pool = config;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<GitHubConfig, GitHubError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use test_case::test_case;

    #[test]
    fn test_defaults_are_anonymous_and_valid() {
        let config = GitHubConfig::builder().build().unwrap();
        assert_eq!(config.base_url, "https://api.github.com");
        assert_eq!(config.api_version, "2022-11-28");
        assert!(config.auth.is_none());
        assert!(config.user.is_none() && config.repo.is_none());
        assert!(config.user_agent.starts_with("github-api-rs/"));
    }

    #[test]
    fn test_builder_sets_path_defaults() {
        let config = GitHubConfig::builder()
            .base_url("https://ghe.example.com/api/v3")
            .user_agent("events-sync/2.0")
            .timeout(Duration::from_secs(5))
            .user("octocat")
            .repo("hello-world")
            .no_retry()
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.user_agent, "events-sync/2.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user.as_deref(), Some("octocat"));
        assert_eq!(config.repo.as_deref(), Some("hello-world"));
        assert!(!config.retry.enabled);
    }

    #[test_case("" ; "empty")]
    #[test_case("api.github.com" ; "no scheme")]
    #[test_case("ftp://api.github.com" ; "wrong scheme")]
    fn test_rejects_base_url(url: &str) {
        let err = GitHubConfig::builder().base_url(url).build().unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::InvalidBaseUrl);
    }

    #[test]
    fn test_rejects_blank_user_agent() {
        let err = GitHubConfig::builder().user_agent("  ").build().unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_rejects_buffer_out_of_range() {
        let err = GitHubConfig::builder()
            .rate_limit(RateLimitConfig {
                buffer_percentage: 1.5,
                ..RateLimitConfig::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_from_lookup_prefers_token() {
        let vars: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", "ghp_abc"),
            ("GITHUB_LOGIN", "octocat"),
            ("GITHUB_PASSWORD", "secret"),
            ("GITHUB_USER", "rails"),
            ("GITHUB_REPO", "rails"),
        ]
        .into_iter()
        .collect();

        let config = GitHubConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert!(matches!(config.auth, Some(AuthMethod::Token(_))));
        assert_eq!(config.user.as_deref(), Some("rails"));
        assert_eq!(config.repo.as_deref(), Some("rails"));
    }

    #[test]
    fn test_from_lookup_basic_and_blank_values() {
        let vars: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", "  "),
            ("GITHUB_LOGIN", "octocat"),
            ("GITHUB_PASSWORD", "secret"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
        ]
        .into_iter()
        .collect();

        let config = GitHubConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert!(matches!(config.auth, Some(AuthMethod::Basic { .. })));
        assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
    }
}
