//! Retry and rate-limit handling.

use crate::config::{RateLimitConfig, RetryConfig};
use crate::errors::{GitHubError, GitHubResult, RateLimitInfo};
use crate::observability::{Metrics, TracingHooks};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;

/// Retry executor with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn max_attempts(&self) -> u32 {
        if self.config.enabled {
            self.config.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. `on_retry` is called before each wait.
    pub async fn execute<F, Fut, T, R>(&self, mut operation: F, mut on_retry: R) -> GitHubResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GitHubResult<T>>,
        R: FnMut(u32, Duration, &GitHubError),
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(error);
            }

            let delay = match error.retry_after() {
                Some(secs) => Duration::from_secs(secs).min(self.config.max_backoff),
                None => self.calculate_backoff(attempt),
            };

            on_retry(attempt, delay, &error);
            sleep(delay).await;
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.initial_backoff.as_millis() as f64
            * self.config.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.config.max_backoff.as_millis() as f64);

        let jitter_range = capped * self.config.jitter.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

/// Tracks the quota reported in `x-ratelimit-*` headers.
#[derive(Debug)]
pub struct RateLimitTracker {
    limit: AtomicU32,
    remaining: AtomicU32,
    /// Unix timestamp; 0 until the first update.
    reset_at: AtomicI64,
    resource: RwLock<Option<String>>,
    config: RateLimitConfig,
}

impl RateLimitTracker {
    /// Creates a tracker that assumes full quota until told otherwise.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limit: AtomicU32::new(0),
            remaining: AtomicU32::new(u32::MAX),
            reset_at: AtomicI64::new(0),
            resource: RwLock::new(None),
            config,
        }
    }

    /// Records the latest snapshot.
    pub async fn update(&self, info: &RateLimitInfo) {
        self.limit.store(info.limit, Ordering::SeqCst);
        self.remaining.store(info.remaining, Ordering::SeqCst);
        self.reset_at.store(info.reset_at.timestamp(), Ordering::SeqCst);

        if let Some(ref resource) = info.resource {
            *self.resource.write().await = Some(resource.clone());
        }
    }

    /// Remaining requests, or `None` before any response was seen.
    pub fn remaining(&self) -> Option<u32> {
        match self.remaining.load(Ordering::SeqCst) {
            u32::MAX => None,
            n => Some(n),
        }
    }

    /// Limit of the current window, or `None` before any response was seen.
    pub fn limit(&self) -> Option<u32> {
        match self.limit.load(Ordering::SeqCst) {
            0 => None,
            n => Some(n),
        }
    }

    /// Reset time of the current window.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self.reset_at.load(Ordering::SeqCst) {
            0 => None,
            ts => DateTime::from_timestamp(ts, 0),
        }
    }

    /// Resource category of the last snapshot.
    pub async fn resource(&self) -> Option<String> {
        self.resource.read().await.clone()
    }

    /// Returns true once remaining quota drops under the configured buffer.
    pub fn is_low(&self) -> bool {
        match (self.limit(), self.remaining()) {
            (Some(limit), Some(remaining)) => {
                remaining as f64 <= limit as f64 * self.config.buffer_percentage
            }
            _ => false,
        }
    }

    /// Time to wait before the next request, if the quota is exhausted.
    pub fn wait_time(&self) -> Option<Duration> {
        if self.remaining() != Some(0) {
            return None;
        }
        let reset_at = self.reset_at()?;
        let now = Utc::now();
        (reset_at > now).then(|| (reset_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    fn snapshot(&self) -> Option<RateLimitInfo> {
        Some(RateLimitInfo {
            limit: self.limit()?,
            remaining: self.remaining()?,
            reset_at: self.reset_at()?,
            retry_after: None,
            resource: None,
        })
    }

    /// Sleeps until the window resets when the quota is exhausted.
    ///
    /// Fails instead of sleeping when the wait exceeds the configured maximum.
    pub async fn wait_if_needed(&self) -> GitHubResult<Option<Duration>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let Some(wait) = self.wait_time() else {
            return Ok(None);
        };

        if wait > self.config.max_wait {
            let info = self
                .snapshot()
                .ok_or_else(|| GitHubError::configuration("Rate limit state incomplete"))?;
            return Err(GitHubError::rate_limit_exceeded(info));
        }

        tracing::warn!(
            wait_secs = wait.as_secs(),
            "Rate limit exhausted, waiting for reset"
        );
        sleep(wait).await;
        Ok(Some(wait))
    }
}

/// Runs requests under rate-limit waits and retries.
#[derive(Debug)]
pub struct Resilience {
    retry: RetryExecutor,
    rate_limit: RateLimitTracker,
    metrics: Arc<Metrics>,
}

impl Resilience {
    /// Creates the orchestrator.
    pub fn new(retry: RetryConfig, rate_limit: RateLimitConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            retry: RetryExecutor::new(retry),
            rate_limit: RateLimitTracker::new(rate_limit),
            metrics,
        }
    }

    /// Gets the rate limit tracker.
    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// Executes an operation after any pending rate-limit wait, with retries.
    pub async fn execute<F, Fut, T>(&self, method: &str, url: &str, operation: F) -> GitHubResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GitHubResult<T>>,
    {
        if self.rate_limit.wait_if_needed().await?.is_some() {
            self.metrics.record_rate_limited();
        }

        self.retry
            .execute(operation, |attempt, delay, error| {
                self.metrics.record_retry();
                TracingHooks::on_retry(method, url, attempt, delay, error);
            })
            .await
    }

    /// Records a rate limit snapshot.
    pub async fn update_rate_limit(&self, info: &RateLimitInfo) {
        TracingHooks::on_rate_limit_update(info);
        self.rate_limit.update(info).await;
        if self.rate_limit.is_low() {
            TracingHooks::on_rate_limit_low(info);
        }
    }
}
