//! Request counters and the `tracing` events the client emits.

use crate::errors::{GitHubError, RateLimitInfo};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
enum Counter {
    Requests,
    Successes,
    Failures,
    Retries,
    RateLimitWaits,
}

/// Lock-free counters shared by every call made through one client.
#[derive(Debug, Default)]
pub struct Metrics {
    counters: [AtomicU64; 5],
    latency_us: AtomicU64,
}

impl Metrics {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self, counter: Counter) {
        self.counters[counter as usize].fetch_add(1, Ordering::Relaxed);
    }

    fn read(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    /// Counts a retry.
    pub fn record_retry(&self) {
        self.bump(Counter::Retries);
    }

    /// Counts a call that slept until the quota reset.
    pub fn record_rate_limited(&self) {
        self.bump(Counter::RateLimitWaits);
    }

    fn finish(&self, outcome: Counter, elapsed: Duration) {
        self.bump(outcome);
        self.latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let finished = self.read(Counter::Successes) + self.read(Counter::Failures);
        let mean_us = self
            .latency_us
            .load(Ordering::Relaxed)
            .checked_div(finished)
            .unwrap_or(0);

        MetricsSnapshot {
            requests: self.read(Counter::Requests),
            successes: self.read(Counter::Successes),
            failures: self.read(Counter::Failures),
            retries: self.read(Counter::Retries),
            rate_limit_waits: self.read(Counter::RateLimitWaits),
            mean_latency: Duration::from_micros(mean_us),
        }
    }
}

/// Counter values returned by [`GitHubClient::metrics`](crate::GitHubClient::metrics).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Logical calls started; retries do not add to this.
    pub requests: u64,
    /// Calls that returned a response.
    pub successes: u64,
    /// Calls that returned an error.
    pub failures: u64,
    /// Extra attempts made after transient failures.
    pub retries: u64,
    /// Calls that slept until the quota reset.
    pub rate_limit_waits: u64,
    /// Mean wall time of finished calls, retries included.
    pub mean_latency: Duration,
}

/// Times one logical call and records its outcome.
pub struct RequestTimer<'a> {
    started: Instant,
    metrics: &'a Metrics,
}

impl<'a> RequestTimer<'a> {
    /// Counts the call and starts the clock.
    pub fn start(metrics: &'a Metrics) -> Self {
        metrics.bump(Counter::Requests);
        Self {
            started: Instant::now(),
            metrics,
        }
    }

    /// Records a success and returns the elapsed time.
    pub fn success(self) -> Duration {
        self.stop(Counter::Successes)
    }

    /// Records a failure and returns the elapsed time.
    pub fn failure(self) -> Duration {
        self.stop(Counter::Failures)
    }

    fn stop(self, outcome: Counter) -> Duration {
        let elapsed = self.started.elapsed();
        self.metrics.finish(outcome, elapsed);
        elapsed
    }
}

/// Structured events for the request lifecycle.
///
/// Credentials only ever appear in their redacted form.
pub struct TracingHooks;

impl TracingHooks {
    /// Before the first attempt.
    pub fn on_request_start(method: &str, url: &str, auth: Option<&str>) {
        debug!(%method, %url, auth = auth.unwrap_or("anonymous"), "Sending request");
    }

    /// After a successful response.
    pub fn on_request_complete(method: &str, url: &str, status: u16, elapsed: Duration) {
        info!(
            %method,
            %url,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request succeeded"
        );
    }

    /// After the last attempt failed.
    pub fn on_request_error(method: &str, url: &str, error: &GitHubError, elapsed: Duration) {
        warn!(
            %method,
            %url,
            kind = %error.kind(),
            status = error.status_code(),
            request_id = error.request_id(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request failed: {}",
            error.message()
        );
    }

    /// Before sleeping ahead of another attempt.
    pub fn on_retry(method: &str, url: &str, attempt: u32, delay: Duration, error: &GitHubError) {
        warn!(
            %method,
            %url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            kind = %error.kind(),
            "Transient failure, retrying"
        );
    }

    /// On every response carrying quota headers.
    pub fn on_rate_limit_update(info: &RateLimitInfo) {
        debug!(
            resource = info.resource.as_deref().unwrap_or("core"),
            remaining = info.remaining,
            limit = info.limit,
            reset_at = %info.reset_at,
            "Quota"
        );
    }

    /// When the remaining quota falls under the configured buffer.
    pub fn on_rate_limit_low(info: &RateLimitInfo) {
        warn!(
            resource = info.resource.as_deref().unwrap_or("core"),
            remaining = info.remaining,
            limit = info.limit,
            reset_at = %info.reset_at,
            "Quota running low"
        );
    }
}

/// Header names whose values are masked in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-github-token",
    "cookie",
    "set-cookie",
];

/// Returns `value`, masked when `name` is a credential header.
pub fn redact_header(name: &str, value: &str) -> String {
    let sensitive = SENSITIVE_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name.trim()));
    if sensitive {
        "[REDACTED]".into()
    } else {
        value.into()
    }
}
