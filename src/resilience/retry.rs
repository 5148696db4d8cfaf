//! Retry engine: bounded attempts, exponential backoff with jitter, per-attempt
//! timeout, and a predicate deciding which failures are worth another try.
//!
//! The per-attempt timeout drops the local future when it fires; any remote work
//! already started (an HTTP request the provider is processing) keeps running.

use crate::network::NetworkMonitor;
use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;
pub type RetryObserver = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Passed to the retry observer before each backoff sleep.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    pub error: &'a Error,
    pub delay: Duration,
}

/// Configuration for one retried call site. Immutable once an attempt sequence starts.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
    pub timeout: Duration,
    pub retry_predicate: RetryPredicate,
    pub on_retry: Option<RetryObserver>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("jitter", &self.jitter)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 1s base, 30s cap.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
            timeout: Duration::from_secs(30),
            retry_predicate: Arc::new(default_retry_predicate),
            on_retry: None,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggressive preset for connectivity-sensitive calls: 5 attempts, 2s base, 16s cap.
    pub fn network() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(16),
            timeout: Duration::from_secs(15),
            ..Self::default()
        }
    }

    /// Preset for LLM provider calls: 4 attempts, 2s base, 20s cap, and retries on
    /// rate-limit and server-error messages in addition to the default rules.
    pub fn provider() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(20),
            timeout: Duration::from_secs(60),
            retry_predicate: Arc::new(provider_retry_predicate),
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn with_base_delay(mut self, d: Duration) -> Self {
        self.base_delay = d;
        self
    }

    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Delay before attempt `attempt + 1`, without jitter:
    /// `min(base * factor^(attempt-1), max)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.base_delay.as_millis() as f64;
        let cap_ms = self.max_delay.as_millis() as f64;
        let raw = base_ms * self.backoff_factor.powi(exp);
        let ms = if raw.is_finite() { raw.min(cap_ms) } else { cap_ms };
        Duration::from_millis(ms.max(0.0) as u64)
    }

    /// Backoff delay with ±10% uniform jitter applied when enabled, floored at zero.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        if self.jitter {
            apply_jitter(delay, &mut rand::thread_rng())
        } else {
            delay
        }
    }
}

pub(crate) fn apply_jitter<R: Rng + ?Sized>(delay: Duration, rng: &mut R) -> Duration {
    let ms = delay.as_millis() as f64;
    let spread = ms * 0.1;
    let offset = if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    };
    Duration::from_millis((ms + offset).max(0.0).round() as u64)
}

fn message_suggests_network(msg: &str) -> bool {
    let m = msg.to_lowercase();
    ["timeout", "network", "connection", "fetch"]
        .iter()
        .any(|needle| m.contains(needle))
}

/// Tagged network errors follow their `retryable` flag; timeouts retry; local
/// validation/parse/configuration failures never do; anything else falls back to
/// matching generic network vocabulary in the message.
pub fn default_retry_predicate(err: &Error) -> bool {
    match err {
        Error::Network { retryable, .. } => *retryable,
        Error::Timeout(_) => true,
        Error::Validation { .. } | Error::Parse { .. } | Error::Configuration { .. } => false,
        other => message_suggests_network(&other.to_string()),
    }
}

/// [`default_retry_predicate`] plus rate-limit and server-error message patterns,
/// for errors surfaced by opaque provider SDKs.
pub fn provider_retry_predicate(err: &Error) -> bool {
    if default_retry_predicate(err) {
        return true;
    }
    if matches!(err, Error::Validation { .. }) {
        return false;
    }
    let m = err.to_string().to_lowercase();
    [
        "rate limit",
        "rate_limit",
        "too many requests",
        "429",
        "overloaded",
        "server error",
        "internal error",
        "500",
        "502",
        "503",
        "504",
    ]
    .iter()
    .any(|needle| m.contains(needle))
}

/// Result of a successful retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub data: T,
    pub attempts: u32,
    pub total_time: Duration,
}

/// Executes operations under a [`RetryPolicy`], consulting the network monitor
/// (when attached) before every attempt.
#[derive(Clone, Default)]
pub struct RetryEngine {
    monitor: Option<Arc<NetworkMonitor>>,
}

impl RetryEngine {
    pub fn new() -> Self {
        Self { monitor: None }
    }

    pub fn with_monitor(mut self, monitor: Arc<NetworkMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Run `operation` until it succeeds, the predicate rejects the failure, or
    /// `max_attempts` is reached. The final error is returned unchanged.
    pub async fn execute<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        mut operation: F,
    ) -> Result<RetryOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            if let Some(monitor) = &self.monitor {
                if !monitor.is_online() {
                    debug!(attempt, "skipping attempt: offline");
                    return Err(Error::network("No network connection", None, None));
                }
            }

            let result = match tokio::time::timeout(policy.timeout, operation()).await {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout(policy.timeout)),
            };

            let err = match result {
                Ok(data) => {
                    return Ok(RetryOutcome {
                        data,
                        attempts: attempt,
                        total_time: start.elapsed(),
                    })
                }
                Err(e) => e,
            };

            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %err, "retries exhausted");
                return Err(err);
            }
            if !(policy.retry_predicate)(&err) {
                debug!(attempt, error = %err, "error is not retryable");
                return Err(err);
            }

            let delay = policy.delay_for(attempt);
            if let Some(observer) = &policy.on_retry {
                observer(&RetryEvent {
                    attempt,
                    error: &err,
                    delay,
                });
            }
            debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Run `operation` under `policy` without a network monitor.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<RetryOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryEngine::new().execute(policy, operation).await
}
