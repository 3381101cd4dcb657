//! Retry with capped exponential backoff for transient failures.
//!
//! Only failures classified as transient are retried: the device is
//! offline, the server answered with a retryable status, or the message
//! looks like a network/timeout problem. Everything else is returned on the
//! first failure.

use crate::connectivity::{AssumeOnline, Connectivity};
use jualuma_types::ApiError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(300);
const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(2000);
const MIN_BASE_DELAY: Duration = Duration::from_millis(50);

/// Statuses worth another attempt: timeouts, throttling and 5xx gateway errors.
pub const RETRYABLE_STATUS: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

const TRANSIENT_MESSAGE_MARKERS: [&str; 4] = [
    "network",
    "failed to fetch",
    "timeout",
    "temporarily unavailable",
];

/// Retry tuning. Unset fields fall back to defaults; see [`RetryPolicy::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call. Default 3, at least 1.
    pub attempts: Option<u32>,
    /// Delay before the first retry. Default 300ms, at least 50ms.
    pub base_delay: Option<Duration>,
    /// Upper bound for any single delay. Default 2s, at least `base_delay`.
    pub max_delay: Option<Duration>,
}

/// A [`RetryPolicy`] with defaults and floors applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: Some(attempts),
            base_delay: Some(base_delay),
            max_delay: Some(max_delay),
        }
    }

    pub fn resolve(&self) -> ResolvedPolicy {
        let attempts = self.attempts.unwrap_or(DEFAULT_ATTEMPTS).max(1);
        let base_delay = self.base_delay.unwrap_or(DEFAULT_BASE_DELAY).max(MIN_BASE_DELAY);
        let max_delay = self.max_delay.unwrap_or(DEFAULT_MAX_DELAY).max(base_delay);
        ResolvedPolicy {
            attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before the retry that follows failed attempt number `attempt`
    /// (1-based): `min(max_delay, base_delay * 2^(attempt-1))`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.resolve().delay_for(attempt)
    }
}

impl ResolvedPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// An error that can be classified as transient.
pub trait RetryableError {
    /// HTTP-like status attached to the error, if any.
    fn status(&self) -> Option<u16> {
        None
    }

    /// Human-readable text inspected for transient markers.
    fn message(&self) -> String;
}

impl RetryableError for ApiError {
    fn status(&self) -> Option<u16> {
        self.status
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

impl RetryableError for std::io::Error {
    fn message(&self) -> String {
        use std::io::ErrorKind;
        match self.kind() {
            ErrorKind::TimedOut => format!("timeout: {self}"),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected => format!("network error: {self}"),
            _ => self.to_string(),
        }
    }
}

impl RetryableError for String {
    fn message(&self) -> String {
        self.clone()
    }
}

impl RetryableError for &'static str {
    fn message(&self) -> String {
        (*self).to_string()
    }
}

fn is_likely_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_MESSAGE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Returns true if `error` is worth retrying given current connectivity.
pub fn is_retryable_error<E: RetryableError + ?Sized>(error: &E, connectivity: &dyn Connectivity) -> bool {
    if !connectivity.is_online() {
        return true;
    }
    if error.status().is_some_and(|status| RETRYABLE_STATUS.contains(&status)) {
        return true;
    }
    is_likely_transient_message(&error.message())
}

/// Runs operations under a [`RetryPolicy`], consulting a connectivity source
/// when classifying failures.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    connectivity: Arc<dyn Connectivity>,
}

impl std::fmt::Debug for Retrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrier")
            .field("policy", &self.policy)
            .field("online", &self.connectivity.is_online())
            .finish()
    }
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            connectivity: Arc::new(AssumeOnline),
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Calls `operation` until it succeeds, fails with a non-transient
    /// error, or the attempt budget is spent. The last error is returned.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let policy = self.policy.resolve();
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;

                    if !is_retryable_error(&error, self.connectivity.as_ref()) {
                        return Err(error);
                    }
                    if attempt >= policy.attempts {
                        if policy.attempts > 1 {
                            warn!(
                                "giving up after {} attempts: {}",
                                policy.attempts,
                                error.message()
                            );
                        }
                        return Err(error);
                    }

                    let delay = policy.delay_for(attempt);
                    debug!(
                        "transient failure (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        policy.attempts,
                        delay,
                        error.message()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Retries `operation` under `policy`, assuming the device is online.
pub async fn with_retry<F, Fut, T, E>(operation: F, policy: RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    Retrier::new(policy).run(operation).await
}
