//! Broker connection with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Backoff policy for establishing the broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
    /// Failures tolerated before giving up; the next failure is final.
    pub max_failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_failures: 10,
        }
    }
}

impl RetryPolicy {
    /// Total connection attempts made before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_failures + 1
    }
}

/// Attempt counter and current delay for one connection loop.
#[derive(Debug)]
pub struct Backoff {
    failures: u32,
    delay: Duration,
    policy: RetryPolicy,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            failures: 0,
            delay: policy.initial_delay.min(policy.max_delay),
            policy,
        }
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failed attempt.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once
    /// more than `max_failures` attempts have failed.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures > self.policy.max_failures {
            return None;
        }

        let delay = self.delay;
        self.delay = delay.saturating_mul(2).min(self.policy.max_delay);
        Some(delay)
    }
}

/// Run `attempt` until it succeeds or the policy gives up.
///
/// `attempt` receives the 1-based attempt number. On exhaustion the error of
/// the last attempt is returned.
pub async fn connect_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = Backoff::new(policy.clone());

    loop {
        let attempt_number = backoff.failures() + 1;
        match attempt(attempt_number).await {
            Ok(value) => {
                info!(attempt = attempt_number, "Connected to broker");
                return Ok(value);
            }
            Err(e) => match backoff.record_failure() {
                Some(delay) => {
                    warn!(
                        attempt = attempt_number,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Failed to connect to broker, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(
                        attempt = attempt_number,
                        error = %e,
                        "Failed to connect to broker, giving up"
                    );
                    return Err(e);
                }
            },
        }
    }
}
