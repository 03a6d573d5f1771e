//! Retry/backoff controller for failed dispatch attempts.
//!
//! Decides whether a failed attempt is retried (with exponential backoff and
//! jitter) or abandoned.
//!
//! # Retryable Errors
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 408/429 | HTTP 400 (Bad Request) |
//! | HTTP 5xx | HTTP 401/403 (Auth Errors) |
//! | Network timeouts | HTTP 422 (Validation Error) |
//! | Connection reset | Insufficient funds at the venue |

use std::time::Duration;

use rand::Rng;

use crate::application::ports::VenueError;
use crate::domain::order_management::FailureReason;
use crate::domain::shared::Timestamp;

/// Retry policy for venue dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts permitted, including the first (default: 5).
    pub max_attempts: u32,
    /// Delay before the second attempt (default: 500ms).
    pub initial_backoff: Duration,
    /// Maximum delay (default: 60s).
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth (default: 2.0).
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (default: 0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Policy without jitter, for deterministic schedules.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Base delay after failed attempt `attempt` (1-based), capped, no jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.backoff_multiplier.powi(exponent);
        let initial_ms = self.initial_backoff.as_millis() as f64;
        let max_ms = self.max_backoff.as_millis() as f64;
        let delay_ms = (initial_ms * multiplier).min(max_ms);
        Duration::from_millis(delay_ms as u64)
    }

    /// Jittered delay after failed attempt `attempt`, never above the cap.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay(attempt).as_millis() as f64;
        if self.jitter_factor <= 0.0 || base_ms <= 0.0 {
            return self.base_delay(attempt);
        }

        let mut rng = rand::rng();
        let jitter_range = base_ms * self.jitter_factor;
        let min = (base_ms - jitter_range).max(0.0);
        let max = base_ms + jitter_range;
        let jittered = rng.random_range(min..=max);
        let capped = jittered.min(self.max_backoff.as_millis() as f64);

        Duration::from_millis(capped as u64)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put the order back to `triggered`, dispatchable from `not_before`.
    Retry {
        /// Earliest start of the next attempt.
        not_before: Timestamp,
        /// Delay applied.
        delay: Duration,
    },
    /// Move the order to `failed`.
    Abandon(FailureReason),
}

/// Applies a [`RetryPolicy`] to failed attempts.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    /// Create a controller for a policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Decide the follow-up to failed attempt `attempt` (1-based).
    #[must_use]
    pub fn decide(&self, attempt: u32, error: &VenueError, now: Timestamp) -> RetryDecision {
        if !error.is_transient() {
            return RetryDecision::Abandon(FailureReason::VenueRejected {
                message: error.message().to_string(),
            });
        }

        if attempt >= self.policy.max_attempts {
            return RetryDecision::Abandon(FailureReason::RetriesExhausted {
                attempts: attempt,
                last_error: error.message().to_string(),
            });
        }

        let delay = self.policy.delay(attempt);
        RetryDecision::Retry {
            not_before: now.plus(delay),
            delay,
        }
    }
}

/// HTTP status codes that are retryable besides 5xx.
const RETRYABLE_STATUS_CODES: &[u16] = &[
    408, // Request Timeout
    429, // Too Many Requests (Rate Limited)
];

/// Check if an HTTP status code from the venue is retryable.
#[must_use]
pub fn is_retryable_status(status_code: u16) -> bool {
    (500..600).contains(&status_code) || RETRYABLE_STATUS_CODES.contains(&status_code)
}
