//! Fixed-count, fixed-delay retry policy for image downloads.
//!
//! Every failure is retried the same way: an HTTP error status, a dropped
//! connection, a timeout and a disk write error all take the same path.
//! After an item finishes, successful or not, the worker holds its slot for a
//! short randomized cooldown so the image host is never hit back-to-back.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use librarycache_core::download::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(
//!     policy.should_retry(1),
//!     RetryDecision::Retry { delay: Duration::from_secs(1), attempt: 2 }
//! );
//! assert_eq!(policy.should_retry(3), RetryDecision::GiveUp);
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Default maximum attempts per item (including the first one).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between a failed attempt and the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Lower bound of the post-download cooldown.
const DEFAULT_COOLDOWN_MIN: Duration = Duration::from_millis(500);

/// Upper bound (exclusive) of the post-download cooldown.
const DEFAULT_COOLDOWN_MAX: Duration = Duration::from_millis(1000);

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Attempts are exhausted; the item is failed.
    GiveUp,
}

/// Retry configuration shared by every download task.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `retry_delay`: 1 second, fixed
/// - cooldown: uniformly random in `[500ms, 1000ms)`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    cooldown_min: Duration,
    cooldown_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            cooldown_min: DEFAULT_COOLDOWN_MIN,
            cooldown_max: DEFAULT_COOLDOWN_MAX,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and retry delay,
    /// keeping the default cooldown.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            ..Self::default()
        }
    }

    /// Creates a policy with a custom attempt count, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, DEFAULT_RETRY_DELAY)
    }

    /// Replaces the post-download cooldown range.
    ///
    /// If `max <= min` the cooldown is exactly `min`.
    #[must_use]
    pub fn with_cooldown(mut self, min: Duration, max: Duration) -> Self {
        self.cooldown_min = min;
        self.cooldown_max = max.max(min);
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the fixed delay between attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Decides what happens after attempt number `attempt` (1-indexed) failed.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::GiveUp;
        }

        RetryDecision::Retry {
            delay: self.retry_delay,
            attempt: attempt + 1,
        }
    }

    /// Picks the cooldown a finished task waits before releasing its slot.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        if self.cooldown_max <= self.cooldown_min {
            return self.cooldown_min;
        }
        let min_ms = u64::try_from(self.cooldown_min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.cooldown_max.as_millis()).unwrap_or(u64::MAX);
        if max_ms <= min_ms {
            return self.cooldown_min;
        }
        let ms = rand::thread_rng().gen_range(min_ms..max_ms);
        Duration::from_millis(ms)
    }
}
