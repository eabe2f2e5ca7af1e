//! Reconnection delay policy.
//!
//! The observed default is a constant 1000 ms between attempts: no backoff,
//! no cap, retries forever until explicit teardown. [`RetryPolicy::Fixed`]
//! preserves exactly that. [`RetryPolicy::Exponential`] is an opt-in
//! alternative for callers facing flaky remote endpoints; it is never
//! selected implicitly.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay between reconnection attempts (1000 ms).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Exponent clamp for [`RetryPolicy::Exponential`].
const MAX_BACKOFF_EXPONENT: u32 = 16;

// ============================================================================
// RetryPolicy
// ============================================================================

/// Delay schedule between reconnection attempts.
///
/// The attempt counter resets on every successful connection, so a channel
/// that recovers and later drops again starts the schedule over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Constant delay for every attempt. The default, at
    /// [`DEFAULT_RETRY_DELAY`].
    Fixed(Duration),

    /// Exponentially growing delay, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound on the delay.
        max: Duration,
        /// Multiplier applied per failed attempt.
        factor: u32,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a fixed-delay policy.
    #[inline]
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self::Fixed(delay)
    }

    /// Creates an exponential backoff policy.
    #[inline]
    #[must_use]
    pub const fn exponential(initial: Duration, max: Duration, factor: u32) -> Self {
        Self::Exponential {
            initial,
            max,
            factor,
        }
    }

    /// Returns the delay before the given attempt.
    ///
    /// `attempt` is 1-based: the first retry after a disconnect is attempt 1.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,

            Self::Exponential {
                initial,
                max,
                factor,
            } => {
                let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
                let scale = factor.checked_pow(exponent).unwrap_or(u32::MAX);
                initial.saturating_mul(scale).min(*max)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
