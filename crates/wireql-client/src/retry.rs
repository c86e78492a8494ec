//! Backoff schedule for retried transport calls.
//!
//! The attempt bound lives at the call site (`execute_with_retry` takes
//! `max_attempts`); the policy only shapes the delay between attempts.

use std::time::Duration;

/// Delay schedule between retry attempts.
#[derive(Clone, Debug)]
pub enum RetryPolicy {
    /// Retry immediately, with no delay.
    Immediate,
    /// Fixed interval between attempts.
    Fixed {
        /// Time interval between retry attempts.
        interval: Duration,
    },
    /// Exponential backoff with bounded jitter.
    Exponential {
        /// Base delay for the backoff calculation.
        base: Duration,
        /// Maximum delay between attempts.
        max_delay: Duration,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following failed attempt number `attempt`
    /// (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed { interval } => *interval,
            Self::Exponential { base, max_delay } => {
                let base_delay = base.as_millis() as u64 * 2u64.pow(attempt.min(32));
                let max_delay_ms = max_delay.as_millis() as u64;
                let capped = base_delay.min(max_delay_ms);
                // Add ±25% jitter to prevent thundering herd
                let jitter_range = capped / 4;
                let jitter_offset = if jitter_range > 0 {
                    // Use simple deterministic-ish jitter from attempt number
                    // (avoids adding rand dependency just for this)
                    let hash = (attempt as u64)
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    hash % (jitter_range * 2)
                } else {
                    0
                };
                let final_delay = capped
                    .saturating_sub(jitter_range)
                    .saturating_add(jitter_offset);
                Duration::from_millis(final_delay)
            }
        }
    }
}
