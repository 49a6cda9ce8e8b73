//! Retry policy with exponential backoff.
//!
//! The policy itself is pure; the item processor owns the actual sleeping
//! and the transient/permanent decision. Keeping delay math here means the
//! provider adapter never grows retry logic of its own.

use std::time::Duration;

use rand::Rng;

/// Maximum jitter added to a backoff delay, as a fraction of the delay.
const JITTER_FRACTION: f64 = 0.25;

/// Tunable retry parameters for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (3 means up to 4 invocations).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Deterministic backoff delay before retry number `attempt` (0-based):
    /// `base * 2^attempt`, clamped to `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(32);
        let ms = (self.base_delay.as_millis() as u64).saturating_mul(1u64 << exp);
        Duration::from_millis(ms).min(self.max_delay)
    }

    /// [`backoff_delay`](Self::backoff_delay) plus up to 25% random jitter,
    /// so a burst of rate-limited items does not retry in lockstep.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_delay(attempt);
        let jitter_ms = (base.as_millis() as f64 * JITTER_FRACTION) as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
