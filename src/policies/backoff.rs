//! # Backoff policy for failing pollers.
//!
//! [`BackoffPolicy`] controls how a poller's effective interval grows while
//! failures accumulate below the circuit-breaker threshold.
//! It is parameterized by:
//! - [`BackoffPolicy::base`] the poller's nominal interval (also the floor);
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the ceiling.
//!
//! The interval after `n` consecutive failures is `base × factor^n`, clamped to
//! `[base, max]`, then jitter is applied and the result is clamped again. The base
//! delay is derived purely from the failure count, so jitter output never feeds
//! back into subsequent calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use pollvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     base: Duration::from_millis(1000),
//!     max: Duration::from_millis(8000),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(1000));
//! assert_eq!(backoff.next(2), Duration::from_millis(4000));
//! // 1000ms × 2^5 = 32s → capped at max=8s
//! assert_eq!(backoff.next(5), Duration::from_millis(8000));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Exponential backoff anchored at a poller's base interval.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Nominal interval; the result never drops below it.
    pub base: Duration,
    /// Maximum interval.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to spread pollers that fail together.
    pub jitter: JitterPolicy,
}

impl BackoffPolicy {
    /// Doubling backoff from `base` up to `max`, no jitter.
    pub fn doubling(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a copy with the given jitter policy.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the interval after `failures` consecutive failures.
    ///
    /// # Notes
    /// - `max` below `base` is treated as `base` (the floor wins).
    /// - Non-finite intermediate values clamp to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let ceiling = self.max.max(self.base);
        let clamped_exp = failures.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.base.as_secs_f64() * self.factor.powi(clamped_exp);

        let raw = if !unclamped_secs.is_finite()
            || unclamped_secs < 0.0
            || unclamped_secs > ceiling.as_secs_f64()
        {
            ceiling
        } else {
            Duration::from_secs_f64(unclamped_secs)
        };
        let raw = raw.clamp(self.base, ceiling);

        let jittered = match self.jitter {
            JitterPolicy::Decorrelated => self.jitter.apply_decorrelated(self.base, raw, ceiling),
            _ => self.jitter.apply(raw),
        };
        jittered.clamp(self.base, ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, max_ms: u64, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy::doubling(
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
        )
        .with_jitter(jitter)
    }

    #[test]
    fn test_doubles_per_failure() {
        let p = policy(1000, 300_000, JitterPolicy::None);
        assert_eq!(p.next(1), Duration::from_millis(2000));
        assert_eq!(p.next(2), Duration::from_millis(4000));
        assert_eq!(p.next(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_two_failures_capped_formula() {
        let p = policy(1000, 8000, JitterPolicy::None);
        assert_eq!(p.next(2), Duration::from_millis(4000));
        assert_eq!(p.next(4), Duration::from_millis(8000));
    }

    #[test]
    fn test_max_below_base_keeps_base() {
        let p = policy(10_000, 5_000, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_secs(10));
        assert_eq!(p.next(3), Duration::from_secs(10));
    }

    #[test]
    fn test_constant_factor() {
        let p = BackoffPolicy {
            factor: 1.0,
            ..policy(500, 30_000, JitterPolicy::None)
        };
        for failures in 0..10 {
            assert_eq!(
                p.next(failures),
                Duration::from_millis(500),
                "failures {} should be constant at 500ms",
                failures
            );
        }
    }

    #[test]
    fn test_non_finite_overflow_clamps_to_max() {
        let p = policy(100, 10_000, JitterPolicy::None);
        assert_eq!(p.next(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_floor_and_ceiling() {
        for jitter in [
            JitterPolicy::Full,
            JitterPolicy::Equal,
            JitterPolicy::Decorrelated,
        ] {
            let p = policy(1000, 20_000, jitter);
            for failures in 0..12 {
                let delay = p.next(failures);
                assert!(
                    delay >= Duration::from_millis(1000),
                    "{jitter:?} failures {failures}: {delay:?} below base"
                );
                assert!(
                    delay <= Duration::from_millis(20_000),
                    "{jitter:?} failures {failures}: {delay:?} above max"
                );
            }
        }
    }

    #[test]
    fn test_equal_jitter_keeps_half_of_raw() {
        let p = policy(1000, 60_000, JitterPolicy::Equal);
        for _ in 0..50 {
            let delay = p.next(4);
            assert!(delay >= Duration::from_millis(8000));
            assert!(delay <= Duration::from_millis(16_000));
        }
    }
}
