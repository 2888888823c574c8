//! # Jitter policy for backoff intervals.
//!
//! [`JitterPolicy`] randomizes backed-off poll intervals so that many pollers
//! failing against the same dependency do not retry in lockstep.
//!
//! - [`JitterPolicy::None`]: exact backoff interval (default)
//! - [`JitterPolicy::Full`]: random in [0, interval]
//! - [`JitterPolicy::Equal`]: interval/2 + random[0, interval/2]
//! - [`JitterPolicy::Decorrelated`]: random in [base, interval × 3], capped
//!
//! The backoff policy clamps every jittered value back into
//! `[base_interval, max_backoff_interval]`.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Randomization applied to backoff intervals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff interval.
    #[default]
    None,

    /// Full jitter: random interval in [0, backoff].
    Full,

    /// Equal jitter: backoff/2 + random[0, backoff/2].
    Equal,

    /// Decorrelated jitter: random in [base, backoff × 3], capped at max.
    ///
    /// Requires context via [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to the given interval.
    ///
    /// For `Decorrelated` this returns the input unchanged; use
    /// [`apply_decorrelated`](Self::apply_decorrelated) instead.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
            JitterPolicy::Decorrelated => delay,
        }
    }

    /// Applies decorrelated jitter with full context.
    ///
    /// Falls back to `apply(prev)` on non-decorrelated policies.
    pub fn apply_decorrelated(&self, base: Duration, prev: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(prev);
        }

        let base_ms = base.as_millis() as u64;
        let prev_ms = prev.as_millis() as u64;
        let max_ms = max.as_millis() as u64;

        let upper = prev_ms.saturating_mul(3).min(max_ms).max(base_ms);
        if base_ms >= upper {
            return base;
        }
        Duration::from_millis(rand::rng().random_range(base_ms..=upper))
    }
}

fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ms))
}

fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn test_full_bounds() {
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(Duration::from_millis(1000)) <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_decorrelated_range() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(30);
        for _ in 0..100 {
            let d = JitterPolicy::Decorrelated.apply_decorrelated(base, Duration::from_secs(2), max);
            assert!(d >= base);
            assert!(d <= Duration::from_secs(6));
        }
    }

    #[test]
    fn test_zero_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
