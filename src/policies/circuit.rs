//! # Per-poller circuit breaker.
//!
//! Tracks consecutive failures of one poller and suppresses execution once
//! they reach the threshold.
//!
//! ## State machine
//! ```text
//! ┌────────┐  failures >= max_failures   ┌────────┐
//! │ Closed ├────────────────────────────►│  Open  │
//! └───▲────┘                             └───┬────┘
//!     │   reset window elapsed (check timer) │
//!     └──────────────────────────────────────┘
//! ```
//!
//! There is no half-open trial call: when the reset window has elapsed the breaker
//! closes with a zeroed failure count and the poller resumes at full trust.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation: the poller executes on schedule.
    Closed,
    /// Failure threshold reached: executions are suppressed.
    Open,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Failure accounting for a single poller.
///
/// `opened_at` is `Some` exactly when the state is [`CircuitState::Open`].
#[derive(Debug, Clone)]
pub(crate) struct CircuitBreaker {
    state: CircuitState,
    opened_at: Option<Instant>,
    consecutive_failures: u32,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            opened_at: None,
            consecutive_failures: 0,
        }
    }
}

impl CircuitBreaker {
    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }

    pub(crate) fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Counts one failure. Returns `true` if this failure tripped the breaker.
    pub(crate) fn record_failure(&mut self, now: Instant, max_failures: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.state == CircuitState::Closed && self.consecutive_failures >= max_failures {
            self.state = CircuitState::Open;
            self.opened_at = Some(now);
            return true;
        }
        false
    }

    /// Time left before an open breaker may close. Zero when closed or elapsed.
    pub(crate) fn remaining(&self, now: Instant, reset: Duration) -> Duration {
        match self.opened_at {
            Some(opened) => reset.saturating_sub(now.saturating_duration_since(opened)),
            None => Duration::ZERO,
        }
    }

    /// Closes an open breaker whose reset window has elapsed.
    ///
    /// Returns `true` if a transition happened.
    pub(crate) fn try_close(&mut self, now: Instant, reset: Duration) -> bool {
        if !self.is_open() || !self.remaining(now, reset).is_zero() {
            return false;
        }
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.consecutive_failures = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_at_threshold() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::default();
        assert!(!cb.record_failure(now, 3));
        assert!(!cb.record_failure(now, 3));
        assert!(cb.record_failure(now, 3));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.opened_at(), Some(now));
        assert_eq!(cb.consecutive_failures(), 3);
    }

    #[test]
    fn test_success_resets_count() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::default();
        cb.record_failure(now, 5);
        cb.record_failure(now, 5);
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_close_only_after_window() {
        let opened = Instant::now();
        let reset = Duration::from_secs(5);
        let mut cb = CircuitBreaker::default();
        cb.record_failure(opened, 1);

        let early = opened + Duration::from_secs(4);
        assert_eq!(cb.remaining(early, reset), Duration::from_secs(1));
        assert!(!cb.try_close(early, reset));
        assert!(cb.is_open());

        let later = opened + reset;
        assert!(cb.try_close(later, reset));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.opened_at(), None);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
    }
}
