//! # Runtime events emitted by the coordinator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: poller registered / replaced / started / stopped / removed
//! - **Run events**: one execution's lifecycle (starting, succeeded, failed, skipped, timeout)
//! - **Resilience events**: backoff and circuit-breaker transitions
//! - **Environment events**: idle/active and connectivity transitions
//!
//! The [`Event`] struct carries optional metadata (poller key, reason, delays).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pollvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RunFailed)
//!     .with_key("session")
//!     .with_reason("503")
//!     .with_run(3)
//!     .with_failures(2);
//!
//! assert_eq!(ev.kind, EventKind::RunFailed);
//! assert_eq!(ev.key.as_deref(), Some("session"));
//! assert_eq!(ev.failures, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A poller was registered under a new key.
    PollerRegistered,

    /// A registration replaced an existing poller with the same key.
    PollerReplaced,

    /// A poller became schedulable.
    PollerStarted,

    /// A poller's pending timer was cancelled and it stopped scheduling.
    PollerStopped,

    /// A poller was discarded from the registry.
    PollerRemoved,

    // === Run events ===
    /// An execution is starting.
    ///
    /// Sets `key`, `run` (1-based, per registration).
    RunStarting,

    /// An execution succeeded.
    ///
    /// Sets `key`, `run`.
    RunSucceeded,

    /// An execution failed.
    ///
    /// Sets `key`, `run`, `reason`, `failures` (consecutive, after this one).
    RunFailed,

    /// A firing was skipped because the previous execution is still in flight.
    ///
    /// Sets `key`.
    RunSkipped,

    /// An execution exceeded its timeout (always followed by `RunFailed`).
    ///
    /// Sets `key`, `run`, `timeout_ms`.
    TimeoutHit,

    // === Resilience events ===
    /// The interval grew after a failure below the circuit threshold.
    ///
    /// Sets `key`, `delay_ms`, `failures`.
    BackoffScheduled,

    /// The circuit breaker opened.
    ///
    /// Sets `key`, `failures`, `delay_ms` (reset window).
    CircuitOpened,

    /// The circuit breaker closed after its reset window.
    ///
    /// Sets `key`.
    CircuitClosed,

    // === Environment events ===
    /// No activity for the idle timeout; idle-pausable pollers were paused.
    EnvironmentIdle,

    /// Activity after an idle period; paused pollers were resumed.
    EnvironmentActive,

    /// Connectivity was lost; offline-pausable pollers were paused.
    ConnectivityLost,

    /// Connectivity came back; paused pollers were resumed.
    ConnectivityRestored,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Poller key, if applicable.
    pub key: Option<Arc<str>>,
    /// Human-readable reason (errors, skip causes, etc.).
    pub reason: Option<Arc<str>>,
    /// Execution number (starting from 1).
    pub run: Option<u64>,
    /// Delay in milliseconds (backoff interval, circuit reset window).
    pub delay_ms: Option<u32>,
    /// Execution timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Consecutive failure count after the event.
    pub failures: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            reason: None,
            run: None,
            delay_ms: None,
            timeout_ms: None,
            failures: None,
        }
    }

    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_run(mut self, n: u64) -> Self {
        self.run = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis_u32(d));
        self
    }

    /// Attaches a timeout (stored as milliseconds, saturating).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis_u32(d));
        self
    }

    #[inline]
    pub fn with_failures(mut self, n: u32) -> Self {
        self.failures = Some(n);
        self
    }

    /// True for the four environment transition kinds.
    #[inline]
    pub fn is_environment(&self) -> bool {
        matches!(
            self.kind,
            EventKind::EnvironmentIdle
                | EventKind::EnvironmentActive
                | EventKind::ConnectivityLost
                | EventKind::ConnectivityRestored
        )
    }
}

fn millis_u32(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::RunStarting);
        let b = Event::new(EventKind::RunSucceeded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_environment_classification() {
        assert!(Event::new(EventKind::ConnectivityLost).is_environment());
        assert!(!Event::new(EventKind::CircuitOpened).is_environment());
    }
}
