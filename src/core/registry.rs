//! # Poller registry.
//!
//! Holds one [`PollerRecord`] per registered key. The registry is the single
//! owner of every piece of per-poller mutable state: counters, circuit breaker,
//! the pending timer handle and the registration's cancellation token.
//!
//! ## Rules
//! - The map is guarded by one `parking_lot::Mutex`, never held across `.await`.
//! - A record owns at most one pending [`TimerHandle`]; replacing it cancels the old one.
//! - Each registration gets a fresh `epoch`. Late results from an execution that
//!   started under a previous epoch are discarded.
//! - Dropping a record (re-registration, `remove`, `destroy`) cancels its pending
//!   timer and its operation context.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::core::timer::TimerHandle;
use crate::policies::{CircuitBreaker, CircuitState, PollPolicy};
use crate::pollers::{ErrorHook, OperationRef, PollSpec};

/// Runtime record for one registered poller.
pub(crate) struct PollerRecord {
    pub(crate) epoch: u64,
    pub(crate) operation: OperationRef,
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) policy: PollPolicy,
    pub(crate) base_interval: Duration,
    pub(crate) current_interval: Duration,
    pub(crate) circuit: CircuitBreaker,
    pub(crate) is_running: bool,
    pub(crate) in_flight: u32,
    pub(crate) runs: u64,
    pub(crate) last_run_at: Option<Instant>,
    pub(crate) timer: Option<TimerHandle>,
    pub(crate) cancel: CancellationToken,
}

impl PollerRecord {
    pub(crate) fn new(spec: &PollSpec, policy: PollPolicy, epoch: u64) -> Self {
        Self {
            epoch,
            operation: spec.operation().clone(),
            on_error: spec.on_error().cloned(),
            policy,
            base_interval: spec.base_interval(),
            current_interval: spec.base_interval(),
            circuit: CircuitBreaker::default(),
            is_running: false,
            in_flight: 0,
            runs: 0,
            last_run_at: None,
            timer: None,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn snapshot(&self, key: &str) -> PollerSnapshot {
        PollerSnapshot {
            key: key.to_string(),
            base_interval: self.base_interval,
            current_interval: self.current_interval,
            consecutive_failures: self.circuit.consecutive_failures(),
            circuit_state: self.circuit.state(),
            circuit_opened_at: self.circuit.opened_at(),
            is_running: self.is_running,
            in_flight: self.in_flight > 0,
            has_pending_timer: self.timer.is_some(),
            runs: self.runs,
            last_run_at: self.last_run_at,
            policy: self.policy.clone(),
        }
    }
}

impl Drop for PollerRecord {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Read-only copy of a poller's state, for introspection and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSnapshot {
    pub key: String,
    pub base_interval: Duration,
    /// Effective delay; equals `base_interval` except while backing off.
    pub current_interval: Duration,
    /// Failures since the last success or circuit reset.
    pub consecutive_failures: u32,
    pub circuit_state: CircuitState,
    /// `Some` exactly when the circuit is open.
    pub circuit_opened_at: Option<Instant>,
    /// Actively scheduled (between `start` and `stop`).
    pub is_running: bool,
    /// An execution is awaiting completion.
    pub in_flight: bool,
    /// A firing (execution or circuit check) is armed.
    pub has_pending_timer: bool,
    /// Executions started under this registration.
    pub runs: u64,
    pub last_run_at: Option<Instant>,
    pub policy: PollPolicy,
}

/// Key → record map.
pub(crate) struct Registry {
    records: Mutex<HashMap<String, PollerRecord>>,
    epochs: AtomicU64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            epochs: AtomicU64::new(0),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<String, PollerRecord>> {
        self.records.lock()
    }

    pub(crate) fn next_epoch(&self) -> u64 {
        self.epochs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns sorted list of registered keys.
    pub(crate) fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.lock().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn snapshot(&self, key: &str) -> Option<PollerSnapshot> {
        self.records.lock().get(key).map(|rec| rec.snapshot(key))
    }

    /// Removes every record, returning their keys.
    pub(crate) fn drain(&self) -> Vec<String> {
        let drained: Vec<(String, PollerRecord)> = self.records.lock().drain().collect();
        drained.into_iter().map(|(key, _)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pollers::PollSpec;

    fn spec(key: &'static str) -> PollSpec {
        PollSpec::builder(key, Duration::from_secs(1)).build(|_ctx| async { Ok(()) })
    }

    #[test]
    fn test_dropping_record_cancels_context() {
        let rec = PollerRecord::new(&spec("a"), PollPolicy::default(), 1);
        let ctx = rec.cancel.child_token();
        drop(rec);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_fresh_record_snapshot() {
        let rec = PollerRecord::new(&spec("a"), PollPolicy::default(), 1);
        let snap = rec.snapshot("a");
        assert_eq!(snap.current_interval, Duration::from_secs(1));
        assert_eq!(snap.circuit_state, CircuitState::Closed);
        assert_eq!(snap.circuit_opened_at, None);
        assert!(!snap.is_running);
        assert!(!snap.has_pending_timer);
    }

    #[test]
    fn test_list_sorted_and_drain() {
        let registry = Registry::new();
        for key in ["zeta", "alpha", "mid"] {
            let epoch = registry.next_epoch();
            registry
                .lock()
                .insert(key.to_string(), PollerRecord::new(&spec(key), PollPolicy::default(), epoch));
        }
        assert_eq!(registry.list(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.drain().len(), 3);
        assert!(registry.list().is_empty());
        assert!(registry.snapshot("alpha").is_none());
    }
}
