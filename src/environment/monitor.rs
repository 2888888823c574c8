//! # Environment monitor.
//!
//! Derives two process-wide booleans from host signals:
//! - `is_idle`: no activity for `idle_timeout`,
//! - `is_online`: the last reported connectivity.
//!
//! The monitor only owns the flags and the idle deadline handle. Arming the
//! deadline and the pause/resume sweeps over pollers are driven by the
//! coordinator, which is the sole owner of poller records.
//!
//! ## Transitions
//! ```text
//!             activity / visible (re-arms deadline)
//!   ┌──────┐ ◄───────────────────────────────────── ┌──────┐
//!   │Active│                                        │ Idle │
//!   └──────┘ ─────────────────────────────────────► └──────┘
//!             deadline fired (no activity for idle_timeout)
//! ```
//!
//! Flags are atomics read under the registry lock; a flag is always flipped
//! *before* the corresponding sweep takes that lock, so a scheduling decision
//! either sees the new flag or is undone by the sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::timer::TimerHandle;
use crate::policies::PollPolicy;

/// Snapshot of the environment flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentState {
    pub is_idle: bool,
    pub is_online: bool,
}

pub(crate) struct EnvironmentMonitor {
    idle_timeout: Duration,
    idle: AtomicBool,
    online: AtomicBool,
    deadline: Mutex<Option<TimerHandle>>,
}

impl EnvironmentMonitor {
    pub(crate) fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            idle: AtomicBool::new(false),
            online: AtomicBool::new(true),
            deadline: Mutex::new(None),
        }
    }

    pub(crate) fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub(crate) fn snapshot(&self) -> EnvironmentState {
        EnvironmentState {
            is_idle: self.idle.load(Ordering::SeqCst),
            is_online: self.online.load(Ordering::SeqCst),
        }
    }

    /// True if the environment currently requires a poller with `policy` to pause.
    pub(crate) fn pauses(&self, policy: &PollPolicy) -> bool {
        let env = self.snapshot();
        (policy.pause_on_idle && env.is_idle) || (policy.pause_when_offline && !env.is_online)
    }

    /// Installs a fresh idle deadline, cancelling the previous one.
    pub(crate) fn replace_deadline(&self, handle: TimerHandle) {
        *self.deadline.lock() = Some(handle);
    }

    /// Records activity. Returns `true` if this ended an idle period.
    pub(crate) fn mark_active(&self) -> bool {
        self.idle.swap(false, Ordering::SeqCst)
    }

    /// Called when deadline `id` fires. Returns `true` if this started an idle period.
    ///
    /// A firing that lost a race with a re-arm (different id) is ignored.
    pub(crate) fn mark_idle(&self, id: u64) -> bool {
        let mut deadline = self.deadline.lock();
        if deadline.as_ref().map(TimerHandle::id) != Some(id) {
            return false;
        }
        deadline.take();
        !self.idle.swap(true, Ordering::SeqCst)
    }

    /// Records connectivity. Returns `true` if the value changed.
    pub(crate) fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst) != online
    }

    /// Detaches: cancels the deadline and restores active/online defaults.
    pub(crate) fn reset(&self) {
        self.deadline.lock().take();
        self.idle.store(false, Ordering::SeqCst);
        self.online.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::core::timer::{TimerKind, arm};

    #[test]
    fn test_pauses_respects_policy_flags() {
        let monitor = EnvironmentMonitor::new(Duration::from_secs(60));
        let pausing = PollPolicy::default();
        let stubborn = PollPolicy {
            pause_on_idle: false,
            pause_when_offline: false,
            ..Default::default()
        };

        assert!(!monitor.pauses(&pausing));
        assert!(monitor.set_online(false));
        assert!(!monitor.set_online(false));
        assert!(monitor.pauses(&pausing));
        assert!(!monitor.pauses(&stubborn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_deadline_is_ignored() {
        let monitor = EnvironmentMonitor::new(Duration::from_secs(60));
        let old = arm(&TokioClock, Duration::from_secs(60), TimerKind::IdleDeadline, |_| async {});
        let old_id = old.id();
        monitor.replace_deadline(old);
        let fresh = arm(&TokioClock, Duration::from_secs(60), TimerKind::IdleDeadline, |_| async {});
        let fresh_id = fresh.id();
        monitor.replace_deadline(fresh);

        assert!(!monitor.mark_idle(old_id));
        assert!(!monitor.snapshot().is_idle);
        assert!(monitor.mark_idle(fresh_id));
        assert!(monitor.snapshot().is_idle);
        assert!(monitor.mark_active());
        assert!(!monitor.mark_active());
    }
}
