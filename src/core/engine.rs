//! # Scheduling engine.
//!
//! The engine owns the registry, the environment monitor and the event bus, and
//! implements every scheduling decision. The public [`Coordinator`](crate::Coordinator)
//! is a thin facade over it.
//!
//! ## Scheduling decision
//! Evaluated after `start`, after every completed execution, after a skipped
//! firing and on environment resume. The first matching rule wins:
//!
//! ```text
//! 1. not running                      → nothing
//! 2. environment pauses this poller   → drop pending timer, nothing
//! 3. circuit open                     → arm CircuitCheck at opened_at + reset_time
//! 4. otherwise                        → arm Execute after current_interval
//! ```
//!
//! ## Execution
//! ```text
//! Execute fires ─► running? ─► paused? ─► circuit open & not due? ─► in flight & dedupe?
//!                     │           │               │                        │
//!                     no          yes             yes: reschedule          yes: RunSkipped, reschedule
//!                     ▼           ▼               ▼                        ▼
//!                  (drop)      (drop)          CircuitCheck              Execute
//!
//! otherwise: in_flight += 1 ─► run_once (lock released) ─► record result ─► reschedule ─► on_error hook
//! ```
//!
//! ## Rules
//! - The registry lock is never held across `.await`.
//! - A firing whose timer id no longer matches the record's pending timer is stale and ignored.
//! - A completion whose registration epoch no longer matches is discarded.
//! - Timer callbacks and listeners hold `Weak<Engine>`; dropping the coordinator stops them.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::core::registry::{PollerRecord, Registry};
use crate::core::runner::{RunTicket, run_once};
use crate::core::timer::{self, TimerHandle, TimerKind};
use crate::environment::EnvironmentMonitor;
use crate::error::PollError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::PollPolicy;

pub(crate) struct Engine {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) bus: Bus,
    pub(crate) registry: Registry,
    pub(crate) env: EnvironmentMonitor,
    pub(crate) defaults: PollPolicy,
}

impl Engine {
    pub(crate) fn new(clock: Arc<dyn Clock>, bus: Bus, idle_timeout: Duration, defaults: PollPolicy) -> Self {
        Self {
            clock,
            bus,
            registry: Registry::new(),
            env: EnvironmentMonitor::new(idle_timeout),
            defaults,
        }
    }

    /// Applies the scheduling decision to `rec`.
    pub(crate) fn schedule_next(self: &Arc<Self>, key: &str, rec: &mut PollerRecord) {
        if !rec.is_running {
            return;
        }
        if self.env.pauses(&rec.policy) {
            if rec.timer.take().is_some() {
                debug!(poller = key, "paused by environment");
            }
            return;
        }
        if rec.circuit.is_open() {
            let wait = rec
                .circuit
                .remaining(self.clock.now(), rec.policy.circuit_reset_time);
            self.arm(key, rec, wait, TimerKind::CircuitCheck);
            return;
        }
        let delay = rec.current_interval;
        self.arm(key, rec, delay, TimerKind::Execute);
    }

    /// Installs a timer on `rec`, cancelling any pending one.
    pub(crate) fn arm(self: &Arc<Self>, key: &str, rec: &mut PollerRecord, delay: Duration, kind: TimerKind) {
        let engine = Arc::downgrade(self);
        let key: Arc<str> = Arc::from(key);
        let handle = timer::arm(self.clock.as_ref(), delay, kind, move |id| async move {
            if let Some(engine) = engine.upgrade() {
                engine.on_timer(&key, id).await;
            }
        });
        rec.timer = Some(handle);
    }

    async fn on_timer(self: &Arc<Self>, key: &str, id: u64) {
        let ticket = {
            let mut records = self.registry.lock();
            let Some(rec) = records.get_mut(key) else {
                return;
            };
            if rec.timer.as_ref().map(TimerHandle::id) != Some(id) {
                debug!(poller = key, timer = id, "stale timer firing ignored");
                return;
            }
            let kind = rec.timer.as_ref().map(TimerHandle::kind);
            rec.timer = None;

            match kind {
                Some(TimerKind::CircuitCheck) => {
                    self.close_circuit_if_due(key, rec);
                    self.schedule_next(key, rec);
                    None
                }
                Some(TimerKind::Execute) => self.begin_run(key, rec),
                Some(TimerKind::IdleDeadline) | None => {
                    warn!(poller = key, timer = id, ?kind, "unexpected timer on poller");
                    None
                }
            }
        };

        if let Some(ticket) = ticket {
            self.execute(key, ticket).await;
        }
    }

    /// Returns `true` if the circuit is closed on return.
    fn close_circuit_if_due(&self, key: &str, rec: &mut PollerRecord) -> bool {
        if !rec.circuit.is_open() {
            return true;
        }
        if !rec.circuit.try_close(self.clock.now(), rec.policy.circuit_reset_time) {
            return false;
        }
        rec.current_interval = rec.base_interval;
        info!(poller = key, "circuit closed");
        self.bus.publish(Event::new(EventKind::CircuitClosed).with_key(key));
        true
    }

    /// Gates one firing. Returns a ticket if an execution should start now.
    fn begin_run(self: &Arc<Self>, key: &str, rec: &mut PollerRecord) -> Option<RunTicket> {
        if !rec.is_running || self.env.pauses(&rec.policy) {
            return None;
        }
        if !self.close_circuit_if_due(key, rec) {
            self.schedule_next(key, rec);
            return None;
        }
        if rec.policy.dedupe_requests && rec.in_flight > 0 {
            debug!(poller = key, "previous execution still in flight; firing skipped");
            self.bus.publish(
                Event::new(EventKind::RunSkipped)
                    .with_key(key)
                    .with_reason("in_flight"),
            );
            self.schedule_next(key, rec);
            return None;
        }

        rec.in_flight += 1;
        rec.runs += 1;
        rec.last_run_at = Some(self.clock.now());

        Some(RunTicket {
            epoch: rec.epoch,
            run: rec.runs,
            operation: rec.operation.clone(),
            timeout: rec.policy.execution_timeout,
            ctx: rec.cancel.child_token(),
        })
    }

    /// Runs one execution and records its outcome.
    async fn execute(self: &Arc<Self>, key: &str, ticket: RunTicket) {
        let outcome = run_once(self.clock.as_ref(), &self.bus, key, &ticket).await;

        let hook = {
            let mut records = self.registry.lock();
            let Some(rec) = records.get_mut(key).filter(|rec| rec.epoch == ticket.epoch) else {
                debug!(poller = key, run = ticket.run, "completion of a replaced registration discarded");
                return;
            };
            rec.in_flight = rec.in_flight.saturating_sub(1);

            match &outcome {
                Ok(()) => self.record_success(key, rec, ticket.run),
                Err(err) => self.record_failure(key, rec, ticket.run, err),
            }
            self.schedule_next(key, rec);

            outcome.as_ref().err().and(rec.on_error.clone())
        };

        if let (Some(hook), Err(err)) = (hook, &outcome) {
            if catch_unwind(AssertUnwindSafe(|| hook(key, err))).is_err() {
                warn!(poller = key, "on_error hook panicked");
            }
        }
    }

    fn record_success(&self, key: &str, rec: &mut PollerRecord, run: u64) {
        rec.circuit.record_success();
        rec.current_interval = rec.base_interval;
        debug!(poller = key, run, "poll succeeded");
        self.bus
            .publish(Event::new(EventKind::RunSucceeded).with_key(key).with_run(run));
    }

    fn record_failure(&self, key: &str, rec: &mut PollerRecord, run: u64, err: &PollError) {
        let was_open = rec.circuit.is_open();
        let tripped = rec
            .circuit
            .record_failure(self.clock.now(), rec.policy.max_failures);
        let failures = rec.circuit.consecutive_failures();

        warn!(poller = key, run, failures, error = %err, label = err.as_label(), "poll failed");
        self.bus.publish(
            Event::new(EventKind::RunFailed)
                .with_key(key)
                .with_run(run)
                .with_reason(err.to_string())
                .with_failures(failures),
        );

        if tripped {
            warn!(
                poller = key,
                failures,
                reset_after = ?rec.policy.circuit_reset_time,
                "circuit opened"
            );
            self.bus.publish(
                Event::new(EventKind::CircuitOpened)
                    .with_key(key)
                    .with_failures(failures)
                    .with_delay(rec.policy.circuit_reset_time),
            );
        } else if rec.policy.use_backoff && !was_open {
            let delay = rec.policy.backoff(rec.base_interval).next(failures);
            rec.current_interval = delay;
            debug!(poller = key, failures, ?delay, "backing off");
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_key(key)
                    .with_delay(delay)
                    .with_failures(failures),
            );
        } else {
            rec.current_interval = rec.base_interval;
        }
    }

    /// Drops pending timers of every poller the environment now pauses.
    pub(crate) fn pause_sweep(&self) {
        let mut records = self.registry.lock();
        for (key, rec) in records.iter_mut() {
            if rec.timer.is_some() && self.env.pauses(&rec.policy) {
                rec.timer = None;
                debug!(poller = %key, "paused by environment");
            }
        }
    }

    /// Re-schedules every running poller left without a timer by a pause.
    pub(crate) fn resume_sweep(self: &Arc<Self>) {
        let mut records = self.registry.lock();
        for (key, rec) in records.iter_mut() {
            if rec.is_running && rec.timer.is_none() && rec.in_flight == 0 {
                self.schedule_next(key, rec);
            }
        }
    }

    /// Host reported activity (or the app became visible).
    pub(crate) fn on_activity(self: &Arc<Self>) {
        self.arm_idle_deadline();
        if self.env.mark_active() {
            info!("environment active");
            self.bus.publish(Event::new(EventKind::EnvironmentActive));
            self.resume_sweep();
        }
    }

    pub(crate) fn on_connectivity(self: &Arc<Self>, online: bool) {
        if !self.env.set_online(online) {
            return;
        }
        if online {
            info!("connectivity restored");
            self.bus.publish(Event::new(EventKind::ConnectivityRestored));
            self.resume_sweep();
        } else {
            warn!("connectivity lost");
            self.bus.publish(Event::new(EventKind::ConnectivityLost));
            self.pause_sweep();
        }
    }

    fn arm_idle_deadline(self: &Arc<Self>) {
        let engine: Weak<Self> = Arc::downgrade(self);
        let handle = timer::arm(
            self.clock.as_ref(),
            self.env.idle_timeout(),
            TimerKind::IdleDeadline,
            move |id| async move {
                if let Some(engine) = engine.upgrade() {
                    engine.on_idle_deadline(id);
                }
            },
        );
        self.env.replace_deadline(handle);
    }

    fn on_idle_deadline(&self, id: u64) {
        if self.env.mark_idle(id) {
            info!(idle_timeout = ?self.env.idle_timeout(), "environment idle");
            self.bus.publish(Event::new(EventKind::EnvironmentIdle));
            self.pause_sweep();
        }
    }
}
