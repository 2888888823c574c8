//! # Coordinator: the public entry point.
//!
//! [`Coordinator`] owns one scheduling engine and exposes the poller lifecycle
//! (`register` / `start` / `stop` / `trigger_now` / `remove`), introspection
//! (`get_state`, `list`, `environment`), the environment attachment
//! (`initialize` / `destroy`) and the graceful teardown (`shutdown`).
//!
//! ## Architecture
//! ```text
//! Coordinator::builder(cfg).with_subscribers(..).build()
//!      │
//!      ├─► Engine { registry, environment monitor, bus, clock }
//!      │      └─ timers ─► on_timer ─► run_once ─► record result ─► schedule_next
//!      │
//!      ├─► initialize(source): activity / connectivity / visibility listeners ─► Engine
//!      │
//!      └─► subscriber_listener(): Bus ─► SubscriberSet::emit(&Event)
//!
//! shutdown().await
//!      destroy() ─► stop forwarder (drain bus) ─► SubscriberSet::shutdown (drain queues)
//! ```
//!
//! ## Rules
//! - Every lifecycle call is synchronous and returns immediately; executions run
//!   on spawned tokio tasks.
//! - Misuse (unknown key, invalid policy, trigger on a stopped poller, double
//!   `initialize`) is logged with `warn!` and returned as [`RegistryError`].
//!   Nothing panics.
//! - Must be built and used inside a tokio runtime.
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use pollvisor::{Coordinator, CoordinatorConfig, PollError, PollSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Coordinator::builder(CoordinatorConfig::default()).build();
//!
//!     let spec = PollSpec::builder("notifications", Duration::from_secs(30))
//!         .max_failures(3)
//!         .build(|_ctx| async move {
//!             // fetch unread count...
//!             Ok::<_, PollError>(())
//!         });
//!
//!     coordinator.register(spec)?;
//!     coordinator.start("notifications")?;
//!     coordinator.trigger_now("notifications")?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::engine::Engine;
use crate::core::registry::{PollerRecord, PollerSnapshot};
use crate::core::timer::TimerKind;
use crate::environment::{EnvironmentSignalSource, EnvironmentState, Visibility};
use crate::error::RegistryError;
use crate::events::{Event, EventKind};
use crate::pollers::PollSpec;
use crate::subscribers::SubscriberSet;

use super::builder::CoordinatorBuilder;
use super::config::CoordinatorConfig;

/// Orchestrates polling for every registered key.
pub struct Coordinator {
    engine: Arc<Engine>,
    subs: Arc<SubscriberSet>,
    listeners: Mutex<Option<CancellationToken>>,
    forwarder: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Coordinator {
    pub(crate) fn new_internal(engine: Arc<Engine>, subs: Arc<SubscriberSet>) -> Self {
        Self {
            engine,
            subs,
            listeners: Mutex::new(None),
            forwarder: Mutex::new(None),
        }
    }

    /// Creates a builder for constructing a coordinator.
    pub fn builder(cfg: CoordinatorConfig) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg)
    }

    /// Registers (or replaces) the poller for `spec.key()`.
    ///
    /// The `PollSpec` overrides are merged over the coordinator defaults and validated.
    /// An existing poller under the same key is stopped and discarded first: its
    /// pending timer is cancelled, its operation context is cancelled, and any
    /// in-flight result it produces later is ignored.
    ///
    /// The new poller is *not* started.
    pub fn register(&self, spec: PollSpec) -> Result<(), RegistryError> {
        let key = spec.key().to_string();
        let policy = self.engine.defaults.merged(spec.overrides());
        if let Err(reason) = policy.validate(spec.base_interval()) {
            warn!(poller = %key, %reason, "rejected registration");
            return Err(RegistryError::InvalidPolicy { key, reason });
        }

        let record = PollerRecord::new(&spec, policy, self.engine.registry.next_epoch());
        let previous = self.engine.registry.lock().insert(key.clone(), record);

        match previous {
            Some(previous) => {
                warn!(poller = %key, "replacing registered poller");
                drop(previous);
                self.engine
                    .bus
                    .publish(Event::new(EventKind::PollerReplaced).with_key(key.as_str()));
            }
            None => {
                debug!(poller = %key, interval = ?spec.base_interval(), "registered poller");
                self.engine
                    .bus
                    .publish(Event::new(EventKind::PollerRegistered).with_key(key.as_str()));
            }
        }
        Ok(())
    }

    /// Marks the poller running and schedules its first firing.
    ///
    /// Starting an already running poller is a no-op.
    pub fn start(&self, key: &str) -> Result<(), RegistryError> {
        let mut records = self.engine.registry.lock();
        let Some(rec) = records.get_mut(key) else {
            return Err(unknown(key, "start"));
        };
        if rec.is_running {
            debug!(poller = key, "already running");
            return Ok(());
        }
        rec.is_running = true;
        self.engine.schedule_next(key, rec);

        info!(poller = key, "poller started");
        self.engine
            .bus
            .publish(Event::new(EventKind::PollerStarted).with_key(key));
        Ok(())
    }

    /// Cancels the pending firing and stops scheduling.
    ///
    /// An execution already in flight runs to completion; its result is still
    /// recorded, but nothing new is scheduled.
    pub fn stop(&self, key: &str) -> Result<(), RegistryError> {
        let mut records = self.engine.registry.lock();
        let Some(rec) = records.get_mut(key) else {
            return Err(unknown(key, "stop"));
        };
        rec.timer = None;
        if !rec.is_running {
            return Ok(());
        }
        rec.is_running = false;

        info!(poller = key, "poller stopped");
        self.engine
            .bus
            .publish(Event::new(EventKind::PollerStopped).with_key(key));
        Ok(())
    }

    /// Requests an immediate execution in place of the pending firing.
    ///
    /// The request goes through the same gates as a regular firing: a paused,
    /// circuit-open or (with deduplication) in-flight poller does not execute.
    pub fn trigger_now(&self, key: &str) -> Result<(), RegistryError> {
        let mut records = self.engine.registry.lock();
        let Some(rec) = records.get_mut(key) else {
            return Err(unknown(key, "trigger_now"));
        };
        if !rec.is_running {
            warn!(poller = key, "trigger_now on a stopped poller");
            return Err(RegistryError::NotRunning { key: key.to_string() });
        }
        debug!(poller = key, "immediate execution requested");
        self.engine.arm(key, rec, Duration::ZERO, TimerKind::Execute);
        Ok(())
    }

    /// Discards the poller entirely.
    pub fn remove(&self, key: &str) -> Result<(), RegistryError> {
        let Some(record) = self.engine.registry.lock().remove(key) else {
            return Err(unknown(key, "remove"));
        };
        drop(record);

        info!(poller = key, "poller removed");
        self.engine
            .bus
            .publish(Event::new(EventKind::PollerRemoved).with_key(key));
        Ok(())
    }

    /// Returns a snapshot of the poller's state, or `None` for an unknown key.
    pub fn get_state(&self, key: &str) -> Option<PollerSnapshot> {
        self.engine.registry.snapshot(key)
    }

    /// Returns sorted list of registered keys.
    pub fn list(&self) -> Vec<String> {
        self.engine.registry.list()
    }

    /// Returns the current idle/online flags.
    pub fn environment(&self) -> EnvironmentState {
        self.engine.env.snapshot()
    }

    /// Returns a raw receiver of runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.engine.bus.subscribe()
    }

    /// Attaches the host's environment signals.
    ///
    /// Subscribes to activity, connectivity and visibility, then seeds connectivity
    /// from [`EnvironmentSignalSource::is_online`] and arms the idle deadline.
    /// Listens until [`destroy`](Self::destroy) is called.
    pub fn initialize(&self, source: Arc<dyn EnvironmentSignalSource>) -> Result<(), RegistryError> {
        let mut listeners = self.listeners.lock();
        if listeners.is_some() {
            warn!("initialize called while a signal source is attached");
            return Err(RegistryError::AlreadyInitialized);
        }
        let token = CancellationToken::new();

        // A transition between subscribing and seeding is then seen twice, never lost.
        let activity = source.subscribe_activity();
        let connectivity = source.subscribe_connectivity();
        let visibility = source.subscribe_visibility();

        self.engine.on_connectivity(source.is_online());
        self.engine.on_activity();

        let weak = Arc::downgrade(&self.engine);
        listen(activity, token.clone(), weak.clone(), |engine, ()| {
            engine.on_activity();
        });
        listen(connectivity, token.clone(), weak.clone(), |engine, online| {
            engine.on_connectivity(online);
        });
        listen(visibility, token.clone(), weak, |engine, visibility| {
            match visibility {
                Visibility::Visible => engine.on_activity(),
                Visibility::Hidden => debug!("host hidden"),
            }
        });

        info!(idle_timeout = ?self.engine.env.idle_timeout(), "environment attached");
        *listeners = Some(token);
        Ok(())
    }

    /// Detaches environment listeners and discards every poller.
    ///
    /// The coordinator stays usable: pollers can be registered again and a new
    /// signal source can be attached with [`initialize`](Self::initialize).
    pub fn destroy(&self) {
        if let Some(token) = self.listeners.lock().take() {
            token.cancel();
        }
        self.engine.env.reset();

        let removed = self.engine.registry.drain();
        for key in &removed {
            self.engine
                .bus
                .publish(Event::new(EventKind::PollerRemoved).with_key(key.as_str()));
        }
        info!(removed = removed.len(), "coordinator destroyed");
    }

    /// Destroys the coordinator and waits until subscribers have seen every
    /// event published up to this point, including the final `PollerRemoved`s.
    ///
    /// Executions still in flight are not awaited; their late events are not
    /// delivered to subscribers. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        self.destroy();

        let forwarder = self.forwarder.lock().take();
        if let Some((stop, handle)) = forwarder {
            stop.cancel();
            if let Err(err) = handle.await {
                warn!(error = %err, "subscriber forwarder failed");
            }
        }
        self.subs.shutdown().await;
        info!("coordinator shut down");
    }

    /// Subscribes to the bus and forwards events to the subscriber set until
    /// [`shutdown`](Self::shutdown) stops it.
    pub(crate) fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.engine.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    biased;
                    received = rx.recv() => received,
                    _ = stopped.cancelled() => break,
                };
                match received {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
            // Flush what was published before the stop.
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged");
                    }
                    Err(_) => break,
                }
            }
        });
        *self.forwarder.lock() = Some((stop, handle));
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(token) = self.listeners.get_mut().take() {
            token.cancel();
        }
        if let Some((stop, _)) = self.forwarder.get_mut().take() {
            stop.cancel();
        }
    }
}

fn unknown(key: &str, op: &'static str) -> RegistryError {
    warn!(poller = key, op, "unknown poller");
    RegistryError::UnknownPoller { key: key.to_string() }
}

/// Forwards `stream` items to `on_item` until `token` is cancelled, the stream
/// ends, or the engine is gone.
fn listen<T, F>(mut stream: BoxStream<'static, T>, token: CancellationToken, engine: Weak<Engine>, on_item: F)
where
    T: Send + 'static,
    F: Fn(&Arc<Engine>, T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = stream.next() => item,
            };
            let Some(item) = item else { break };
            let Some(engine) = engine.upgrade() else { break };
            on_item(&engine, item);
        }
    });
}
