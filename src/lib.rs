//! # pollvisor
//!
//! **Pollvisor** coordinates recurring background polls for long-lived client
//! applications (dashboards, desktop/mobile shells, agents).
//!
//! Each poll is registered under a key with a base interval and a policy. The
//! coordinator runs it on a timer and keeps it well-behaved:
//! - consecutive failures trip a **circuit breaker** that suspends the poll for a reset window,
//! - failures below the threshold grow the interval by **exponential backoff**,
//! - an execution still **in flight** suppresses overlapping firings,
//! - polls **pause** while the host is idle or offline and resume when it comes back.
//!
//! Operation failures never escape: they are absorbed into per-poller state and
//! surfaced through the event bus and an optional per-poller error hook.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   PollSpec   │   │   PollSpec   │   │   PollSpec   │
//!     │ (session #1) │   │ (notifs #2)  │   │  (feed #3)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator                                                      │
//! │  - Registry (one record per key: interval, circuit, timer)        │
//! │  - EnvironmentMonitor (idle / online flags, idle deadline)        │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────▲──────┘
//!        ▼                  ▼                  ▼               │
//!   timer fires        timer fires        timer fires     host signals
//!   run_once()         run_once()         run_once()      (activity,
//!   record result      record result      record result    connectivity,
//!   schedule_next      schedule_next      schedule_next    visibility)
//! ```
//!
//! ### Per-poller lifecycle
//! ```text
//! register ──► start ──► schedule_next ──► Execute timer ──► run_once
//!                              ▲                                 │
//!                              │     ┌─ Ok  ─► failures = 0, interval = base
//!                              │     │
//!                              └─────┤─ Err ─► failures += 1
//!                                    │        ├─ failures ≥ max ─► circuit Open ─► CircuitCheck timer
//!                                    │        └─ otherwise       ─► interval = backoff(failures)
//!                                    │
//!                                    └─ idle/offline ─► no timer until resumed
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Coordination**  | Register, start, stop, trigger and inspect pollers.          | [`Coordinator`], [`PollerSnapshot`]        |
//! | **Pollers**       | Define poll operations as closures or trait objects.         | [`PollOperation`], [`PollFn`], [`PollSpec`]|
//! | **Policies**      | Circuit breaker, backoff, jitter and environment pausing.    | [`PollPolicy`], [`BackoffPolicy`]          |
//! | **Environment**   | Feed idle/online signals from the host.                      | [`EnvironmentSignalSource`]                |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, alerts).         | [`Subscribe`], [`Event`]                   |
//! | **Errors**        | Typed errors for registry misuse and poll outcomes.          | [`RegistryError`], [`PollError`]           |
//! | **Configuration** | Centralize coordinator settings.                             | [`CoordinatorConfig`]                      |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use pollvisor::{ChannelSignalSource, Coordinator, CoordinatorConfig, PollError, PollSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = CoordinatorConfig::default();
//!     cfg.idle_timeout = Duration::from_secs(120);
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn pollvisor::Subscribe>> = vec![Arc::new(pollvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn pollvisor::Subscribe>> = Vec::new();
//!
//!     let coordinator = Coordinator::builder(cfg).with_subscribers(subs).build();
//!
//!     // Host signals: push activity and connectivity from the UI layer.
//!     let signals = Arc::new(ChannelSignalSource::new());
//!     coordinator.initialize(signals.clone())?;
//!
//!     let spec = PollSpec::builder("session", Duration::from_secs(30))
//!         .max_failures(3)
//!         .on_error(|key, err| eprintln!("{key}: {err}"))
//!         .build(|ctx: CancellationToken| async move {
//!             if ctx.is_cancelled() {
//!                 return Err(PollError::Canceled);
//!             }
//!             // refresh session...
//!             Ok(())
//!         });
//!
//!     coordinator.register(spec)?;
//!     coordinator.start("session")?;
//!
//!     signals.record_activity();
//!     tokio::time::sleep(Duration::from_secs(90)).await;
//!
//!     // Discards every poller and flushes events still queued for subscribers.
//!     coordinator.shutdown().await;
//!     Ok(())
//! }
//! ```
mod clock;
mod core;
mod environment;
mod error;
mod events;
mod policies;
mod pollers;
mod subscribers;

// ---- Public re-exports ----

pub use clock::{Clock, TokioClock};
pub use core::{Coordinator, CoordinatorBuilder, CoordinatorConfig, PollerSnapshot};
pub use environment::{ChannelSignalSource, EnvironmentSignalSource, EnvironmentState, Visibility};
pub use error::{PollError, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, CircuitState, JitterPolicy, PolicyOverrides, PollPolicy};
pub use pollers::{ErrorHook, OperationRef, PollFn, PollOperation, PollSpec, PollSpecBuilder};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
