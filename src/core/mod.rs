//! Runtime core: scheduling and lifecycle.
//!
//! The public API from this module is [`Coordinator`] (built through
//! [`CoordinatorBuilder`] from a [`CoordinatorConfig`]) and the read-only
//! [`PollerSnapshot`].
//!
//! Internal modules:
//! - [`engine`]: scheduling decision, execution gating, circuit and backoff bookkeeping;
//! - [`runner`]: executes one call with timeout and panic containment;
//! - [`registry`]: per-key poller records;
//! - [`timer`]: one-shot cancellable timers with stale-firing detection.

mod builder;
mod config;
mod coordinator;
mod engine;
mod registry;
mod runner;
pub(crate) mod timer;

pub use builder::CoordinatorBuilder;
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use registry::PollerSnapshot;
