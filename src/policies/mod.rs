//! Scheduling, backoff and circuit-breaking policies.
//!
//! This module groups the knobs that control **whether** a poller may run and
//! **how long** it waits between runs.
//!
//! ## Contents
//! - [`PollPolicy`] resolved per-poller policy (defaults merged with [`PolicyOverrides`])
//! - [`BackoffPolicy`] how the interval grows while failures accumulate
//! - [`JitterPolicy`] randomization of backed-off intervals
//! - [`CircuitState`] the per-poller breaker state (`Closed` / `Open`)
//!
//! ## Quick wiring
//! ```text
//! PollSpec { base_interval, overrides } ──merge──► PollPolicy
//!      └─► core::engine uses:
//!           - circuit breaker to suppress runs after max_failures
//!           - policy.backoff(base).next(failures) to grow the interval
//! ```

mod backoff;
mod circuit;
mod jitter;
mod poll;

pub use backoff::BackoffPolicy;
pub(crate) use circuit::CircuitBreaker;
pub use circuit::CircuitState;
pub use jitter::JitterPolicy;
pub(crate) use poll::duration_millis;
pub use poll::{PolicyOverrides, PollPolicy};
