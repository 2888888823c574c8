//! # Time source for the scheduling engine.
//!
//! [`Clock`] abstracts "what time is it" and "wake me after a delay" so the
//! engine never touches wall-clock primitives directly.
//!
//! [`TokioClock`] is the production implementation. It is driven by the tokio
//! timer, which makes it deterministic under `#[tokio::test(start_paused = true)]`:
//! paused time only moves through `tokio::time::advance` or auto-advance.
//!
//! Cancellation of a pending delay is not the clock's concern. The engine races
//! each sleep against a per-timer [`CancellationToken`](tokio_util::sync::CancellationToken).

use std::time::{Duration, Instant};

use futures::future::BoxFuture;

/// Source of time and delays.
pub trait Clock: Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Returns a future that completes once `delay` has elapsed.
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// Clock backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
