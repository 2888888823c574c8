//! # One-shot cancellable timers.
//!
//! [`arm`] spawns a tokio task that races a [`Clock`] sleep against a
//! [`CancellationToken`] and runs a callback if the sleep wins. The returned
//! [`TimerHandle`] owns the token: dropping or replacing the handle cancels the
//! firing, which is how the registry keeps "at most one pending timer per poller".
//!
//! Every timer gets a process-unique id. Callbacks receive it so the receiver
//! can tell whether the firing is still the one it armed (a replaced timer whose
//! callback was already running is stale and must be ignored).
//!
//! Once the callback starts, cancellation no longer applies: an execution that
//! began from a timer finishes even if the poller is stopped meanwhile.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

static TIMER_SEQ: AtomicU64 = AtomicU64::new(0);

/// What a pending timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Run the poll operation.
    Execute,
    /// Re-check an open circuit breaker.
    CircuitCheck,
    /// Flip the environment to idle.
    IdleDeadline,
}

/// Ownership of one pending firing. Cancels it on drop.
#[derive(Debug)]
pub(crate) struct TimerHandle {
    id: u64,
    kind: TimerKind,
    token: CancellationToken,
}

impl TimerHandle {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn kind(&self) -> TimerKind {
        self.kind
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Arms a timer that calls `fire(id)` after `delay` unless cancelled first.
///
/// Must be called from within a tokio runtime.
pub(crate) fn arm<F, Fut>(clock: &dyn Clock, delay: Duration, kind: TimerKind, fire: F) -> TimerHandle
where
    F: FnOnce(u64) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let id = TIMER_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let sleep = clock.sleep(delay);

    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancelled.cancelled() => {}
            _ = sleep => fire(id).await,
        }
    });

    TimerHandle { id, kind, token }
}
