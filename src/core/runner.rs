//! # Run a single execution of a poll operation.
//!
//! Executes one call of a [`PollOperation`](crate::pollers::PollOperation) with an
//! optional timeout and panic containment, and publishes the events that only the
//! runner can observe.
//!
//! ## Event flow
//!
//! ```text
//! Start:
//!   publish RunStarting → operation.run(ctx)
//!
//! Timeout:
//!   timeout elapsed → cancel ctx → publish TimeoutHit → Err(Timeout)
//!
//! Panic:
//!   operation panics → caught → Err(Panicked)
//! ```
//!
//! ## Rules
//! - The terminal `RunSucceeded` / `RunFailed` events are published by the engine,
//!   which knows the failure count after the result is recorded.
//! - The operation context is a child of the registration token; cancelling it
//!   on timeout does not affect the registration.
//! - Timeouts are measured on the injected [`Clock`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::PollError;
use crate::events::{Bus, Event, EventKind};
use crate::pollers::OperationRef;

/// Everything needed to run one execution outside the registry lock.
pub(crate) struct RunTicket {
    /// Registration epoch the execution belongs to.
    pub(crate) epoch: u64,
    /// 1-based execution number within the registration.
    pub(crate) run: u64,
    pub(crate) operation: OperationRef,
    pub(crate) timeout: Option<Duration>,
    pub(crate) ctx: CancellationToken,
}

/// Executes `ticket` once, publishing `RunStarting` and (on timeout) `TimeoutHit`.
pub(crate) async fn run_once(clock: &dyn Clock, bus: &Bus, key: &str, ticket: &RunTicket) -> Result<(), PollError> {
    bus.publish(Event::new(EventKind::RunStarting).with_key(key).with_run(ticket.run));

    let call = AssertUnwindSafe(ticket.operation.run(ticket.ctx.clone())).catch_unwind();

    match ticket.timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => {
            tokio::select! {
                res = call => res.unwrap_or_else(|payload| Err(panicked(payload))),
                _ = clock.sleep(dur) => {
                    ticket.ctx.cancel();
                    bus.publish(
                        Event::new(EventKind::TimeoutHit)
                            .with_key(key)
                            .with_run(ticket.run)
                            .with_timeout(dur),
                    );
                    Err(PollError::Timeout { timeout: dur })
                }
            }
        }
        None => call.await.unwrap_or_else(|payload| Err(panicked(payload))),
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> PollError {
    let info = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    PollError::Panicked { info }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::pollers::PollFn;

    fn ticket(operation: OperationRef, timeout: Option<Duration>) -> RunTicket {
        RunTicket {
            epoch: 1,
            run: 1,
            operation,
            timeout,
            ctx: CancellationToken::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_context() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let op = PollFn::arc(|ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(PollError::Canceled)
        });
        let t = ticket(op, Some(Duration::from_millis(50)));

        let res = run_once(&TokioClock, &bus, "slow", &t).await;
        assert_eq!(res, Err(PollError::Timeout { timeout: Duration::from_millis(50) }));
        assert!(t.ctx.is_cancelled());

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RunStarting);
        let hit = rx.recv().await.unwrap();
        assert_eq!(hit.kind, EventKind::TimeoutHit);
        assert_eq!(hit.timeout_ms, Some(50));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let bus = Bus::new(16);
        let op = PollFn::arc(|_ctx: CancellationToken| async move {
            if true {
                panic!("boom");
            }
            Ok(())
        });

        let res = run_once(&TokioClock, &bus, "p", &ticket(op, None)).await;
        assert_eq!(res, Err(PollError::Panicked { info: "boom".into() }));
    }

    #[tokio::test]
    async fn test_result_passes_through() {
        let bus = Bus::new(16);
        let ok = PollFn::arc(|_ctx: CancellationToken| async { Ok(()) });
        let bad = PollFn::arc(|_ctx: CancellationToken| async { Err(PollError::fail("503")) });

        assert_eq!(run_once(&TokioClock, &bus, "k", &ticket(ok, Some(Duration::from_secs(1)))).await, Ok(()));
        assert_eq!(
            run_once(&TokioClock, &bus, "k", &ticket(bad, None)).await,
            Err(PollError::fail("503"))
        );
    }
}
