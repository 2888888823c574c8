//! # SubscriberSet: per-subscriber delivery of coordinator events
//!
//! [`SubscriberSet`] hands each [`Event`] published by the coordinator to every
//! interested subscriber **without awaiting** their processing.
//!
//! ## Delivery
//! - `emit(&Event)` returns immediately; it is called from the coordinator's
//!   bus forwarder, never from the scheduling engine.
//! - Each subscriber sees only events its [`Subscribe::accepts`] filter admits
//!   (for example one poller key, or only circuit transitions).
//! - Per-subscriber FIFO (queue order). No ordering across subscribers.
//! - Panics inside a subscriber are caught and logged with the poller key of the
//!   event that caused them; the worker keeps running.
//! - A full queue drops the event for that subscriber only and counts it.
//!
//! ## Shutdown
//! [`SubscriberSet::shutdown`] closes every queue and waits until each worker has
//! processed what was already queued. `Coordinator::shutdown` calls it after the
//! last registry events were forwarded.
//!
//! ```text
//!  bus forwarder ─► emit(&Event) ─┬─ accepts? ─► [queue S1] ─► worker S1 ─► on_event()
//!                                 ├─ accepts? ─► [queue S2] ─► worker S2 ─► on_event()
//!                                 └─ accepts? ─► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::events::Event;

use super::Subscribe;

struct Route {
    subscriber: Arc<dyn Subscribe>,
    queue: mpsc::Sender<Arc<Event>>,
    dropped: Arc<AtomicU64>,
}

/// Fan-out of coordinator events to subscribers, one bounded queue and worker each.
pub struct SubscriberSet {
    routes: Mutex<Vec<Route>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut routes = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for subscriber in subs {
            let (queue, rx) = mpsc::channel::<Arc<Event>>(subscriber.queue_capacity().max(1));
            workers.push(tokio::spawn(deliver(Arc::clone(&subscriber), rx)));
            routes.push(Route {
                subscriber,
                queue,
                dropped: Arc::new(AtomicU64::new(0)),
            });
        }

        Self {
            routes: Mutex::new(routes),
            workers: Mutex::new(workers),
        }
    }

    /// Queues one event for every subscriber that accepts it (non-blocking).
    pub fn emit(&self, event: &Event) {
        let routes = self.routes.lock();
        let mut shared: Option<Arc<Event>> = None;

        for route in routes.iter().filter(|r| r.subscriber.accepts(event)) {
            let ev = shared.get_or_insert_with(|| Arc::new(event.clone()));
            match route.queue.try_send(Arc::clone(ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let dropped = route.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        subscriber = route.subscriber.name(),
                        poller = event.key.as_deref(),
                        kind = ?event.kind,
                        dropped,
                        "subscriber queue full; event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber = route.subscriber.name(), kind = ?event.kind, "subscriber closed");
                }
            }
        }
    }

    /// Closes every queue and waits for the workers to drain what was queued.
    ///
    /// Events emitted afterwards are discarded. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let routes = std::mem::take(&mut *self.routes.lock());
        for route in &routes {
            let dropped = route.dropped.load(Ordering::Relaxed);
            if dropped > 0 {
                warn!(subscriber = route.subscriber.name(), dropped, "subscriber lost events to overflow");
            }
        }
        drop(routes);

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.lock().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.lock().len()
    }
}

async fn deliver(subscriber: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(subscriber.on_event(ev.as_ref()))
            .catch_unwind()
            .await;
        if handled.is_err() {
            warn!(
                subscriber = subscriber.name(),
                poller = ev.key.as_deref(),
                kind = ?ev.kind,
                seq = ev.seq,
                "subscriber panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.kind);
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber bug");
        }
    }

    /// Only sees circuit transitions of one poller.
    #[derive(Default)]
    struct CircuitWatch {
        seen: Mutex<Vec<(String, EventKind)>>,
    }

    #[async_trait]
    impl Subscribe for CircuitWatch {
        async fn on_event(&self, ev: &Event) {
            let key = ev.key.as_deref().unwrap_or_default().to_string();
            self.seen.lock().push((key, ev.kind));
        }

        fn accepts(&self, ev: &Event) -> bool {
            ev.key.as_deref() == Some("session")
                && matches!(ev.kind, EventKind::CircuitOpened | EventKind::CircuitClosed)
        }
    }

    #[tokio::test]
    async fn test_fan_out_survives_panicking_subscriber() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![Arc::new(Exploder), rec.clone()]);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::RunStarting).with_key("feed"));
        set.emit(&Event::new(EventKind::RunSucceeded).with_key("feed"));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock(),
            vec![EventKind::RunStarting, EventKind::RunSucceeded]
        );
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_filter_limits_delivery() {
        let watch = Arc::new(CircuitWatch::default());
        let set = SubscriberSet::new(vec![watch.clone()]);

        set.emit(&Event::new(EventKind::CircuitOpened).with_key("session"));
        set.emit(&Event::new(EventKind::CircuitOpened).with_key("feed"));
        set.emit(&Event::new(EventKind::RunFailed).with_key("session"));
        set.emit(&Event::new(EventKind::CircuitClosed).with_key("session"));
        set.shutdown().await;

        assert_eq!(
            *watch.seen.lock(),
            vec![
                ("session".to_string(), EventKind::CircuitOpened),
                ("session".to_string(), EventKind::CircuitClosed),
            ]
        );
    }

    #[tokio::test]
    async fn test_emit_after_shutdown_is_discarded() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()]);
        set.shutdown().await;
        set.shutdown().await;

        set.emit(&Event::new(EventKind::PollerRemoved).with_key("feed"));
        assert!(rec.seen.lock().is_empty());
    }
}
