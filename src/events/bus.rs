//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the engine, registry and environment monitor.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Receivers:
//!   engine      ──┐
//!   registry    ──┼──────► Bus ───┬──► subscriber_listener ──► SubscriberSet
//!   environment ──┘               └──► Coordinator::subscribe() (raw receivers)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks, so it is safe under the registry lock.
//! - **Bounded capacity**: one ring buffer of recent events shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers. Dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_later_events_only() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::PollerStarted));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::PollerStopped).with_key("a"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::PollerStopped);
        assert_eq!(ev.key.as_deref(), Some("a"));
    }
}
