//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging custom event handlers
//! (metrics, audit logs, UI badges) into the coordinator.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only**.
//! - Events are processed sequentially (FIFO) per subscriber.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use pollvisor::{Subscribe, Event, EventKind};
//!
//! struct CircuitAlerts;
//!
//! #[async_trait]
//! impl Subscribe for CircuitAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::CircuitOpened) {
//!             // page someone, flip a UI banner, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "circuit-alerts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, called from this subscriber's worker task.
    async fn on_event(&self, event: &Event);

    /// Subscriber name used in overflow/panic diagnostics.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }

    /// Interest filter, checked before an event is queued. Default: every event.
    ///
    /// Rejected events never occupy this subscriber's queue.
    fn accepts(&self, _event: &Event) -> bool {
        true
    }
}
