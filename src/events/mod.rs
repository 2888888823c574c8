//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the coordinator.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `core::coordinator` (registry lifecycle), `core::engine` (run outcomes,
//!   circuit, backoff, environment sweeps), `core::runner` (run start, timeouts).
//! - **Consumers**: the coordinator's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from `Coordinator::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
