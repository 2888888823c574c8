//! # Event subscribers for the pollvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by the coordinator to deliver events from the
//! [`Bus`](crate::events::Bus) to user code.
//!
//! ## Architecture
//! ```text
//!   engine ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet::emit (filtered by accepts)
//!                                                                 │
//!                                              ┌──────────────────┼──────────────┐
//!                                              ▼                  ▼              ▼
//!                                          LogWriter           Metrics         Custom
//! ```

mod set;
mod subscriber;

#[cfg(any(test, feature = "logging"))]
mod embedded;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
