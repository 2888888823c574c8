//! Environment awareness: idle/active and online/offline.
//!
//! - [`EnvironmentSignalSource`] the host-facing trait the coordinator subscribes to
//! - [`ChannelSignalSource`] a channel-backed adapter hosts can push signals into
//! - [`EnvironmentState`] snapshot of the derived flags
//!
//! The monitor itself is internal; the coordinator reacts to its transitions by
//! pausing or resuming pollers.

mod monitor;
mod signals;

pub(crate) use monitor::EnvironmentMonitor;
pub use monitor::EnvironmentState;
pub use signals::{ChannelSignalSource, EnvironmentSignalSource, Visibility};
