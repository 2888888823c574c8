//! # Coordinator configuration.
//!
//! Provides [`CoordinatorConfig`], the centralized settings for one coordinator.
//!
//! Config is used in two ways:
//! 1. **Coordinator creation**: `Coordinator::builder(config)`
//! 2. **Policy defaults**: every `register` merges the `PollSpec` overrides over
//!    [`CoordinatorConfig::defaults`]
//!
//! The struct is `serde`-enabled with durations in milliseconds, so hosts can
//! keep it in their own JSON/TOML settings:
//! ```json
//! { "idle_timeout": 300000, "bus_capacity": 1024,
//!   "defaults": { "max_failures": 5, "circuit_reset_time": 60000 } }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policies::{PollPolicy, duration_millis};

/// Configuration for one coordinator.
///
/// ## Field semantics
/// - `idle_timeout`: inactivity after which the environment counts as idle
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `defaults`: policy inherited by every poller unless overridden
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// No activity signal for this long flips the environment to idle.
    #[serde(with = "duration_millis")]
    pub idle_timeout: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Default policy for all pollers.
    pub defaults: PollPolicy,
}

impl CoordinatorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for CoordinatorConfig {
    /// - `idle_timeout = 5min`
    /// - `bus_capacity = 1024`
    /// - `defaults = PollPolicy::default()`
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5 * 60),
            bus_capacity: 1024,
            defaults: PollPolicy::default(),
        }
    }
}
