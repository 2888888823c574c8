//! # Per-poller scheduling policy.
//!
//! [`PollPolicy`] is the fully-resolved policy a registered poller runs under.
//! Coordinator-wide defaults live in
//! [`CoordinatorConfig::defaults`](crate::CoordinatorConfig::defaults); each
//! [`PollSpec`](crate::PollSpec) carries sparse [`PolicyOverrides`] that are merged
//! over those defaults at registration time.
//!
//! ## Defaults
//! | Field                  | Default |
//! |------------------------|---------|
//! | `max_failures`         | 5       |
//! | `circuit_reset_time`   | 60s     |
//! | `use_backoff`          | true    |
//! | `max_backoff_interval` | 300s    |
//! | `pause_on_idle`        | true    |
//! | `pause_when_offline`   | true    |
//! | `dedupe_requests`      | true    |
//! | `jitter`               | None    |
//! | `execution_timeout`    | none    |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policies::backoff::BackoffPolicy;
use crate::policies::jitter::JitterPolicy;

/// Resolved scheduling policy of one poller. Immutable after registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Consecutive failures before the circuit opens (`>= 1`).
    pub max_failures: u32,
    /// How long an open circuit stays open.
    #[serde(with = "duration_millis")]
    pub circuit_reset_time: Duration,
    /// Grow the interval exponentially while failures accumulate.
    pub use_backoff: bool,
    /// Ceiling for the backed-off interval.
    #[serde(with = "duration_millis")]
    pub max_backoff_interval: Duration,
    /// Suppress scheduling while the environment is idle.
    pub pause_on_idle: bool,
    /// Suppress scheduling while offline.
    pub pause_when_offline: bool,
    /// Never run two executions of this poller at once.
    pub dedupe_requests: bool,
    /// Randomization of backed-off intervals.
    pub jitter: JitterPolicy,
    /// Fail an execution that runs longer than this. `None` waits forever.
    #[serde(with = "option_duration_millis")]
    pub execution_timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            circuit_reset_time: Duration::from_secs(60),
            use_backoff: true,
            max_backoff_interval: Duration::from_secs(300),
            pause_on_idle: true,
            pause_when_offline: true,
            dedupe_requests: true,
            jitter: JitterPolicy::None,
            execution_timeout: None,
        }
    }
}

impl PollPolicy {
    /// Applies `overrides` on top of `self`.
    pub fn merged(&self, overrides: &PolicyOverrides) -> PollPolicy {
        PollPolicy {
            max_failures: overrides.max_failures.unwrap_or(self.max_failures),
            circuit_reset_time: overrides
                .circuit_reset_time
                .unwrap_or(self.circuit_reset_time),
            use_backoff: overrides.use_backoff.unwrap_or(self.use_backoff),
            max_backoff_interval: overrides
                .max_backoff_interval
                .unwrap_or(self.max_backoff_interval),
            pause_on_idle: overrides.pause_on_idle.unwrap_or(self.pause_on_idle),
            pause_when_offline: overrides
                .pause_when_offline
                .unwrap_or(self.pause_when_offline),
            dedupe_requests: overrides.dedupe_requests.unwrap_or(self.dedupe_requests),
            jitter: overrides.jitter.unwrap_or(self.jitter),
            execution_timeout: overrides.execution_timeout.unwrap_or(self.execution_timeout),
        }
    }

    /// Checks the policy against a poller's base interval.
    ///
    /// Returns a human-readable reason on the first violated rule.
    pub fn validate(&self, base_interval: Duration) -> Result<(), String> {
        if base_interval.is_zero() {
            return Err("base_interval must be > 0".into());
        }
        if self.max_failures == 0 {
            return Err("max_failures must be >= 1".into());
        }
        if self.max_backoff_interval < base_interval {
            return Err(format!(
                "max_backoff_interval {:?} is below base_interval {:?}",
                self.max_backoff_interval, base_interval
            ));
        }
        if self.execution_timeout.is_some_and(|t| t.is_zero()) {
            return Err("execution_timeout must be > 0 when set".into());
        }
        Ok(())
    }

    /// Backoff curve for a poller with the given base interval.
    pub fn backoff(&self, base_interval: Duration) -> BackoffPolicy {
        BackoffPolicy::doubling(base_interval, self.max_backoff_interval).with_jitter(self.jitter)
    }
}

/// Sparse per-poller overrides. `None` inherits the coordinator default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolicyOverrides {
    pub max_failures: Option<u32>,
    pub circuit_reset_time: Option<Duration>,
    pub use_backoff: Option<bool>,
    pub max_backoff_interval: Option<Duration>,
    pub pause_on_idle: Option<bool>,
    pub pause_when_offline: Option<bool>,
    pub dedupe_requests: Option<bool>,
    pub jitter: Option<JitterPolicy>,
    /// `Some(None)` explicitly disables a default timeout.
    pub execution_timeout: Option<Option<Duration>>,
}

/// Serde support for `Duration` as milliseconds.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_table() {
        let p = PollPolicy::default();
        assert_eq!(p.max_failures, 5);
        assert_eq!(p.circuit_reset_time, Duration::from_millis(60_000));
        assert!(p.use_backoff);
        assert_eq!(p.max_backoff_interval, Duration::from_millis(300_000));
        assert!(p.pause_on_idle);
        assert!(p.pause_when_offline);
        assert!(p.dedupe_requests);
        assert_eq!(p.execution_timeout, None);
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let overrides = PolicyOverrides {
            max_failures: Some(3),
            pause_on_idle: Some(false),
            execution_timeout: Some(Some(Duration::from_secs(2))),
            ..Default::default()
        };
        let merged = PollPolicy::default().merged(&overrides);
        assert_eq!(merged.max_failures, 3);
        assert!(!merged.pause_on_idle);
        assert!(merged.pause_when_offline);
        assert_eq!(merged.execution_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_explicit_none_clears_default_timeout() {
        let defaults = PollPolicy {
            execution_timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let overrides = PolicyOverrides {
            execution_timeout: Some(None),
            ..Default::default()
        };
        assert_eq!(defaults.merged(&overrides).execution_timeout, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let p = PollPolicy::default();
        assert!(p.validate(Duration::ZERO).is_err());
        assert!(p.validate(Duration::from_secs(600)).is_err());
        assert!(
            PollPolicy {
                max_failures: 0,
                ..Default::default()
            }
            .validate(Duration::from_secs(1))
            .is_err()
        );
        assert!(p.validate(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_serde_uses_millis() {
        let json = serde_json::to_value(PollPolicy::default()).unwrap();
        assert_eq!(json["circuit_reset_time"], 60_000);
        assert_eq!(json["execution_timeout"], serde_json::Value::Null);

        let parsed: PollPolicy =
            serde_json::from_str(r#"{"max_failures": 2, "circuit_reset_time": 2000}"#).unwrap();
        assert_eq!(parsed.max_failures, 2);
        assert_eq!(parsed.circuit_reset_time, Duration::from_secs(2));
        assert!(parsed.dedupe_requests);
    }
}
