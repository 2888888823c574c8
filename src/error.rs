//! Error types used by the pollvisor runtime and poll operations.
//!
//! This module defines two main error enums:
//!
//! - [`RegistryError`]: caller misuse of the coordinator API (unknown key, bad policy).
//! - [`PollError`]: the outcome of a failed poll operation.
//!
//! Both types provide `as_label` for logging/metrics; [`PollError`] also has `as_message`.
//! Neither is ever raised out of the scheduling engine itself: operation failures
//! are absorbed into per-poller state, and registry misuse is logged and returned.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the coordinator's registry API.
///
/// These are caller bugs rather than runtime faults. Every variant is also logged
/// with `tracing::warn!` at the point it is produced, so ignoring the `Result`
/// is acceptable for fire-and-forget callers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No poller is registered under the given key.
    #[error("poller {key:?} is not registered")]
    UnknownPoller {
        /// The key that was looked up.
        key: String,
    },

    /// The merged policy for a registration is not usable.
    #[error("invalid policy for poller {key:?}: {reason}")]
    InvalidPolicy {
        /// The key being registered.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The operation requires a started poller.
    #[error("poller {key:?} is not running")]
    NotRunning {
        /// The key that was looked up.
        key: String,
    },

    /// `initialize` was called while a signal source is already attached.
    #[error("environment signal source already attached")]
    AlreadyInitialized,
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pollvisor::RegistryError;
    ///
    /// let err = RegistryError::UnknownPoller { key: "session".into() };
    /// assert_eq!(err.as_label(), "registry_unknown_poller");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::UnknownPoller { .. } => "registry_unknown_poller",
            RegistryError::InvalidPolicy { .. } => "registry_invalid_policy",
            RegistryError::NotRunning { .. } => "registry_not_running",
            RegistryError::AlreadyInitialized => "registry_already_initialized",
        }
    }
}

/// # Errors produced by a poll operation.
///
/// Every variant counts as one failure toward the poller's
/// consecutive-failure total. None are re-raised to callers; they reach user code
/// only through the poller's `on_error` hook and the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The operation reported a failure.
    #[error("poll failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// The operation exceeded the poller's execution timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The operation observed cancellation of its context and gave up.
    #[error("context cancelled")]
    Canceled,

    /// The operation panicked; the panic was caught by the engine.
    #[error("operation panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text, when it was a string.
        info: String,
    },
}

impl PollError {
    /// Shorthand for [`PollError::Fail`].
    ///
    /// # Example
    /// ```
    /// use pollvisor::PollError;
    ///
    /// let err = PollError::fail("503 from /session");
    /// assert_eq!(err.to_string(), "poll failed: 503 from /session");
    /// ```
    pub fn fail(reason: impl Into<String>) -> Self {
        PollError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PollError::Fail { .. } => "poll_failed",
            PollError::Timeout { .. } => "poll_timeout",
            PollError::Canceled => "poll_canceled",
            PollError::Panicked { .. } => "poll_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PollError::Fail { reason } => format!("error: {reason}"),
            PollError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            PollError::Canceled => "context cancelled".to_string(),
            PollError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(PollError::fail("x").as_label(), "poll_failed");
        assert_eq!(
            PollError::Timeout {
                timeout: Duration::from_secs(1)
            }
            .as_label(),
            "poll_timeout"
        );
        assert_eq!(
            RegistryError::NotRunning { key: "a".into() }.as_label(),
            "registry_not_running"
        );
    }

    #[test]
    fn test_messages_carry_details() {
        let err = PollError::Panicked {
            info: "boom".into(),
        };
        assert_eq!(err.as_message(), "panic: boom");
        let err = RegistryError::InvalidPolicy {
            key: "feed".into(),
            reason: "base_interval must be > 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid policy for poller \"feed\": base_interval must be > 0"
        );
    }
}
