//! # Poller registration spec.
//!
//! [`PollSpec`] is what callers hand to
//! [`Coordinator::register`](crate::Coordinator::register): a key, the operation,
//! its nominal interval, optional error callback, and sparse policy overrides.
//!
//! A spec can be created:
//! - **Directly** with [`PollSpec::new`] plus `with_*` chaining
//! - **Fluently** with [`PollSpec::builder`], finishing with a closure or an operation
//!
//! Overrides are merged over the coordinator's default [`PollPolicy`](crate::PollPolicy)
//! at registration, so a spec never needs to spell out every field.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::PollError;
use crate::policies::{JitterPolicy, PolicyOverrides};
use crate::pollers::operation::{ErrorHook, OperationRef};
use crate::pollers::poll_fn::PollFn;

/// Registration spec for one poller.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use pollvisor::{PollSpec, PollError};
///
/// let spec = PollSpec::builder("notifications", Duration::from_secs(30))
///     .max_failures(3)
///     .pause_when_offline(true)
///     .on_error(|key, err| eprintln!("{key}: {err}"))
///     .build(|_ctx: CancellationToken| async { Ok::<_, PollError>(()) });
///
/// assert_eq!(spec.key(), "notifications");
/// assert_eq!(spec.overrides().max_failures, Some(3));
/// ```
#[derive(Clone)]
pub struct PollSpec {
    key: Cow<'static, str>,
    operation: OperationRef,
    base_interval: Duration,
    overrides: PolicyOverrides,
    on_error: Option<ErrorHook>,
}

impl fmt::Debug for PollSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollSpec")
            .field("key", &self.key)
            .field("base_interval", &self.base_interval)
            .field("overrides", &self.overrides)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl PollSpec {
    /// Creates a spec that inherits every policy field from the coordinator defaults.
    pub fn new(
        key: impl Into<Cow<'static, str>>,
        base_interval: Duration,
        operation: OperationRef,
    ) -> Self {
        Self {
            key: key.into(),
            operation,
            base_interval,
            overrides: PolicyOverrides::default(),
            on_error: None,
        }
    }

    /// Creates a builder for constructing a spec with fluent API.
    pub fn builder(key: impl Into<Cow<'static, str>>, base_interval: Duration) -> PollSpecBuilder {
        PollSpecBuilder {
            key: key.into(),
            base_interval,
            overrides: PolicyOverrides::default(),
            on_error: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    pub fn overrides(&self) -> &PolicyOverrides {
        &self.overrides
    }

    pub(crate) fn operation(&self) -> &OperationRef {
        &self.operation
    }

    pub(crate) fn on_error(&self) -> Option<&ErrorHook> {
        self.on_error.as_ref()
    }

    /// Returns a new spec with replaced overrides.
    pub fn with_overrides(mut self, overrides: PolicyOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Returns a new spec with an error callback.
    pub fn with_on_error<H>(mut self, hook: H) -> Self
    where
        H: Fn(&str, &PollError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

/// Fluent builder for [`PollSpec`].
#[derive(Clone)]
pub struct PollSpecBuilder {
    key: Cow<'static, str>,
    base_interval: Duration,
    overrides: PolicyOverrides,
    on_error: Option<ErrorHook>,
}

impl PollSpecBuilder {
    pub fn max_failures(mut self, n: u32) -> Self {
        self.overrides.max_failures = Some(n);
        self
    }

    pub fn circuit_reset_time(mut self, d: Duration) -> Self {
        self.overrides.circuit_reset_time = Some(d);
        self
    }

    pub fn use_backoff(mut self, enabled: bool) -> Self {
        self.overrides.use_backoff = Some(enabled);
        self
    }

    pub fn max_backoff_interval(mut self, d: Duration) -> Self {
        self.overrides.max_backoff_interval = Some(d);
        self
    }

    pub fn pause_on_idle(mut self, enabled: bool) -> Self {
        self.overrides.pause_on_idle = Some(enabled);
        self
    }

    pub fn pause_when_offline(mut self, enabled: bool) -> Self {
        self.overrides.pause_when_offline = Some(enabled);
        self
    }

    pub fn dedupe_requests(mut self, enabled: bool) -> Self {
        self.overrides.dedupe_requests = Some(enabled);
        self
    }

    pub fn jitter(mut self, jitter: JitterPolicy) -> Self {
        self.overrides.jitter = Some(jitter);
        self
    }

    /// Sets (or with `None`, explicitly clears) the execution timeout.
    pub fn execution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.overrides.execution_timeout = Some(timeout);
        self
    }

    pub fn on_error<H>(mut self, hook: H) -> Self
    where
        H: Fn(&str, &PollError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Builds the `PollSpec` from a closure.
    pub fn build<F, Fut>(self, f: F) -> PollSpec
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PollError>> + Send + 'static,
    {
        self.build_from(PollFn::arc(f))
    }

    /// Builds the `PollSpec` from an existing operation.
    pub fn build_from(self, operation: OperationRef) -> PollSpec {
        PollSpec {
            key: self.key,
            operation,
            base_interval: self.base_interval,
            overrides: self.overrides,
            on_error: self.on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_only_explicit_overrides() {
        let spec = PollSpec::builder("dashboard", Duration::from_secs(60))
            .dedupe_requests(false)
            .execution_timeout(None)
            .build(|_ctx: CancellationToken| async { Ok(()) });

        assert_eq!(spec.base_interval(), Duration::from_secs(60));
        assert_eq!(spec.overrides().dedupe_requests, Some(false));
        assert_eq!(spec.overrides().execution_timeout, Some(None));
        assert_eq!(spec.overrides().max_failures, None);
        assert!(spec.on_error().is_none());
    }

    #[test]
    fn test_new_with_hook() {
        let op = PollFn::arc(|_ctx: CancellationToken| async { Ok(()) });
        let spec = PollSpec::new("session", Duration::from_secs(5), op).with_on_error(|_, _| {});
        assert!(spec.on_error().is_some());
        assert_eq!(spec.overrides(), &PolicyOverrides::default());
    }
}
