//! # Poll operation abstraction.
//!
//! A [`PollOperation`] is the unit of work a poller performs on every firing:
//! refresh a session, fetch notifications, reload dashboard stats. The engine
//! invokes it and interprets only its `Ok` / `Err` outcome.
//!
//! The operation receives a [`CancellationToken`] that is cancelled when the
//! execution timeout fires or when the poller's registration is discarded.
//! Honouring it is optional; a cancelled run that returns is simply ignored.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PollError;

/// # Asynchronous poll operation.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use pollvisor::{PollOperation, PollError};
///
/// struct SessionCheck;
///
/// #[async_trait]
/// impl PollOperation for SessionCheck {
///     async fn run(&self, ctx: CancellationToken) -> Result<(), PollError> {
///         if ctx.is_cancelled() {
///             return Err(PollError::Canceled);
///         }
///         // call the session endpoint...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PollOperation: Send + Sync + 'static {
    /// Performs one poll.
    async fn run(&self, ctx: CancellationToken) -> Result<(), PollError>;
}

/// Shared handle to a poll operation.
pub type OperationRef = Arc<dyn PollOperation>;

/// Callback invoked with the poller key and the failure on each failed execution.
pub type ErrorHook = Arc<dyn Fn(&str, &PollError) + Send + Sync>;
