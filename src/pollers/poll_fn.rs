//! # Function-backed poll operation (`PollFn`)
//!
//! [`PollFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per execution. Each call owns its own state; share state across
//! executions explicitly through an `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use pollvisor::{PollFn, OperationRef, PollError};
//!
//! let op: OperationRef = PollFn::arc(|_ctx: CancellationToken| async move {
//!     // fetch notifications...
//!     Ok::<_, PollError>(())
//! });
//! # let _ = op;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PollError;
use crate::pollers::operation::PollOperation;

/// Function-backed poll operation.
#[derive(Debug)]
pub struct PollFn<F> {
    f: F,
}

impl<F> PollFn<F> {
    /// Wraps a closure.
    ///
    /// Prefer [`PollFn::arc`] when you immediately need an [`OperationRef`](crate::OperationRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> PollOperation for PollFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PollError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken) -> Result<(), PollError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_each_run_creates_fresh_future() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let op = PollFn::arc(move |_ctx: CancellationToken| {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n % 2 == 0 {
                    Err(PollError::fail(format!("even call {n}")))
                } else {
                    Ok(())
                }
            }
        });

        assert!(op.run(CancellationToken::new()).await.is_ok());
        assert_eq!(
            op.run(CancellationToken::new()).await,
            Err(PollError::fail("even call 2"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
