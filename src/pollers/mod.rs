//! # Poll operations and registration specs.
//!
//! This module provides the caller-facing poller types:
//! - [`PollOperation`] - trait for the async unit of work a poller runs
//! - [`PollFn`] - closure-backed operation
//! - [`OperationRef`] - shared handle (`Arc<dyn PollOperation>`)
//! - [`PollSpec`] - key + operation + interval + policy overrides

mod operation;
mod poll_fn;
mod spec;

pub use operation::{ErrorHook, OperationRef, PollOperation};
pub use poll_fn::PollFn;
pub use spec::{PollSpec, PollSpecBuilder};
