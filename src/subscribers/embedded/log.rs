//! # LogWriter: renders events through `tracing`
//!
//! A minimal subscriber that turns each [`Event`] into one `tracing` record,
//! so a host that already installs a `tracing` subscriber gets poller activity
//! in its normal log stream.
//!
//! ## Levels
//! - `debug`: run starting / succeeded / skipped, registry bookkeeping
//! - `info`: circuit and environment transitions
//! - `warn`: failures, timeouts, backoff

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::PollerRegistered
            | EventKind::PollerReplaced
            | EventKind::PollerStarted
            | EventKind::PollerStopped
            | EventKind::PollerRemoved => {
                debug!(key, kind = ?e.kind, "poller");
            }
            EventKind::RunStarting => debug!(key, run = e.run, "[starting]"),
            EventKind::RunSucceeded => debug!(key, run = e.run, "[succeeded]"),
            EventKind::RunSkipped => {
                debug!(key, reason = e.reason.as_deref(), "[skipped]");
            }
            EventKind::RunFailed => warn!(
                key,
                run = e.run,
                failures = e.failures,
                err = e.reason.as_deref(),
                "[failed]"
            ),
            EventKind::TimeoutHit => warn!(key, timeout_ms = e.timeout_ms, "[timeout]"),
            EventKind::BackoffScheduled => warn!(
                key,
                delay_ms = e.delay_ms,
                failures = e.failures,
                "[backoff]"
            ),
            EventKind::CircuitOpened => info!(
                key,
                failures = e.failures,
                reset_ms = e.delay_ms,
                "[circuit-open]"
            ),
            EventKind::CircuitClosed => info!(key, "[circuit-closed]"),
            EventKind::EnvironmentIdle => info!("[idle]"),
            EventKind::EnvironmentActive => info!("[active]"),
            EventKind::ConnectivityLost => info!("[offline]"),
            EventKind::ConnectivityRestored => info!("[online]"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const ALL: [EventKind; 17] = [
        EventKind::PollerRegistered,
        EventKind::PollerReplaced,
        EventKind::PollerStarted,
        EventKind::PollerStopped,
        EventKind::PollerRemoved,
        EventKind::RunStarting,
        EventKind::RunSucceeded,
        EventKind::RunFailed,
        EventKind::RunSkipped,
        EventKind::TimeoutHit,
        EventKind::BackoffScheduled,
        EventKind::CircuitOpened,
        EventKind::CircuitClosed,
        EventKind::EnvironmentIdle,
        EventKind::EnvironmentActive,
        EventKind::ConnectivityLost,
        EventKind::ConnectivityRestored,
    ];

    #[tokio::test]
    async fn test_every_kind_is_rendered() {
        let writer = LogWriter::new();
        assert_eq!(writer.name(), "LogWriter");

        for kind in ALL {
            let full = Event::new(kind)
                .with_key("session")
                .with_reason("503")
                .with_run(2)
                .with_failures(3)
                .with_delay(Duration::from_secs(4))
                .with_timeout(Duration::from_millis(250));
            assert!(writer.accepts(&full));
            writer.on_event(&full).await;
            writer.on_event(&Event::new(kind)).await;
        }
    }
}
