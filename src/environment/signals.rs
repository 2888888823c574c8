//! # Environment signal source.
//!
//! The host platform reports user activity, connectivity changes and
//! foreground/background transitions through an [`EnvironmentSignalSource`].
//! The coordinator depends only on this trait; platform glue (a desktop event
//! loop, a mobile app-state bridge, a browser shim) supplies the adapter.
//!
//! [`ChannelSignalSource`] is a ready-made adapter backed by broadcast channels:
//! the host pushes signals in with plain method calls.
//!
//! ```text
//! host glue ──record_activity()/set_online()/set_visibility()──► ChannelSignalSource
//!                                                                    │ streams
//!                                                                    ▼
//!                                                    Coordinator::initialize(source)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

/// Foreground/background state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The app came to the foreground / the page became visible.
    Visible,
    /// The app went to the background / the page was hidden.
    Hidden,
}

/// Platform notifications consumed by the environment monitor.
///
/// Streams are subscribed once per `initialize` and dropped on `destroy`.
pub trait EnvironmentSignalSource: Send + Sync + 'static {
    /// One item per user activity (press, move, scroll, keypress equivalents).
    fn subscribe_activity(&self) -> BoxStream<'static, ()>;

    /// Connectivity reports: `true` = online, `false` = offline.
    fn subscribe_connectivity(&self) -> BoxStream<'static, bool>;

    /// Foreground/background transitions.
    fn subscribe_visibility(&self) -> BoxStream<'static, Visibility>;

    /// Connectivity at attach time. Defaults to online.
    fn is_online(&self) -> bool {
        true
    }
}

const CHANNEL_CAPACITY: usize = 64;

/// Channel-backed [`EnvironmentSignalSource`] driven by explicit method calls.
///
/// Signals sent while nothing is subscribed are dropped, except that the last
/// connectivity value is remembered and reported through
/// [`is_online`](EnvironmentSignalSource::is_online).
pub struct ChannelSignalSource {
    activity: broadcast::Sender<()>,
    connectivity: broadcast::Sender<bool>,
    visibility: broadcast::Sender<Visibility>,
    online: AtomicBool,
}

impl Default for ChannelSignalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSignalSource {
    pub fn new() -> Self {
        let (activity, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (connectivity, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (visibility, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            activity,
            connectivity,
            visibility,
            online: AtomicBool::new(true),
        }
    }

    /// Reports one user activity.
    pub fn record_activity(&self) {
        let _ = self.activity.send(());
    }

    /// Reports a connectivity change.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        let _ = self.connectivity.send(online);
    }

    /// Reports a foreground/background transition.
    pub fn set_visibility(&self, visibility: Visibility) {
        let _ = self.visibility.send(visibility);
    }
}

impl EnvironmentSignalSource for ChannelSignalSource {
    fn subscribe_activity(&self) -> BoxStream<'static, ()> {
        receiver_stream(self.activity.subscribe())
    }

    fn subscribe_connectivity(&self) -> BoxStream<'static, bool> {
        receiver_stream(self.connectivity.subscribe())
    }

    fn subscribe_visibility(&self) -> BoxStream<'static, Visibility> {
        receiver_stream(self.visibility.subscribe())
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Adapts a broadcast receiver into a stream; lagged gaps are skipped.
fn receiver_stream<T>(rx: broadcast::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + 'static,
{
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}
