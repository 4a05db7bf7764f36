// ── Reactive roster stream ──
//
// Subscription handle over the poller's snapshot channel.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::RosterSnapshot;

/// A subscription to the published roster.
///
/// Provides point-in-time access plus change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct RosterStream {
    current: Arc<RosterSnapshot>,
    receiver: watch::Receiver<Arc<RosterSnapshot>>,
}

impl RosterStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<RosterSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<RosterSnapshot> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<RosterSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish. Returns `None` once the router is dropped.
    pub async fn changed(&mut self) -> Option<Arc<RosterSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` that yields the current snapshot first,
    /// then every subsequent publish.
    pub fn into_stream(self) -> RosterWatchStream {
        RosterWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the snapshot `watch::Receiver`.
pub struct RosterWatchStream {
    inner: WatchStream<Arc<RosterSnapshot>>,
}

impl Stream for RosterWatchStream {
    type Item = Arc<RosterSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
