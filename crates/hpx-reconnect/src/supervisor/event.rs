//! Lifecycle notifications and the observer stream.

use std::{
    pin::Pin,
    task::{Context, Poll, ready},
};

use futures_util::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::warn;

use crate::message::WsMessage;

/// Notification emitted by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A connection attempt is starting, either the first one or a
    /// scheduled reconnect.
    Connecting,
    /// A session opened.
    Open,
    /// Inbound data, passed through unmodified.
    Message(WsMessage),
    /// A transport-level error, passed through unmodified.
    Error(String),
    /// The supervisor closed at the caller's request. Terminal.
    Close,
    /// Reconnection attempts ran out. Terminal: no `Close` follows it, so
    /// observers waiting for the end of a supervisor should match both.
    Crash {
        /// Why the supervisor gave up.
        reason: String,
    },
}

impl SupervisorEvent {
    /// Whether this is the last notification the supervisor will emit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Close | Self::Crash { .. })
    }
}

/// Stream of [`SupervisorEvent`]s for one observer.
///
/// Every observer gets its own copy of each notification. The stream ends
/// once the supervisor reaches its terminal state and stops. An observer
/// that falls more than the configured channel capacity behind skips the
/// oldest notifications.
pub struct EventStream {
    inner: BroadcastStream<SupervisorEvent>,
}

impl EventStream {
    pub(crate) fn new(rx: broadcast::Receiver<SupervisorEvent>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
        }
    }

    /// Receive the next notification.
    pub async fn next(&mut self) -> Option<SupervisorEvent> {
        std::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }
}

impl Stream for EventStream {
    type Item = SupervisorEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(event)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "Event observer lagged; dropped notifications");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
