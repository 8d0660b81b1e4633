//! Transport capability consumed by the supervisor.
//!
//! A [`Transport`] dials sessions; a [`Session`] is the supervisor-owned
//! handle to one physical connection. Sessions report what happens on the
//! wire through [`SessionEvents`], which stamps every event with the
//! session's [`ConnectionEpoch`] so the supervisor can tell the current
//! session apart from ones it already replaced.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{
    error::TransportResult,
    message::{CloseFrame, WsMessage},
};

/// Sequence number of a physical session, incremented on every dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConnectionEpoch(pub u64);

impl ConnectionEpoch {
    /// The epoch that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Something a session observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The handshake completed and traffic can flow.
    Open,
    /// The peer sent a liveness probe. The supervisor answers with
    /// [`Session::pong`] using the same payload.
    Ping(Bytes),
    /// Inbound application data.
    Message(WsMessage),
    /// A transport-level error. Does not end the session by itself.
    Error(String),
    /// The session is finished, with the close frame if one was exchanged.
    /// Must be the last event a session reports.
    Close(Option<CloseFrame>),
}

/// Sender half a transport uses to report events for one session.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    epoch: ConnectionEpoch,
    tx: mpsc::UnboundedSender<(ConnectionEpoch, SessionEvent)>,
}

impl SessionEvents {
    pub(crate) fn new(
        epoch: ConnectionEpoch,
        tx: mpsc::UnboundedSender<(ConnectionEpoch, SessionEvent)>,
    ) -> Self {
        Self { epoch, tx }
    }

    /// Epoch of the session these events belong to.
    pub fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    /// Report an event. Returns `false` once the supervisor has stopped
    /// listening, at which point the session should wind down.
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.tx.send((self.epoch, event)).is_ok()
    }

    /// Whether the supervisor has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Factory for physical sessions.
///
/// `create_session` must not block: it starts the dial and returns a handle
/// immediately, reporting progress through `events`. Every session must
/// eventually report [`SessionEvent::Close`], including when dialling fails.
pub trait Transport: Send + Sync + 'static {
    /// Session handle type produced by this transport.
    type Session: Session;

    /// Begin connecting to `address`.
    fn create_session(&self, address: &str, events: SessionEvents) -> Self::Session;
}

/// Supervisor-owned handle to one physical session.
///
/// Methods are fire-and-forget. Dropping the handle releases the session;
/// transports should close the underlying socket when that happens.
pub trait Session: Send + 'static {
    /// Transmit a payload unmodified.
    fn send(&mut self, message: WsMessage) -> TransportResult<()>;

    /// Acknowledge a peer liveness probe.
    ///
    /// Transports whose protocol library answers pings on its own should
    /// make this a no-op so the peer sees a single pong.
    fn pong(&mut self, payload: Bytes) -> TransportResult<()>;

    /// Request a close handshake. The session reports
    /// [`SessionEvent::Close`] once it is done.
    fn close(&mut self, frame: CloseFrame) -> TransportResult<()>;
}
