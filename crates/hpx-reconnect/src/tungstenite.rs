//! Default [`Transport`] backed by `tokio-tungstenite`.
//!
//! Each session runs in its own task. The task dials, reports what it sees
//! through [`SessionEvents`] and executes commands queued by the
//! [`TungsteniteSession`] handle. Dropping the handle closes the socket.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, time::timeout};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame as WsCloseFrame, frame::coding::CloseCode as WsCloseCode},
    },
};
use tracing::{debug, warn};

use crate::{
    error::{TransportError, TransportResult},
    message::{CloseFrame, WsMessage},
    transport::{Session, SessionEvent, SessionEvents, Transport},
};

/// Dials `ws://` and `wss://` addresses with `tokio-tungstenite`.
#[derive(Clone, Debug)]
pub struct TungsteniteTransport {
    connect_timeout: Duration,
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TungsteniteTransport {
    /// Create a transport with a 10 second connect timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for dialling and for the close handshake.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Transport for TungsteniteTransport {
    type Session = TungsteniteSession;

    fn create_session(&self, address: &str, events: SessionEvents) -> Self::Session {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(
            address.to_string(),
            self.connect_timeout,
            events,
            cmd_rx,
        ));
        TungsteniteSession { cmd_tx }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Send(WsMessage),
    Close(CloseFrame),
}

/// Handle to one `tokio-tungstenite` session task.
#[derive(Debug)]
pub struct TungsteniteSession {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl TungsteniteSession {
    fn queue(&self, cmd: SessionCommand) -> TransportResult<()> {
        self.cmd_tx.send(cmd).map_err(|_| {
            TransportError::connection_closed(Some("Session task stopped".to_string()))
        })
    }
}

impl Session for TungsteniteSession {
    fn send(&mut self, message: WsMessage) -> TransportResult<()> {
        self.queue(SessionCommand::Send(message))
    }

    /// No-op: tungstenite already queues a pong for every ping it reads.
    fn pong(&mut self, _payload: Bytes) -> TransportResult<()> {
        Ok(())
    }

    fn close(&mut self, frame: CloseFrame) -> TransportResult<()> {
        self.queue(SessionCommand::Close(frame))
    }
}

fn to_ws_message(message: WsMessage) -> Message {
    match message {
        WsMessage::Text(text) => Message::text(text),
        WsMessage::Binary(data) => Message::binary(data),
    }
}

fn to_ws_close_frame(frame: CloseFrame) -> WsCloseFrame {
    WsCloseFrame {
        code: WsCloseCode::from(frame.code.as_u16()),
        reason: frame.reason.into(),
    }
}

fn from_ws_close_frame(frame: WsCloseFrame) -> CloseFrame {
    CloseFrame::new(u16::from(frame.code), frame.reason.as_str())
}

async fn run_session(
    address: String,
    connect_timeout: Duration,
    events: SessionEvents,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let epoch = events.epoch().0;
    debug!(epoch, address = %address, "Dialling WebSocket");

    let dial = timeout(connect_timeout, connect_async(address.as_str()));
    tokio::pin!(dial);

    let ws = loop {
        tokio::select! {
            result = &mut dial => match result {
                Ok(Ok((ws, _response))) => break ws,
                Ok(Err(err)) => {
                    events.emit(SessionEvent::Error(TransportError::from(err).to_string()));
                    events.emit(SessionEvent::Close(None));
                    return;
                }
                Err(_) => {
                    let err = TransportError::timeout(connect_timeout);
                    events.emit(SessionEvent::Error(err.to_string()));
                    events.emit(SessionEvent::Close(None));
                    return;
                }
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Close(frame)) => {
                    events.emit(SessionEvent::Close(Some(frame)));
                    return;
                }
                Some(other) => debug!(epoch, command = ?other, "Dropping command issued before open"),
                None => return,
            },
        }
    };

    events.emit(SessionEvent::Open);
    let (mut write, mut read) = ws.split();
    let mut peer_close: Option<CloseFrame> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Send(message)) => {
                    if let Err(err) = write.send(to_ws_message(message)).await {
                        events.emit(SessionEvent::Error(TransportError::from(err).to_string()));
                    }
                }
                Some(SessionCommand::Close(frame)) => {
                    if let Err(err) = write.send(Message::Close(Some(to_ws_close_frame(frame.clone())))).await {
                        debug!(epoch, error = %err, "Failed to send close frame");
                    }
                    // Drain until the peer acknowledges or the timeout passes.
                    let drain = async { while let Some(Ok(_)) = read.next().await {} };
                    if timeout(connect_timeout, drain).await.is_err() {
                        warn!(epoch, "Close handshake timed out");
                    }
                    events.emit(SessionEvent::Close(Some(frame)));
                    return;
                }
                None => {
                    let _ = write.close().await;
                    return;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    events.emit(SessionEvent::Message(WsMessage::Text(text.as_str().to_string())));
                }
                Some(Ok(Message::Binary(data))) => {
                    events.emit(SessionEvent::Message(WsMessage::Binary(data)));
                }
                Some(Ok(Message::Ping(payload))) => {
                    events.emit(SessionEvent::Ping(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    peer_close = frame.map(from_ws_close_frame);
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(err)) => {
                    events.emit(SessionEvent::Error(TransportError::from(err).to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    events.emit(SessionEvent::Close(peer_close));
}
