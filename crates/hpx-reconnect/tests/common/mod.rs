#![allow(dead_code)]

use std::{
    io::{self, Write},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use hpx_reconnect::{
    CloseFrame, ConnectionEpoch, Session, SessionEvent, SessionEvents, SupervisorConfig,
    Transport, TransportResult, WsMessage,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

pub const ADDRESS: &str = "ws://mock.invalid/stream";

/// Config with the default timings and a fixed test address.
pub fn config() -> SupervisorConfig {
    SupervisorConfig::new(ADDRESS)
        .heartbeat_timeout(Duration::from_secs(30))
        .reconnect_delay(Duration::from_secs(5))
        .max_reconnect_attempts(3)
}

/// Call the supervisor made on a mock session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Send(WsMessage),
    Pong(Bytes),
    Close(CloseFrame),
}

/// In-memory transport. Every created session is handed to the test
/// through [`MockSessions`].
#[derive(Clone)]
pub struct MockTransport {
    created_tx: mpsc::UnboundedSender<MockSessionHandle>,
    auto_close: Arc<AtomicBool>,
}

impl MockTransport {
    /// Sessions confirm a requested close right away.
    pub fn new() -> (Self, MockSessions) {
        let (created_tx, created_rx) = mpsc::unbounded_channel();
        let transport = Self {
            created_tx,
            auto_close: Arc::new(AtomicBool::new(true)),
        };
        (transport, MockSessions { created_rx })
    }

    /// Sessions never confirm a requested close; the test reports it.
    pub fn silent_close() -> (Self, MockSessions) {
        let (transport, sessions) = Self::new();
        transport.auto_close.store(false, Ordering::SeqCst);
        (transport, sessions)
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn create_session(&self, address: &str, events: SessionEvents) -> Self::Session {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let _ = self.created_tx.send(MockSessionHandle {
            address: address.to_string(),
            events: events.clone(),
            calls: Arc::clone(&calls),
        });
        MockSession {
            events,
            calls,
            auto_close: self.auto_close.load(Ordering::SeqCst),
        }
    }
}

pub struct MockSession {
    events: SessionEvents,
    calls: Arc<Mutex<Vec<SessionCall>>>,
    auto_close: bool,
}

impl MockSession {
    fn record(&self, call: SessionCall) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);
    }
}

impl Session for MockSession {
    fn send(&mut self, message: WsMessage) -> TransportResult<()> {
        self.record(SessionCall::Send(message));
        Ok(())
    }

    fn pong(&mut self, payload: Bytes) -> TransportResult<()> {
        self.record(SessionCall::Pong(payload));
        Ok(())
    }

    fn close(&mut self, frame: CloseFrame) -> TransportResult<()> {
        self.record(SessionCall::Close(frame.clone()));
        if self.auto_close {
            self.events.emit(SessionEvent::Close(Some(frame)));
        }
        Ok(())
    }
}

/// Receives each session as the supervisor creates it.
pub struct MockSessions {
    created_rx: mpsc::UnboundedReceiver<MockSessionHandle>,
}

impl MockSessions {
    /// Next created session, or `None` once the supervisor dropped the
    /// transport.
    pub async fn next(&mut self) -> Option<MockSessionHandle> {
        self.created_rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<MockSessionHandle> {
        self.created_rx.try_recv().ok()
    }
}

/// Test side of one mock session: drives its events and inspects the
/// calls the supervisor made on it.
#[derive(Clone)]
pub struct MockSessionHandle {
    pub address: String,
    events: SessionEvents,
    calls: Arc<Mutex<Vec<SessionCall>>>,
}

impl MockSessionHandle {
    pub fn epoch(&self) -> ConnectionEpoch {
        self.events.epoch()
    }

    pub fn open(&self) {
        self.events.emit(SessionEvent::Open);
    }

    pub fn ping(&self, payload: &'static [u8]) {
        self.events.emit(SessionEvent::Ping(Bytes::from_static(payload)));
    }

    pub fn message(&self, message: impl Into<WsMessage>) {
        self.events.emit(SessionEvent::Message(message.into()));
    }

    pub fn error(&self, error: &str) {
        self.events.emit(SessionEvent::Error(error.to_string()));
    }

    pub fn close(&self, frame: Option<CloseFrame>) {
        self.events.emit(SessionEvent::Close(frame));
    }

    /// Dial failure: an error followed by a close.
    pub fn fail(&self, error: &str) {
        self.error(error);
        self.close(None);
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install(&self, filter: EnvFilter) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(false)
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let guard = self
            .bytes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        String::from_utf8_lossy(&guard).to_string()
    }
}

pub struct LogCaptureWriter {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            bytes: Arc::clone(&self.bytes),
        }
    }
}
