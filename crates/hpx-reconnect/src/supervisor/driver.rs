//! Background task that owns the connection lifecycle.
//!
//! All state lives in [`Driver`] and is only touched from its `run` loop, so
//! session events, timer expiries and caller commands are applied one at a
//! time and never interleave.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, watch},
    time::{Instant, sleep_until},
};
use tracing::{debug, error, info, warn};

use super::{
    config::SupervisorConfig,
    event::SupervisorEvent,
    state::{ConnectionState, SupervisorStatus},
};
use crate::{
    message::{CloseCode, CloseFrame, WsMessage},
    transport::{ConnectionEpoch, Session, SessionEvent, SessionEvents, Transport},
};

/// Commands sent from [`SupervisorHandle`](super::SupervisorHandle) to the driver.
#[derive(Debug)]
pub(crate) enum Command {
    /// Forward a payload if the connection is open.
    Send { message: WsMessage },
    /// Close for good.
    Close { frame: CloseFrame },
}

/// The session currently owned by the driver.
struct ActiveSession<S> {
    epoch: ConnectionEpoch,
    session: S,
    /// Cleared once the session reported `Close` or was retired after a
    /// missed heartbeat. Events from a session that is not live are ignored.
    live: bool,
}

pub(crate) struct Driver<T: Transport> {
    config: Arc<SupervisorConfig>,
    transport: T,
    session: Option<ActiveSession<T::Session>>,
    epoch: ConnectionEpoch,
    state: ConnectionState,
    reconnect_attempts: u32,
    forced_close: bool,
    /// At most one armed heartbeat deadline; re-arming replaces it.
    heartbeat_deadline: Option<Instant>,
    /// At most one armed reconnect deadline; re-arming replaces it.
    reconnect_deadline: Option<Instant>,
    session_tx: mpsc::UnboundedSender<(ConnectionEpoch, SessionEvent)>,
    event_tx: broadcast::Sender<SupervisorEvent>,
    status_tx: watch::Sender<SupervisorStatus>,
}

impl<T: Transport> Driver<T> {
    pub(crate) fn new(
        config: Arc<SupervisorConfig>,
        transport: T,
        session_tx: mpsc::UnboundedSender<(ConnectionEpoch, SessionEvent)>,
        event_tx: broadcast::Sender<SupervisorEvent>,
        status_tx: watch::Sender<SupervisorStatus>,
    ) -> Self {
        Self {
            config,
            transport,
            session: None,
            epoch: ConnectionEpoch::default(),
            state: ConnectionState::Connecting,
            reconnect_attempts: 0,
            forced_close: false,
            heartbeat_deadline: None,
            reconnect_deadline: None,
            session_tx,
            event_tx,
            status_tx,
        }
    }

    /// Main entry point - run until the supervisor reaches `Closed`.
    pub(crate) async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut session_rx: mpsc::UnboundedReceiver<(ConnectionEpoch, SessionEvent)>,
    ) {
        info!(address = %self.config.address, "Starting connection supervisor");

        self.open(false);
        let mut commands_open = true;

        while !self.state.is_closed() {
            let heartbeat = self.heartbeat_deadline;
            let reconnect = self.reconnect_deadline;

            tokio::select! {
                biased;
                cmd = cmd_rx.recv(), if commands_open => match cmd {
                    Some(Command::Send { message }) => self.send(message),
                    Some(Command::Close { frame }) => self.close(frame),
                    None => {
                        commands_open = false;
                        info!("All supervisor handles dropped; closing");
                        self.close(CloseFrame::normal());
                    }
                },
                Some((epoch, event)) = session_rx.recv() => {
                    self.handle_session_event(epoch, event);
                }
                () = wait_for(heartbeat) => {
                    self.heartbeat_deadline = None;
                    self.on_heartbeat_timeout();
                }
                () = wait_for(reconnect) => {
                    self.reconnect_deadline = None;
                    self.on_reconnect_timer();
                }
            }
        }

        info!(address = %self.config.address, "Connection supervisor stopped");
    }

    /// Dial a new session.
    fn open(&mut self, is_reconnect_attempt: bool) {
        if is_reconnect_attempt {
            warn!(
                attempt = self.reconnect_attempts,
                max = self.config.max_reconnect_attempts,
                "Reconnect attempt"
            );
            if self.config.attempts_exhausted(self.reconnect_attempts) {
                let reason = format!(
                    "gave up after {} reconnect attempts",
                    self.config.max_reconnect_attempts
                );
                self.crash(reason);
                return;
            }
        } else {
            self.reconnect_attempts = 0;
            self.publish_status();
            self.emit(SupervisorEvent::Connecting);
        }

        self.epoch = self.epoch.next();
        let events = SessionEvents::new(self.epoch, self.session_tx.clone());
        debug!(epoch = self.epoch.0, address = %self.config.address, "Creating session");
        let session = self.transport.create_session(&self.config.address, events);

        // Replacing drops the previous session handle; its late events carry a
        // stale epoch and are ignored.
        self.session = Some(ActiveSession {
            epoch: self.epoch,
            session,
            live: true,
        });
    }

    fn handle_session_event(&mut self, epoch: ConnectionEpoch, event: SessionEvent) {
        let current = self
            .session
            .as_ref()
            .is_some_and(|active| active.epoch == epoch && active.live);
        if !current {
            debug!(epoch = epoch.0, event = ?event, "Ignoring event from retired session");
            return;
        }

        match event {
            SessionEvent::Open => {
                if self.forced_close {
                    debug!(epoch = epoch.0, "Session opened after close was requested");
                    return;
                }
                info!(epoch = epoch.0, "Connection open");
                if self.config.reset_attempts_on_open {
                    self.reconnect_attempts = 0;
                }
                self.set_state(ConnectionState::Open);
                self.emit(SupervisorEvent::Open);
            }
            SessionEvent::Ping(payload) => {
                debug!(epoch = epoch.0, "Received ping");
                if let Some(active) = self.session.as_mut()
                    && let Err(err) = active.session.pong(payload)
                {
                    warn!(error = %err, "Failed to answer ping");
                }
                if !self.forced_close {
                    self.heartbeat_deadline = deadline_after(self.config.heartbeat_timeout);
                }
            }
            SessionEvent::Message(message) => {
                self.emit(SupervisorEvent::Message(message));
            }
            SessionEvent::Error(err) => {
                debug!(epoch = epoch.0, error = %err, "Session error");
                self.emit(SupervisorEvent::Error(err));
            }
            SessionEvent::Close(frame) => {
                if let Some(active) = self.session.as_mut() {
                    active.live = false;
                }
                self.heartbeat_deadline = None;
                if self.forced_close {
                    self.finish_close();
                } else {
                    info!(epoch = epoch.0, frame = ?frame, "Session closed unexpectedly");
                    self.reconnect();
                }
            }
        }
    }

    fn on_heartbeat_timeout(&mut self) {
        if self.forced_close {
            return;
        }
        warn!(
            timeout = ?self.config.heartbeat_timeout,
            "Heartbeat timed out; reconnecting"
        );
        if let Some(active) = self.session.as_mut()
            && active.live
        {
            active.live = false;
            let frame = CloseFrame::new(CloseCode::GOING_AWAY, "heartbeat timeout");
            if let Err(err) = active.session.close(frame) {
                debug!(error = %err, "Failed to close silent session");
            }
        }
        self.reconnect();
    }

    fn on_reconnect_timer(&mut self) {
        if self.forced_close {
            return;
        }
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        self.publish_status();
        self.open(true);
    }

    /// Schedule a reconnect attempt after the configured delay.
    fn reconnect(&mut self) {
        info!("Reconnecting");
        if self.forced_close || self.config.attempts_exhausted(self.reconnect_attempts) {
            return;
        }

        self.set_state(ConnectionState::Connecting);
        self.emit(SupervisorEvent::Connecting);
        self.reconnect_deadline = deadline_after(self.config.reconnect_delay);
    }

    fn send(&mut self, message: WsMessage) {
        match self.session.as_mut() {
            Some(active) if active.live && self.state == ConnectionState::Open => {
                if let Err(err) = active.session.send(message) {
                    error!(error = %err, "Failed to send message");
                }
            }
            _ => {
                error!(
                    state = %self.state,
                    size = message.len(),
                    "Connection is not open; dropping outbound message"
                );
            }
        }
    }

    fn close(&mut self, frame: CloseFrame) {
        if self.forced_close {
            debug!("Close already requested");
            return;
        }
        info!(code = %frame.code, reason = %frame.reason, "Closing connection");

        self.forced_close = true;
        self.heartbeat_deadline = None;
        self.reconnect_deadline = None;

        let live = self.session.as_ref().is_some_and(|active| active.live);
        if !live {
            self.finish_close();
            return;
        }

        self.set_state(ConnectionState::Closing);
        let result = match self.session.as_mut() {
            Some(active) => active.session.close(frame),
            None => Ok(()),
        };
        if let Err(err) = result {
            warn!(error = %err, "Session refused close; finishing locally");
            self.finish_close();
        }
    }

    fn finish_close(&mut self) {
        self.session = None;
        self.set_state(ConnectionState::Closed);
        self.emit(SupervisorEvent::Close);
    }

    fn crash(&mut self, reason: String) {
        error!(reason = %reason, "Reconnection attempts exhausted");
        self.forced_close = true;
        self.heartbeat_deadline = None;
        self.reconnect_deadline = None;
        self.session = None;
        self.set_state(ConnectionState::Closed);
        self.emit(SupervisorEvent::Crash { reason });
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "State transition");
        }
        self.state = state;
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(SupervisorStatus {
            state: self.state,
            reconnect_attempts: self.reconnect_attempts,
        });
    }

    fn emit(&self, event: SupervisorEvent) {
        // No observers is fine; notifications are fire-and-forget.
        let _ = self.event_tx.send(event);
    }
}

/// `None` when the delay is too large to represent, which never fires.
fn deadline_after(delay: Duration) -> Option<Instant> {
    Instant::now().checked_add(delay)
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
