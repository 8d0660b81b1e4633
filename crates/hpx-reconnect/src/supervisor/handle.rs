//! Caller-facing handle to a running supervisor.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error};

use super::{
    config::SupervisorConfig,
    driver::Command,
    event::{EventStream, SupervisorEvent},
    state::{ConnectionState, SupervisorStatus},
};
use crate::{
    error::TransportResult,
    message::{CloseCode, CloseFrame, WsMessage},
};

/// Cheap-to-clone handle for sending, closing and observing a supervisor.
///
/// The handle stays valid across any number of reconnects. Dropping every
/// clone closes the supervisor with a normal (1000) close.
#[derive(Clone)]
pub struct SupervisorHandle {
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<SupervisorStatus>,
    events: Arc<broadcast::Receiver<SupervisorEvent>>,
    config: Arc<SupervisorConfig>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        cmd_tx: mpsc::Sender<Command>,
        status_rx: watch::Receiver<SupervisorStatus>,
        events: broadcast::Receiver<SupervisorEvent>,
        config: Arc<SupervisorConfig>,
    ) -> Self {
        Self {
            cmd_tx,
            status_rx,
            events: Arc::new(events),
            config,
        }
    }

    /// Send a payload on the current session.
    ///
    /// Best effort: if the connection is not open the payload is logged and
    /// dropped. It is never queued for a later session.
    pub async fn send(&self, message: impl Into<WsMessage>) {
        let message = message.into();
        if self.cmd_tx.send(Command::Send { message }).await.is_err() {
            error!("Supervisor stopped; dropping outbound message");
        }
    }

    /// Serialize `payload` as JSON and send it as a text message.
    pub async fn send_json<T: Serialize>(&self, payload: &T) -> TransportResult<()> {
        let json = serde_json::to_string(payload)?;
        self.send(WsMessage::text(json)).await;
        Ok(())
    }

    /// Close with a normal (1000) status and no reason.
    pub async fn close(&self) {
        self.close_with(CloseCode::NORMAL, "").await;
    }

    /// Close with the given status code and reason.
    ///
    /// Permanently disables reconnection. Calling it again, or after the
    /// supervisor already stopped, does nothing.
    pub async fn close_with(&self, code: impl Into<CloseCode>, reason: impl Into<String>) {
        let frame = CloseFrame::new(code, reason);
        if self.cmd_tx.send(Command::Close { frame }).await.is_err() {
            debug!("Supervisor already stopped");
        }
    }

    /// Register an additional observer.
    ///
    /// The new stream sees notifications emitted from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.resubscribe())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.status_rx.borrow().state
    }

    /// Reconnection attempts since the counter was last reset.
    pub fn reconnect_attempts(&self) -> u32 {
        self.status_rx.borrow().reconnect_attempts
    }

    /// State and attempt counter read together.
    pub fn status(&self) -> SupervisorStatus {
        *self.status_rx.borrow()
    }

    /// Wait until the supervisor reaches `target`.
    ///
    /// Returns the final state instead if the supervisor stops first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> ConnectionState {
        let mut rx = self.status_rx.clone();
        let reached = rx
            .wait_for(|status| status.state == target)
            .await
            .map(|status| status.state);
        match reached {
            Ok(state) => state,
            Err(_) => rx.borrow().state,
        }
    }

    /// Whether the background driver is still running.
    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Address the supervisor connects to.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Configuration the supervisor was started with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("address", &self.config.address)
            .field("status", &*self.status_rx.borrow())
            .finish()
    }
}
