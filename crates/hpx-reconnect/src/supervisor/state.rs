//! Connection lifecycle state.

use std::fmt;

/// Connection state machine states.
///
/// `Connecting → Open → (Closing | Connecting) → Closed`. `Closed` is
/// terminal: it is only reached through a caller close or by running out
/// of reconnection attempts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Dialling, or waiting out the reconnect delay.
    #[default]
    Connecting,
    /// The current session is open and can carry traffic.
    Open,
    /// A caller close was requested and the session is shutting down.
    Closing,
    /// Fully closed, will not reconnect.
    Closed,
}

impl ConnectionState {
    /// Check if the connection can carry traffic.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if the connection is closed (terminal state).
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Snapshot of the supervisor published to handles after every transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupervisorStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Reconnection attempts since the counter was last reset.
    pub reconnect_attempts: u32,
}
