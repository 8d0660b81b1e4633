//! Error handling for the supervisor and its transports.

use std::time::Duration;

use thiserror::Error;

/// The main result type used throughout the crate.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by transports, configuration and the supervisor handle.
///
/// Lifecycle failures (dropped sessions, missed heartbeats, exhausted
/// retries) are never returned through this type; they are reported as
/// [`SupervisorEvent`](crate::SupervisorEvent) notifications instead.
#[derive(Error, Debug)]
pub enum TransportError {
    /// WebSocket protocol or I/O errors
    #[error("WebSocket error: {message}")]
    WebSocket { message: String },

    /// Serialization errors for outbound JSON payloads
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The session or the supervisor driving it is gone
    #[error("Connection closed: {}", .reason.as_deref().unwrap_or("no reason given"))]
    ConnectionClosed { reason: Option<String> },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[cfg(feature = "tungstenite")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket {
            message: e.to_string(),
        }
    }
}

impl TransportError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a WebSocket error.
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    /// Create a connection-closed error.
    pub fn connection_closed(reason: Option<String>) -> Self {
        Self::ConnectionClosed { reason }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
