//! Payload and close-frame types exchanged with a transport session.
//!
//! Payloads are opaque to the supervisor: they are forwarded to the session
//! on send and re-emitted to observers on receipt without inspection.

use std::fmt;

use bytes::Bytes;

/// Message representation for WebSocket communication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WsMessage {
    /// Text message.
    Text(String),
    /// Binary message.
    Binary(Bytes),
}

impl WsMessage {
    /// Create a text message.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create a binary message.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary(data.into())
    }

    /// Get as text if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    /// Get as bytes regardless of message type.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for WsMessage {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for WsMessage {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for WsMessage {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(data))
    }
}

/// WebSocket close status code (RFC 6455 §7.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: CloseCode = CloseCode(1000);
    /// The endpoint is going away.
    pub const GOING_AWAY: CloseCode = CloseCode(1001);
    /// No status code was present in the close frame.
    pub const NO_STATUS: CloseCode = CloseCode(1005);

    /// Raw numeric value.
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl Default for CloseCode {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.0
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Close code plus an optional human-readable reason.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloseFrame {
    /// Status code.
    pub code: CloseCode,
    /// Reason text, empty when none was given.
    pub reason: String,
}

impl CloseFrame {
    /// Create a close frame.
    pub fn new(code: impl Into<CloseCode>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// A normal (1000) close with no reason.
    pub fn normal() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_accessors() {
        let text = WsMessage::text("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.as_bytes(), b"hello");
        assert_eq!(text.len(), 5);

        let binary = WsMessage::binary(vec![1u8, 2, 3]);
        assert_eq!(binary.as_text(), None);
        assert_eq!(binary.as_bytes(), &[1, 2, 3]);
        assert!(!binary.is_empty());
    }

    #[test]
    fn test_close_frame_defaults_to_normal() {
        let frame = CloseFrame::normal();
        assert_eq!(frame.code, CloseCode::NORMAL);
        assert_eq!(frame.code.as_u16(), 1000);
        assert!(frame.reason.is_empty());
    }

    #[test]
    fn test_close_code_conversions() {
        let code = CloseCode::from(4001);
        assert_eq!(u16::from(code), 4001);
        assert_eq!(CloseCode::NO_STATUS.to_string(), "1005");
    }
}
