//! # hpx-reconnect
//!
//! Self-healing WebSocket connections for long-lived streaming clients.
//!
//! A [`Supervisor`] owns one logical connection and keeps it alive across any
//! number of physical sessions. It answers peer pings, treats a missing ping
//! as a dead link, redials after a fixed delay and gives up with a
//! [`SupervisorEvent::Crash`] once the configured attempt ceiling is passed.
//!
//! ## Features
//!
//! - **Heartbeat Liveness**: ping-driven timeout that survives silent drops
//! - **Bounded Reconnection**: fixed delay with an optional attempt ceiling
//! - **Forced Close**: a caller close permanently disables reconnection
//! - **Pluggable Transport**: bring your own [`Transport`] or use the default
//!   `tokio-tungstenite` one behind the `tungstenite` feature
//! - **Multiple Observers**: each [`EventStream`] receives every notification
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hpx_reconnect::{Supervisor, SupervisorConfig, SupervisorEvent, TungsteniteTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SupervisorConfig::new("wss://stream.example.com/ws")
//!         .heartbeat_timeout(std::time::Duration::from_secs(30))
//!         .max_reconnect_attempts(5);
//!
//!     let (handle, mut events) = Supervisor::connect(config, TungsteniteTransport::new()).await?;
//!
//!     while let Some(event) = events.next().await {
//!         if let SupervisorEvent::Open = event {
//!             handle.send("subscribe").await;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod message;
pub mod supervisor;
pub mod transport;

#[cfg(feature = "tungstenite")]
pub mod tungstenite;

// Re-export commonly used types
pub use error::{TransportError, TransportResult};
pub use message::{CloseCode, CloseFrame, WsMessage};
pub use supervisor::{
    ConnectionState, EventStream, Supervisor, SupervisorConfig, SupervisorEvent, SupervisorHandle,
    SupervisorStatus,
};
pub use transport::{ConnectionEpoch, Session, SessionEvent, SessionEvents, Transport};
#[cfg(feature = "tungstenite")]
pub use tungstenite::{TungsteniteSession, TungsteniteTransport};
