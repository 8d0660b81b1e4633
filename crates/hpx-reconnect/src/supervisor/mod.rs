//! Self-healing connection supervisor.
//!
//! A supervisor keeps one logical connection alive on top of any number of
//! physical sessions:
//!
//! - **Heartbeat**: every peer ping is answered and arms a timeout; if the
//!   next ping does not arrive in time the session is declared dead
//! - **Reconnection**: unexpected closes and heartbeat timeouts schedule a
//!   new session after a fixed delay, up to a configurable attempt ceiling
//! - **Forced close**: a caller close is permanent and wins over any armed
//!   timer
//! - **Notifications**: observers receive [`SupervisorEvent`]s through
//!   independent [`EventStream`]s
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐ commands  ┌──────────────┐ create_session ┌─────────────┐
//! │ SupervisorHandle │──────────▶│    Driver    │───────────────▶│  Transport  │
//! │     (Clone)      │           │ (background) │◀───────────────│   Session   │
//! └──────────────────┘           └──────┬───────┘ SessionEvents  └─────────────┘
//!          ▲ status (watch)             │ notifications (broadcast)
//!          └────────────────────────────┤
//!                                       ▼
//!                                 ┌─────────────┐
//!                                 │ EventStream │ × N observers
//!                                 └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hpx_reconnect::{Supervisor, SupervisorConfig, SupervisorEvent, TungsteniteTransport};
//!
//! let config = SupervisorConfig::new("wss://feed.example.com/ws")
//!     .reconnect_delay(std::time::Duration::from_secs(2))
//!     .max_reconnect_attempts(0);
//! let (handle, mut events) = Supervisor::connect(config, TungsteniteTransport::new()).await?;
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         SupervisorEvent::Open => handle.send("subscribe").await,
//!         SupervisorEvent::Message(msg) => println!("{msg:?}"),
//!         SupervisorEvent::Crash { reason } => eprintln!("gave up: {reason}"),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! # State machine
//!
//! | From | Trigger | To | Notification |
//! |------|---------|----|--------------|
//! | `Connecting` | session open | `Open` | `Open` |
//! | `Open` | unexpected close / heartbeat timeout | `Connecting` | `Connecting` |
//! | `Connecting` | reconnect delay elapsed, attempts left | `Connecting` | none |
//! | `Connecting` | reconnect delay elapsed, attempts exhausted | `Closed` | `Crash` |
//! | any | caller close, live session | `Closing` | none |
//! | `Closing` | session close | `Closed` | `Close` |
//! | any | caller close, no live session | `Closed` | `Close` |

mod config;
mod driver;
mod event;
mod handle;
mod state;

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

pub use config::SupervisorConfig;
use driver::Driver;
pub use event::{EventStream, SupervisorEvent};
use futures_util::Stream;
pub use handle::SupervisorHandle;
pub use state::{ConnectionState, SupervisorStatus};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::info;

use crate::{
    error::{TransportError, TransportResult},
    transport::Transport,
};

/// Entry point for supervised connections.
///
/// Call [`connect()`](Supervisor::connect) to start supervising and obtain
/// a [`SupervisorHandle`] plus the first observer's [`EventStream`].
pub struct Supervisor {
    handle: SupervisorHandle,
    events: EventStream,
}

impl Supervisor {
    /// Start supervising `config.address` over `transport`.
    ///
    /// Spawns the background driver, which immediately begins the first
    /// connection attempt. The returned stream is subscribed before the
    /// driver starts, so it observes the initial `Connecting`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub async fn connect<T>(
        config: SupervisorConfig,
        transport: T,
    ) -> TransportResult<(SupervisorHandle, EventStream)>
    where
        T: Transport,
    {
        let supervisor = Self::connect_stream(config, transport).await?;
        Ok(supervisor.split())
    }

    /// Like [`connect()`](Supervisor::connect) but keeps the handle and the
    /// stream together.
    pub async fn connect_stream<T>(config: SupervisorConfig, transport: T) -> TransportResult<Self>
    where
        T: Transport,
    {
        config.validate().map_err(TransportError::config)?;

        let config = Arc::new(config);
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = broadcast::channel(config.event_channel_capacity);
        let (status_tx, status_rx) = watch::channel(SupervisorStatus::default());

        let events = EventStream::new(event_tx.subscribe());
        let handle = SupervisorHandle::new(cmd_tx, status_rx, event_rx, Arc::clone(&config));

        let driver = Driver::new(
            Arc::clone(&config),
            transport,
            session_tx,
            event_tx,
            status_tx,
        );
        tokio::spawn(driver.run(cmd_rx, session_rx));

        info!(address = %config.address, "Connection supervisor created");

        Ok(Self { handle, events })
    }

    /// Separate the handle from the event stream.
    pub fn split(self) -> (SupervisorHandle, EventStream) {
        (self.handle, self.events)
    }

    /// Borrow the handle.
    pub fn handle(&self) -> &SupervisorHandle {
        &self.handle
    }
}

impl Stream for Supervisor {
    type Item = SupervisorEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.events).poll_next(cx)
    }
}
