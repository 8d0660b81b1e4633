//! Reconnecting Client Example
//!
//! Keeps a WebSocket connection alive and prints every notification.
//!
//! Run with: `cargo run -p hpx-reconnect --example reconnecting_client -- wss://echo.websocket.org`

use std::time::Duration;

use hpx_reconnect::{Supervisor, SupervisorConfig, SupervisorEvent, TungsteniteTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9001".to_string());

    let config = SupervisorConfig::new(address)
        .heartbeat_timeout(Duration::from_secs(30))
        .reconnect_delay(Duration::from_secs(2))
        .max_reconnect_attempts(5);
    let (handle, mut events) = Supervisor::connect(config, TungsteniteTransport::new()).await?;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(SupervisorEvent::Open) => {
                    println!("open; sending greeting");
                    handle.send("hello").await;
                }
                Some(SupervisorEvent::Message(msg)) => println!("message: {msg:?}"),
                Some(SupervisorEvent::Crash { reason }) => {
                    println!("gave up: {reason}");
                    break;
                }
                Some(event) => println!("{event:?}"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.close().await;
            }
        }
    }

    Ok(())
}
