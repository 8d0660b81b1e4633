//! Supervisor configuration.

use std::time::Duration;

/// Configuration for a connection supervisor.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    // Endpoint
    /// Address handed to the transport on every connection attempt.
    pub address: String,

    // Heartbeat settings
    /// After a peer ping, the next ping must arrive within this window or
    /// the session is declared dead.
    pub heartbeat_timeout: Duration,

    // Reconnection settings
    /// Fixed delay before each reconnection attempt.
    pub reconnect_delay: Duration,
    /// Reconnection attempts allowed before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Reset the attempt counter whenever a reconnected session opens.
    /// When off, the counter only resets on a non-reconnect open.
    pub reset_attempts_on_open: bool,

    // Channels
    /// Capacity of the handle-to-driver command channel.
    pub command_channel_capacity: usize,
    /// Capacity of the notification broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            heartbeat_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 3,
            reset_attempts_on_open: false,
            command_channel_capacity: 64,
            event_channel_capacity: 256,
        }
    }
}

impl SupervisorConfig {
    /// Create a new configuration for the given address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the heartbeat timeout.
    #[must_use]
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Set the delay before each reconnection attempt.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the maximum reconnection attempts (0 = unlimited).
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set whether a successful reconnect resets the attempt counter.
    #[must_use]
    pub fn reset_attempts_on_open(mut self, reset: bool) -> Self {
        self.reset_attempts_on_open = reset;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Whether `attempts` is past the configured ceiling.
    ///
    /// The single guard shared by the reconnect procedure and the reconnect
    /// open path. `attempts` counts tries beyond the first connection, so
    /// with a ceiling of 3 the fourth reconnect attempt is the first refused.
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_reconnect_attempts != 0 && attempts > self.max_reconnect_attempts
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.address.is_empty() {
            return Err("Address cannot be empty".to_string());
        }
        if self.heartbeat_timeout.is_zero() {
            return Err("Heartbeat timeout must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err("Event channel capacity must be > 0".to_string());
        }
        Ok(())
    }
}
