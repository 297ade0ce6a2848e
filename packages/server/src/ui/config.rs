//! Relay tuning knobs.

use std::time::Duration;

/// Interval at which the relay pings every open connection.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// A connection that sends nothing (not even a Pong) for this long is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// A single socket write that takes longer than this ends the connection.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames buffered per connection before the peer counts as too slow.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Largest WebSocket frame/message accepted from a client.
///
/// Leaves room for a JSON-escaped body of [`crate::domain::MAX_MESSAGE_TEXT_BYTES`]
/// (up to six bytes per byte for `\u00XX` escapes). Bodies over the text limit
/// but under this cap reach the body check and are dropped with the connection
/// kept open. A frame above this cap is a transport error and ends the connection.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Upper bound on simultaneously open connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Runtime configuration of the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Heartbeat interval (should be < idle_timeout / 2)
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
    pub write_timeout: Duration,
    pub outbound_capacity: usize,
    pub max_frame_bytes: usize,
    pub max_connections: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}
