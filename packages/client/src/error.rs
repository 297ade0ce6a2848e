//! Error types for the Tsunagi client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The relay URL could not be parsed
    #[error("Invalid relay URL '{0}'")]
    InvalidUrl(String),

    /// The relay rejected roomId / userId (HTTP 400)
    #[error("Relay rejected the connection parameters: {0}")]
    InvalidParameters(String),

    /// The relay closed the session on purpose (e.g. the same userId joined elsewhere)
    #[error("Session closed by relay: {0}")]
    ClosedByRelay(String),

    /// Could not establish a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An established connection was lost
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}
