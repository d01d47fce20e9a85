//! Error types for the parlor client.

use thiserror::Error;

/// Errors that can occur when using the parlor client.
///
/// Rejections by the game server are *not* represented here: the server
/// reports those through the `errorMsg` push, which lands in the session's
/// error slot rather than failing a call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session loop is gone, so the request could not be queued.
    #[error("not connected to server")]
    NotConnected,

    /// A push decoded as JSON but its payload does not fit the event.
    #[error("invalid `{event}` payload: {reason}")]
    InvalidPayload {
        /// Event name of the offending push.
        event: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub(crate) fn invalid_payload(event: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            event: event.to_string(),
            reason: reason.into(),
        }
    }
}

/// A specialized [`Result`] type for parlor client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
