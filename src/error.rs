//! Error types for the Matchday session client.

use thiserror::Error;

use crate::error_codes::ErrorCode;

/// Errors that can occur when using the Matchday session client.
#[derive(Debug, Error)]
pub enum MatchdayError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The namespace does not have the `/[a-zA-Z0-9-]+` shape.
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// No auth credential is available, so no connection was attempted.
    #[error("not authenticated: sign in before joining a game")]
    MissingCredential,

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// Attempted a room operation but the client is not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// Attempted an operation that needs a user id before one was supplied.
    #[error("no user id for this session")]
    MissingIdentity,

    /// The server returned an error message.
    #[error("{message}")]
    Server {
        /// Human-readable error message from the server.
        message: String,
        /// Structured error code, if provided or recognised.
        code: Option<ErrorCode>,
    },

    /// A correlated request received no reply in time.
    #[error("{operation} timed out")]
    Timeout {
        /// Client event name of the request that timed out.
        operation: &'static str,
    },

    /// A newer request of the same kind replaced this one before it settled.
    #[error("{operation} superseded by a newer request")]
    Superseded {
        /// Client event name of the superseded request.
        operation: &'static str,
    },

    /// The identity store could not be read or written.
    #[error("identity store error: {0}")]
    Identity(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MatchdayError {
    /// Build a server error, classifying the message when no code was sent.
    pub fn server(message: impl Into<String>, code: Option<ErrorCode>) -> Self {
        let message = message.into();
        let code = code.or_else(|| ErrorCode::classify(&message));
        Self::Server { message, code }
    }

    /// Returns `true` if the server rejected a join because the room is full.
    pub fn is_room_full(&self) -> bool {
        matches!(
            self,
            Self::Server {
                code: Some(ErrorCode::RoomFull),
                ..
            }
        )
    }

    /// Returns `true` for the timeout of a correlated request.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A specialized [`Result`] type for Matchday client operations.
pub type Result<T> = std::result::Result<T, MatchdayError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_raw_message() {
        let err = MatchdayError::server("Room is full", None);
        assert_eq!(err.to_string(), "Room is full");
        assert!(err.is_room_full());
    }

    #[test]
    fn explicit_code_wins_over_classification() {
        let err = MatchdayError::server("Room is full", Some(ErrorCode::InvalidRoomState));
        assert!(!err.is_room_full());
    }

    #[test]
    fn timeout_names_the_operation() {
        let err = MatchdayError::Timeout {
            operation: "joinLobby",
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "joinLobby timed out");
    }
}
