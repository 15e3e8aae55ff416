//! Error codes for structured error handling in the Matchday protocol.
//!
//! Game servers may attach a `code` to an `error` event. Codes serialize as
//! `SCREAMING_SNAKE_CASE` strings (e.g. `"ROOM_FULL"`). Older deployments send
//! only a `message`; [`ErrorCode::classify`] recovers the code for the messages
//! the UI needs to tell apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error codes reported by a Matchday game server.
///
/// Use [`description()`](ErrorCode::description) for a human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors
    Unauthorized,
    InvalidToken,

    // Validation errors
    InvalidInput,
    InvalidMove,
    NotYourTurn,

    // Room errors
    RoomNotFound,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    InvalidRoomState,
    NotHost,
    PlayersNotReady,

    // Server errors
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            // Authentication errors
            Self::Unauthorized => "You need to sign in before playing online.",
            Self::InvalidToken => "Your session has expired. Sign in again to keep playing.",

            // Validation errors
            Self::InvalidInput => "The request was malformed. Check the submitted values.",
            Self::InvalidMove => "That move is not allowed right now.",
            Self::NotYourTurn => "Wait for your turn before playing.",

            // Room errors
            Self::RoomNotFound => "The room no longer exists. Join a new game from the lobby.",
            Self::RoomFull => "The room is full. Try joining a different room.",
            Self::AlreadyInRoom => "You are already in a room. Leave it before joining another.",
            Self::NotInRoom => "You are not in a room. Join a game first.",
            Self::InvalidRoomState => "The game is not in a state that allows this action.",
            Self::NotHost => "Only the host can do that.",
            Self::PlayersNotReady => "Every player must be ready before the game starts.",

            // Server errors
            Self::InternalError => "The game server hit an internal error. Please try again.",
            Self::ServiceUnavailable => "The game server is temporarily unavailable.",
        }
    }

    /// Recover a code from a bare server message.
    ///
    /// Matching is case-insensitive on well-known phrases; unknown messages
    /// return `None`.
    pub fn classify(message: &str) -> Option<Self> {
        let lower = message.to_ascii_lowercase();
        let table: [(&str, Self); 8] = [
            ("room is full", Self::RoomFull),
            ("room full", Self::RoomFull),
            ("room not found", Self::RoomNotFound),
            ("not your turn", Self::NotYourTurn),
            ("already in", Self::AlreadyInRoom),
            ("not in a room", Self::NotInRoom),
            ("only the host", Self::NotHost),
            ("unauthorized", Self::Unauthorized),
        ];
        table
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|(_, code)| *code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::RoomFull).unwrap();
        assert_eq!(json, "\"ROOM_FULL\"");
        let back: ErrorCode = serde_json::from_str("\"NOT_YOUR_TURN\"").unwrap();
        assert_eq!(back, ErrorCode::NotYourTurn);
    }

    #[test]
    fn classify_recognises_full_room() {
        assert_eq!(ErrorCode::classify("Room is full"), Some(ErrorCode::RoomFull));
        assert_eq!(ErrorCode::classify("ROOM FULL"), Some(ErrorCode::RoomFull));
        assert_eq!(ErrorCode::classify("something odd"), None);
    }

    #[test]
    fn display_uses_description() {
        assert_eq!(
            ErrorCode::RoomFull.to_string(),
            ErrorCode::RoomFull.description()
        );
    }
}
