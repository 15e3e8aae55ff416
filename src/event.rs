//! High-level events and outcomes published by a [`GameSession`](crate::session::GameSession).
//!
//! The Room State cell tells a UI *what* the room looks like; [`SessionEvent`]s
//! tell it *that something happened* which is not visible in the room itself:
//! a transport dropped, the game view should give way to the lobby, the
//! opponent fled. They travel on a [`tokio::sync::broadcast`] bus so any
//! number of views can subscribe.

use crate::protocol::UserId;

/// Events emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The namespace transport is up. `reconnected` is `true` after an
    /// automatic reconnect, in which case a game-state resync has been sent.
    Connected { reconnected: bool },
    /// The namespace transport went down.
    Disconnected {
        /// Reason reported by the transport, if any.
        reason: Option<String>,
        /// `true` when the disconnect was requested locally.
        local: bool,
        /// `true` when an automatic reconnect has been scheduled.
        will_reconnect: bool,
    },
    /// A game ended; see [`GameSession::game_result`](crate::session::GameSession::game_result).
    GameFinished(GameResult),
    /// The opponent dropped out and the local player won by default.
    OpponentDisconnected { username: String },
    /// The game was reset and the view should return to the lobby.
    ReturnToLobby,
    /// `force_leave_room` was called; the view should navigate away.
    ForceLeaveRequested,
    /// A new identity was persisted by `join_lobby`.
    IdentityChanged { user_id: UserId, username: String },
    /// Both players agreed on a draw. `continued` is `true` when play goes on
    /// in place instead of returning to the lobby.
    DrawAccepted { continued: bool },
    /// A server `error` event. The message is also in the session error field.
    Error { message: String },
}

/// Why a game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Normal end of play.
    Completed,
    /// Both players agreed on a draw.
    Draw,
    /// The opponent left; `winner` wins by default.
    OpponentDisconnected { username: String },
    /// Any other server-supplied reason.
    Other(String),
}

/// The end-of-game signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub winner: Option<UserId>,
    pub reason: FinishReason,
}

/// A game result seen from one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    WonByDisconnect,
    Lost,
    Draw,
}

impl GameResult {
    pub fn completed(winner: Option<UserId>) -> Self {
        Self {
            winner,
            reason: FinishReason::Completed,
        }
    }

    pub fn draw() -> Self {
        Self {
            winner: None,
            reason: FinishReason::Draw,
        }
    }

    /// Map the `gameFinished` fields onto a result.
    pub fn from_finish(winner: Option<UserId>, is_draw: bool, reason: Option<&str>) -> Self {
        if is_draw {
            return Self::draw();
        }
        let reason = match reason {
            None | Some("completed") => FinishReason::Completed,
            Some("draw") => FinishReason::Draw,
            Some(other) => FinishReason::Other(other.to_string()),
        };
        Self { winner, reason }
    }

    pub fn is_draw(&self) -> bool {
        match self.reason {
            FinishReason::Draw => true,
            FinishReason::Completed => self.winner.is_none(),
            _ => false,
        }
    }

    /// The outcome for `user_id`.
    pub fn outcome_for(&self, user_id: &str) -> Outcome {
        if self.is_draw() {
            return Outcome::Draw;
        }
        match (&self.winner, &self.reason) {
            (Some(w), FinishReason::OpponentDisconnected { .. }) if w == user_id => {
                Outcome::WonByDisconnect
            }
            (Some(w), _) if w == user_id => Outcome::Won,
            _ => Outcome::Lost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_by_player() {
        let result = GameResult::completed(Some("u1".into()));
        assert_eq!(result.outcome_for("u1"), Outcome::Won);
        assert_eq!(result.outcome_for("u2"), Outcome::Lost);
    }

    #[test]
    fn disconnect_win_is_distinguished() {
        let result = GameResult {
            winner: Some("u1".into()),
            reason: FinishReason::OpponentDisconnected {
                username: "Bob".into(),
            },
        };
        assert_eq!(result.outcome_for("u1"), Outcome::WonByDisconnect);
        assert_eq!(result.outcome_for("u2"), Outcome::Lost);
    }

    #[test]
    fn finish_fields() {
        assert_eq!(
            GameResult::from_finish(Some("u1".into()), true, None),
            GameResult::draw()
        );
        assert_eq!(
            GameResult::from_finish(None, false, None).outcome_for("u1"),
            Outcome::Draw
        );
        assert_eq!(
            GameResult::from_finish(Some("u2".into()), false, Some("timeout")).reason,
            FinishReason::Other("timeout".into())
        );
    }
}
