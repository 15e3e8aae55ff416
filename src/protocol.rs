//! Wire-compatible protocol types for the Matchday game servers.
//!
//! Every frame is a JSON text message, adjacently tagged:
//!
//! ```json
//! {"event": "roomJoined", "data": {"room": {"roomId": "R1", "status": "waiting"}}}
//! ```
//!
//! Event names and payload fields are camelCase. The server is authoritative:
//! `Room` is the snapshot it pushes, and the embedded `gameState` stays opaque
//! JSON because each game variant shapes it differently.

use serde::{Deserialize, Serialize};

use crate::error_codes::ErrorCode;

// ── Type aliases ────────────────────────────────────────────────────

/// Stable identifier of an authenticated user.
pub type UserId = String;

/// Server-assigned identifier of an active room.
pub type RoomId = String;

// ── Room model ──────────────────────────────────────────────────────

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Lobby: players gather and toggle ready.
    #[default]
    Waiting,
    /// Countdown before the first turn.
    Starting,
    /// The game is in progress.
    Playing,
    /// The game is over; a summary is on screen.
    Finished,
}

/// A player seated in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub score: i64,
    /// ISO 8601 join timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

fn default_max_players() -> u8 {
    2
}

/// Authoritative snapshot of a multiplayer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    #[serde(default)]
    pub players: Vec<Player>,
    /// 2 for quiz, tic-tac-toe and two-player team games; 4 for team league.
    #[serde(default = "default_max_players")]
    pub max_players: u8,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn_user_id: Option<UserId>,
    /// Game-specific payload (grid, scores, timer, draw/rematch negotiation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chat_messages: Vec<serde_json::Value>,
}

/// Key of the countdown inside [`Room::game_state`].
pub const TIMER_FIELD: &str = "timer";

impl Room {
    /// Create an empty waiting room.
    pub fn new(room_id: impl Into<RoomId>, max_players: u8) -> Self {
        Self {
            room_id: room_id.into(),
            players: Vec::new(),
            max_players,
            status: RoomStatus::Waiting,
            current_turn_user_id: None,
            game_state: None,
            chat_messages: Vec::new(),
        }
    }

    /// Look up a seated player.
    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// The host, if one is seated.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= usize::from(self.max_players)
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.is_ready)
    }

    /// Returns `true` if it is `user_id`'s move.
    pub fn is_turn_of(&self, user_id: &str) -> bool {
        self.current_turn_user_id.as_deref() == Some(user_id)
    }

    /// Seconds left on the embedded turn timer.
    pub fn timer(&self) -> Option<u64> {
        self.game_state
            .as_ref()
            .and_then(|state| state.get(TIMER_FIELD))
            .and_then(serde_json::Value::as_u64)
    }

    /// Copy of this room with only the embedded timer replaced.
    ///
    /// A missing or non-object `gameState` becomes `{"timer": seconds}`.
    #[must_use]
    pub fn with_timer(&self, seconds: u32) -> Self {
        let mut next = self.clone();
        match next.game_state.as_mut() {
            Some(serde_json::Value::Object(fields)) => {
                fields.insert(TIMER_FIELD.to_string(), seconds.into());
            }
            _ => {
                let mut fields = serde_json::Map::new();
                fields.insert(TIMER_FIELD.to_string(), seconds.into());
                next.game_state = Some(serde_json::Value::Object(fields));
            }
        }
        next
    }

    /// A room back in the lobby with no game attached.
    pub fn is_lobby(&self) -> bool {
        self.status == RoomStatus::Waiting && self.game_state.is_none()
    }
}

// ── Client → server payload helpers ─────────────────────────────────

/// Which cell a move targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellTarget {
    /// Bingo-style cells addressed by id.
    Id(String),
    /// Grid cells addressed by row and column.
    Coords { row: u8, col: u8 },
}

/// An answer submission. Quiz games send `answer`; team-guessing games send
/// `playerName`; any other game-specific fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u8>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Game-specific answer content, without the user id.
///
/// # Example
///
/// ```
/// use matchday_client::protocol::Answer;
///
/// let answer = Answer::player_name("Zidane").with_field("teamId", 7);
/// let submission = answer.into_submission("u1");
/// assert_eq!(submission.player_name.as_deref(), Some("Zidane"));
/// assert_eq!(submission.extra["teamId"], 7);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Answer {
    pub answer: Option<String>,
    pub player_name: Option<String>,
    pub question_id: Option<String>,
    pub cell: Option<CellTarget>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Answer {
    /// A free-text quiz answer.
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Default::default()
        }
    }

    /// A footballer name guess.
    pub fn player_name(name: impl Into<String>) -> Self {
        Self {
            player_name: Some(name.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_question(mut self, question_id: impl Into<String>) -> Self {
        self.question_id = Some(question_id.into());
        self
    }

    #[must_use]
    pub fn with_cell(mut self, cell: CellTarget) -> Self {
        self.cell = Some(cell);
        self
    }

    /// Attach an extra game-specific field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn into_submission(self, user_id: impl Into<UserId>) -> AnswerSubmission {
        let (cell_id, row, col) = split_cell(self.cell);
        AnswerSubmission {
            user_id: user_id.into(),
            answer: self.answer,
            player_name: self.player_name,
            question_id: self.question_id,
            cell_id,
            row,
            col,
            extra: self.extra,
        }
    }
}

fn split_cell(cell: Option<CellTarget>) -> (Option<String>, Option<u8>, Option<u8>) {
    match cell {
        Some(CellTarget::Id(id)) => (Some(id), None, None),
        Some(CellTarget::Coords { row, col }) => (None, Some(row), Some(col)),
        None => (None, None, None),
    }
}

// ── Server → client payloads ────────────────────────────────────────

/// Payload that always carries a full room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room: Room,
}

/// Payload shared by most room events. `room` is the full replacement
/// snapshot when present; the remaining fields describe who triggered it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of one answer submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Either a full room or a bare `timeRemaining` delta.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u32>,
}

/// Narrow timer push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdatePayload {
    pub time_remaining: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
}

/// End of a game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFinishedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<UserId>,
    #[serde(default)]
    pub is_draw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Who dropped out of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedPlayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub username: String,
}

/// The opponent left mid-game; `winner` wins by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentDisconnectedPayload {
    pub disconnected_player: DisconnectedPlayer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
}

/// Server-reported failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

// ── Messages ────────────────────────────────────────────────────────

/// Events sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Ask to be seated in a lobby room; `league` picks the team-league variant.
    JoinLobby {
        user_id: UserId,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        league: Option<String>,
    },
    LeaveRoom { user_id: UserId },
    /// Leave even if the server believes a game is running.
    ForceLeaveRoom { user_id: UserId },
    PlayerReady { user_id: UserId, is_ready: bool },
    StartGame { user_id: UserId },
    ClickCell {
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cell_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        row: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        col: Option<u8>,
    },
    SubmitAnswer(AnswerSubmission),
    SkipTurn { user_id: UserId },
    SkipQuestion { user_id: UserId },
    RequestDraw { user_id: UserId },
    RespondDraw { user_id: UserId, accept: bool },
    RematchRequest { user_id: UserId },
    AcceptRematch { user_id: UserId },
    DeclineRematch { user_id: UserId },
    ResetGame { user_id: UserId },
    /// Re-request the authoritative room after a reconnect.
    GetGameState { user_id: UserId },
}

impl ClientMessage {
    /// Build a `clickCell` event.
    pub fn click_cell(user_id: impl Into<UserId>, target: CellTarget) -> Self {
        let (cell_id, row, col) = split_cell(Some(target));
        Self::ClickCell {
            user_id: user_id.into(),
            cell_id,
            row,
            col,
        }
    }

    /// Wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinLobby { .. } => "joinLobby",
            Self::LeaveRoom { .. } => "leaveRoom",
            Self::ForceLeaveRoom { .. } => "forceLeaveRoom",
            Self::PlayerReady { .. } => "playerReady",
            Self::StartGame { .. } => "startGame",
            Self::ClickCell { .. } => "clickCell",
            Self::SubmitAnswer(_) => "submitAnswer",
            Self::SkipTurn { .. } => "skipTurn",
            Self::SkipQuestion { .. } => "skipQuestion",
            Self::RequestDraw { .. } => "requestDraw",
            Self::RespondDraw { .. } => "respondDraw",
            Self::RematchRequest { .. } => "rematchRequest",
            Self::AcceptRematch { .. } => "acceptRematch",
            Self::DeclineRematch { .. } => "declineRematch",
            Self::ResetGame { .. } => "resetGame",
            Self::GetGameState { .. } => "getGameState",
        }
    }
}

/// Events pushed from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    RoomJoined(RoomSnapshot),
    PlayerJoined(RoomNotice),
    PlayerLeft(RoomNotice),
    PlayerReadyUpdate(RoomNotice),
    GameStarting(RoomNotice),
    GameStarted(RoomNotice),
    CellClicked(RoomNotice),
    AnswerResult(AnswerResultPayload),
    TurnChanged(RoomNotice),
    GameStateUpdate(GameStateUpdatePayload),
    GameFinished(GameFinishedPayload),
    /// The room went back to the lobby; also confirms `resetGame`.
    GameReset(RoomNotice),
    GameDraw(RoomNotice),
    DrawRequested(RoomNotice),
    DrawAccepted(RoomNotice),
    DrawDeclined(RoomNotice),
    RematchRequested(RoomNotice),
    RematchAccepted(RoomNotice),
    RematchDeclined(RoomNotice),
    RematchCancelled(RoomNotice),
    OpponentDisconnected(OpponentDisconnectedPayload),
    TimerUpdate(TimerUpdatePayload),
    Error(ServerErrorPayload),
}

/// Names of the server events, used as listener keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServerEventKind {
    RoomJoined,
    PlayerJoined,
    PlayerLeft,
    PlayerReadyUpdate,
    GameStarting,
    GameStarted,
    CellClicked,
    AnswerResult,
    TurnChanged,
    GameStateUpdate,
    GameFinished,
    GameReset,
    GameDraw,
    DrawRequested,
    DrawAccepted,
    DrawDeclined,
    RematchRequested,
    RematchAccepted,
    RematchDeclined,
    RematchCancelled,
    OpponentDisconnected,
    TimerUpdate,
    Error,
}

impl ServerEventKind {
    /// Every server event the client understands.
    pub const ALL: [Self; 23] = [
        Self::RoomJoined,
        Self::PlayerJoined,
        Self::PlayerLeft,
        Self::PlayerReadyUpdate,
        Self::GameStarting,
        Self::GameStarted,
        Self::CellClicked,
        Self::AnswerResult,
        Self::TurnChanged,
        Self::GameStateUpdate,
        Self::GameFinished,
        Self::GameReset,
        Self::GameDraw,
        Self::DrawRequested,
        Self::DrawAccepted,
        Self::DrawDeclined,
        Self::RematchRequested,
        Self::RematchAccepted,
        Self::RematchDeclined,
        Self::RematchCancelled,
        Self::OpponentDisconnected,
        Self::TimerUpdate,
        Self::Error,
    ];

    /// Wire event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoomJoined => "roomJoined",
            Self::PlayerJoined => "playerJoined",
            Self::PlayerLeft => "playerLeft",
            Self::PlayerReadyUpdate => "playerReadyUpdate",
            Self::GameStarting => "gameStarting",
            Self::GameStarted => "gameStarted",
            Self::CellClicked => "cellClicked",
            Self::AnswerResult => "answerResult",
            Self::TurnChanged => "turnChanged",
            Self::GameStateUpdate => "gameStateUpdate",
            Self::GameFinished => "gameFinished",
            Self::GameReset => "gameReset",
            Self::GameDraw => "gameDraw",
            Self::DrawRequested => "drawRequested",
            Self::DrawAccepted => "drawAccepted",
            Self::DrawDeclined => "drawDeclined",
            Self::RematchRequested => "rematchRequested",
            Self::RematchAccepted => "rematchAccepted",
            Self::RematchDeclined => "rematchDeclined",
            Self::RematchCancelled => "rematchCancelled",
            Self::OpponentDisconnected => "opponentDisconnected",
            Self::TimerUpdate => "timerUpdate",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ServerEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServerMessage {
    pub fn kind(&self) -> ServerEventKind {
        match self {
            Self::RoomJoined(_) => ServerEventKind::RoomJoined,
            Self::PlayerJoined(_) => ServerEventKind::PlayerJoined,
            Self::PlayerLeft(_) => ServerEventKind::PlayerLeft,
            Self::PlayerReadyUpdate(_) => ServerEventKind::PlayerReadyUpdate,
            Self::GameStarting(_) => ServerEventKind::GameStarting,
            Self::GameStarted(_) => ServerEventKind::GameStarted,
            Self::CellClicked(_) => ServerEventKind::CellClicked,
            Self::AnswerResult(_) => ServerEventKind::AnswerResult,
            Self::TurnChanged(_) => ServerEventKind::TurnChanged,
            Self::GameStateUpdate(_) => ServerEventKind::GameStateUpdate,
            Self::GameFinished(_) => ServerEventKind::GameFinished,
            Self::GameReset(_) => ServerEventKind::GameReset,
            Self::GameDraw(_) => ServerEventKind::GameDraw,
            Self::DrawRequested(_) => ServerEventKind::DrawRequested,
            Self::DrawAccepted(_) => ServerEventKind::DrawAccepted,
            Self::DrawDeclined(_) => ServerEventKind::DrawDeclined,
            Self::RematchRequested(_) => ServerEventKind::RematchRequested,
            Self::RematchAccepted(_) => ServerEventKind::RematchAccepted,
            Self::RematchDeclined(_) => ServerEventKind::RematchDeclined,
            Self::RematchCancelled(_) => ServerEventKind::RematchCancelled,
            Self::OpponentDisconnected(_) => ServerEventKind::OpponentDisconnected,
            Self::TimerUpdate(_) => ServerEventKind::TimerUpdate,
            Self::Error(_) => ServerEventKind::Error,
        }
    }

    /// The full room snapshot carried by this event, if any.
    pub fn room(&self) -> Option<&Room> {
        match self {
            Self::RoomJoined(p) => Some(&p.room),
            Self::PlayerJoined(p)
            | Self::PlayerLeft(p)
            | Self::PlayerReadyUpdate(p)
            | Self::GameStarting(p)
            | Self::GameStarted(p)
            | Self::CellClicked(p)
            | Self::TurnChanged(p)
            | Self::GameReset(p)
            | Self::GameDraw(p)
            | Self::DrawRequested(p)
            | Self::DrawAccepted(p)
            | Self::DrawDeclined(p)
            | Self::RematchRequested(p)
            | Self::RematchAccepted(p)
            | Self::RematchDeclined(p)
            | Self::RematchCancelled(p) => p.room.as_ref(),
            Self::AnswerResult(p) => p.room.as_ref(),
            Self::GameStateUpdate(p) => p.room.as_ref(),
            Self::GameFinished(p) => p.room.as_ref(),
            Self::OpponentDisconnected(p) => p.room.as_ref(),
            Self::TimerUpdate(p) => p.room.as_ref(),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_room_joined_with_defaults() {
        let raw = json!({
            "event": "roomJoined",
            "data": {"room": {
                "roomId": "R1",
                "players": [{"userId": "u1", "username": "Alice", "isHost": true, "isReady": false, "score": 0}],
                "status": "waiting",
                "maxPlayers": 2
            }}
        });
        let msg: ServerMessage = serde_json::from_value(raw).unwrap();
        let ServerMessage::RoomJoined(RoomSnapshot { room }) = msg else {
            panic!("expected roomJoined");
        };
        assert_eq!(room.room_id, "R1");
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].is_host);
        assert!(room.players[0].joined_at.is_none());
        assert!(room.game_state.is_none());
        assert!(room.chat_messages.is_empty());
    }

    #[test]
    fn client_messages_use_camel_case_envelope() {
        let msg = ClientMessage::PlayerReady {
            user_id: "u1".into(),
            is_ready: true,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"event": "playerReady", "data": {"userId": "u1", "isReady": true}})
        );
        assert_eq!(msg.name(), "playerReady");
    }

    #[test]
    fn join_lobby_omits_missing_league() {
        let msg = ClientMessage::JoinLobby {
            user_id: "u1".into(),
            username: "Alice".into(),
            league: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"event": "joinLobby", "data": {"userId": "u1", "username": "Alice"}})
        );
    }

    #[test]
    fn click_cell_by_coordinates() {
        let msg = ClientMessage::click_cell("u1", CellTarget::Coords { row: 1, col: 2 });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"event": "clickCell", "data": {"userId": "u1", "row": 1, "col": 2}})
        );
    }

    #[test]
    fn answer_submission_flattens_extra_fields() {
        let msg = ClientMessage::SubmitAnswer(
            Answer::player_name("Pirlo")
                .with_question("q7")
                .with_field("teamId", 3)
                .into_submission("u2"),
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"event": "submitAnswer", "data": {
                "userId": "u2", "playerName": "Pirlo", "questionId": "q7", "teamId": 3
            }})
        );
    }

    #[test]
    fn timer_update_without_room() {
        let msg: ServerMessage =
            serde_json::from_value(json!({"event": "timerUpdate", "data": {"timeRemaining": 14}}))
                .unwrap();
        assert_eq!(msg.kind(), ServerEventKind::TimerUpdate);
        assert!(msg.room().is_none());
    }

    #[test]
    fn opponent_disconnected_payload() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "event": "opponentDisconnected",
            "data": {"disconnectedPlayer": {"username": "Bob"}, "winner": "u1"}
        }))
        .unwrap();
        let ServerMessage::OpponentDisconnected(payload) = msg else {
            panic!("expected opponentDisconnected");
        };
        assert_eq!(payload.disconnected_player.username, "Bob");
        assert_eq!(payload.winner.as_deref(), Some("u1"));
    }

    #[test]
    fn unknown_event_fails_to_decode() {
        let result = serde_json::from_value::<ServerMessage>(json!({"event": "bogus", "data": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn with_timer_preserves_other_fields() {
        let mut room = Room::new("R1", 2);
        room.game_state = Some(json!({"timer": 15, "other": "x"}));
        let next = room.with_timer(14);
        assert_eq!(next.game_state, Some(json!({"timer": 14, "other": "x"})));
        assert_eq!(next.timer(), Some(14));
        assert_eq!(room.timer(), Some(15));
    }

    #[test]
    fn kind_names_match_wire_tags() {
        for kind in ServerEventKind::ALL {
            let name = kind.as_str();
            let first = name.chars().next().unwrap();
            assert!(first.is_ascii_lowercase(), "{name} should be camelCase");
        }
        let msg = ServerMessage::GameReset(RoomNotice::default());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], msg.kind().as_str());
    }
}
