#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the Matchday Client.
//!
//! Client frames are checked against the exact JSON the game servers expect;
//! server frames are decoded from fixtures shaped like real server output.

use matchday_client::error_codes::ErrorCode;
use matchday_client::protocol::{
    Answer, CellTarget, ClientMessage, RoomStatus, ServerEventKind, ServerMessage,
};
use serde_json::{json, Value};

fn wire(msg: &ClientMessage) -> Value {
    serde_json::to_value(msg).expect("serialize")
}

fn decode(value: Value) -> ServerMessage {
    serde_json::from_value(value).expect("decode server frame")
}

// ════════════════════════════════════════════════════════════════════
// Client → server
// ════════════════════════════════════════════════════════════════════

#[test]
fn client_frames_match_server_contract() {
    let u = || "u1".to_string();
    let cases = vec![
        (
            ClientMessage::JoinLobby {
                user_id: u(),
                username: "Alice".into(),
                league: Some("serie-a".into()),
            },
            json!({"event": "joinLobby", "data": {"userId": "u1", "username": "Alice", "league": "serie-a"}}),
        ),
        (
            ClientMessage::LeaveRoom { user_id: u() },
            json!({"event": "leaveRoom", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::ForceLeaveRoom { user_id: u() },
            json!({"event": "forceLeaveRoom", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::PlayerReady {
                user_id: u(),
                is_ready: true,
            },
            json!({"event": "playerReady", "data": {"userId": "u1", "isReady": true}}),
        ),
        (
            ClientMessage::StartGame { user_id: u() },
            json!({"event": "startGame", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::click_cell(u(), CellTarget::Id("c-7".into())),
            json!({"event": "clickCell", "data": {"userId": "u1", "cellId": "c-7"}}),
        ),
        (
            ClientMessage::click_cell(u(), CellTarget::Coords { row: 2, col: 0 }),
            json!({"event": "clickCell", "data": {"userId": "u1", "row": 2, "col": 0}}),
        ),
        (
            ClientMessage::SkipTurn { user_id: u() },
            json!({"event": "skipTurn", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::SkipQuestion { user_id: u() },
            json!({"event": "skipQuestion", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::RequestDraw { user_id: u() },
            json!({"event": "requestDraw", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::RespondDraw {
                user_id: u(),
                accept: false,
            },
            json!({"event": "respondDraw", "data": {"userId": "u1", "accept": false}}),
        ),
        (
            ClientMessage::RematchRequest { user_id: u() },
            json!({"event": "rematchRequest", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::AcceptRematch { user_id: u() },
            json!({"event": "acceptRematch", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::DeclineRematch { user_id: u() },
            json!({"event": "declineRematch", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::ResetGame { user_id: u() },
            json!({"event": "resetGame", "data": {"userId": "u1"}}),
        ),
        (
            ClientMessage::GetGameState { user_id: u() },
            json!({"event": "getGameState", "data": {"userId": "u1"}}),
        ),
    ];

    for (msg, expected) in cases {
        assert_eq!(wire(&msg), expected, "{}", msg.name());
        assert_eq!(expected["event"], msg.name());
    }
}

#[test]
fn quiz_answer_frame() {
    let msg = ClientMessage::SubmitAnswer(
        Answer::text("Ronaldo")
            .with_question("q-12")
            .into_submission("u1"),
    );
    assert_eq!(
        wire(&msg),
        json!({"event": "submitAnswer", "data": {"userId": "u1", "answer": "Ronaldo", "questionId": "q-12"}})
    );
}

#[test]
fn team_guess_answer_frame_carries_extra_fields() {
    let msg = ClientMessage::SubmitAnswer(
        Answer::player_name("Pirlo")
            .with_cell(CellTarget::Coords { row: 1, col: 1 })
            .with_field("teamId", 33)
            .into_submission("u2"),
    );
    assert_eq!(
        wire(&msg),
        json!({"event": "submitAnswer", "data": {
            "userId": "u2", "playerName": "Pirlo", "row": 1, "col": 1, "teamId": 33
        }})
    );
}

// ════════════════════════════════════════════════════════════════════
// Server → client
// ════════════════════════════════════════════════════════════════════

fn room_fixture(status: &str) -> Value {
    json!({
        "roomId": "R9",
        "players": [
            {"userId": "u1", "username": "Alice", "isHost": true, "isReady": true, "score": 4,
             "joinedAt": "2026-03-01T12:00:00Z"},
            {"userId": "u2", "username": "Bob", "isHost": false, "isReady": true, "score": 2}
        ],
        "maxPlayers": 4,
        "status": status,
        "currentTurnUserId": "u2",
        "gameState": {"grid": [["X", null], [null, "O"]], "timer": 12},
        "chatMessages": [{"from": "u2", "text": "gl"}]
    })
}

#[test]
fn every_server_event_name_decodes() {
    for kind in ServerEventKind::ALL {
        let data = match kind {
            ServerEventKind::RoomJoined => json!({"room": room_fixture("waiting")}),
            ServerEventKind::OpponentDisconnected => {
                json!({"disconnectedPlayer": {"username": "Bob"}, "winner": "u1"})
            }
            ServerEventKind::TimerUpdate => json!({"timeRemaining": 7}),
            ServerEventKind::Error => json!({"message": "Not your turn"}),
            ServerEventKind::AnswerResult => json!({"userId": "u1", "correct": true}),
            _ => json!({"room": room_fixture("playing")}),
        };
        let msg = decode(json!({"event": kind.as_str(), "data": data}));
        assert_eq!(msg.kind(), kind);
    }
}

#[test]
fn full_room_fixture_decodes_every_field() {
    let msg = decode(json!({"event": "gameStarted", "data": {"room": room_fixture("playing")}}));
    let room = msg.room().unwrap();
    assert_eq!(room.room_id, "R9");
    assert_eq!(room.max_players, 4);
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.current_turn_user_id.as_deref(), Some("u2"));
    assert_eq!(room.players[0].joined_at.as_deref(), Some("2026-03-01T12:00:00Z"));
    assert_eq!(room.players[1].score, 2);
    assert_eq!(room.timer(), Some(12));
    assert_eq!(room.chat_messages.len(), 1);
    assert!(room.is_turn_of("u2"));
    assert!(!room.is_full());
}

#[test]
fn narrow_game_state_update_has_no_room() {
    let msg = decode(json!({"event": "gameStateUpdate", "data": {"timeRemaining": 3}}));
    let ServerMessage::GameStateUpdate(payload) = msg else {
        panic!("expected gameStateUpdate");
    };
    assert!(payload.room.is_none());
    assert_eq!(payload.time_remaining, Some(3));
}

#[test]
fn game_finished_fixture() {
    let msg = decode(json!({
        "event": "gameFinished",
        "data": {"room": room_fixture("finished"), "winner": "u1", "isDraw": false, "reason": "completed"}
    }));
    let ServerMessage::GameFinished(payload) = msg else {
        panic!("expected gameFinished");
    };
    assert_eq!(payload.winner.as_deref(), Some("u1"));
    assert!(!payload.is_draw);
    assert_eq!(payload.room.unwrap().status, RoomStatus::Finished);
}

#[test]
fn unknown_event_is_rejected() {
    let result: Result<ServerMessage, _> =
        serde_json::from_value(json!({"event": "chatMessage", "data": {}}));
    assert!(result.is_err());
}

// ════════════════════════════════════════════════════════════════════
// Error codes
// ════════════════════════════════════════════════════════════════════

#[test]
fn error_code_encoding_is_screaming_snake_case() {
    assert_eq!(serde_json::to_value(ErrorCode::RoomFull).unwrap(), "ROOM_FULL");
    assert_eq!(serde_json::to_value(ErrorCode::NotYourTurn).unwrap(), "NOT_YOUR_TURN");

    let msg = decode(json!({"event": "error", "data": {"message": "Room is full", "code": "ROOM_FULL"}}));
    let ServerMessage::Error(payload) = msg else {
        panic!("expected error");
    };
    assert_eq!(payload.code, Some(ErrorCode::RoomFull));
}

#[test]
fn plain_server_messages_are_classified() {
    assert_eq!(ErrorCode::classify("Room is full"), Some(ErrorCode::RoomFull));
    assert_eq!(ErrorCode::classify("room not found"), Some(ErrorCode::RoomNotFound));
    assert_eq!(ErrorCode::classify("something odd"), None);
}
