//! # Loopback Session Example
//!
//! Drives a full tic-tac-toe session against an in-process fake server using
//! the built-in [`LoopbackConnector`]. This is useful for:
//!
//! - **Testing**: exercise your game view without a real server
//! - **Learning**: see exactly which frames the client sends and which
//!   server events move the Room State
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_session
//! ```

use std::sync::Arc;

use matchday_client::protocol::{
    GameFinishedPayload, Player, RoomNotice, RoomSnapshot, RoomStatus, ServerMessage,
};
use matchday_client::{
    CellTarget, ConnectionManager, GameSession, LoopbackConnector, MemoryIdentityStore, Room,
    SessionConfig, SessionEvent,
};

fn player(user_id: &str, username: &str, is_host: bool) -> Player {
    Player {
        user_id: user_id.into(),
        username: username.into(),
        is_host,
        is_ready: true,
        score: 0,
        joined_at: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ─────────────────────────────────────────────────────────────────
    // Step 1: Wire a session to the loopback connector
    // ─────────────────────────────────────────────────────────────────

    let (connector, mut acceptor) = LoopbackConnector::new();
    let manager = ConnectionManager::new(connector);
    manager.set_auth_token(Some("demo-token".into()));

    let session = GameSession::new(
        manager.clone(),
        "/tictactoe",
        Arc::new(MemoryIdentityStore::new()),
        SessionConfig::default(),
    );
    let mut events = session.subscribe();

    // ─────────────────────────────────────────────────────────────────
    // Step 2: Join; the fake server answers with `roomJoined`
    // ─────────────────────────────────────────────────────────────────

    let joining = {
        let session = session.clone();
        tokio::spawn(async move { session.join_lobby("u1", "Alice", None).await })
    };

    let Some(mut conn) = acceptor.accept().await else {
        return Err("connector dropped before the session connected".into());
    };
    tracing::info!(
        "Server accepted {} (token: {})",
        conn.namespace,
        conn.auth_token
    );

    let Some(join) = conn.server.next_sent().await else {
        return Err("client closed before joining".into());
    };
    tracing::info!("Server received: {}", join.name());

    let mut room = Room::new("R1", 2);
    room.players.push(player("u1", "Alice", true));
    room.players.push(player("u2", "Bob", false));
    conn.server
        .push(&ServerMessage::RoomJoined(RoomSnapshot { room: room.clone() }));

    let joined = joining.await??;
    tracing::info!("Joined {} with {} player(s)", joined.room_id, joined.players.len());

    // ─────────────────────────────────────────────────────────────────
    // Step 3: Start, play one move, finish
    // ─────────────────────────────────────────────────────────────────

    room.status = RoomStatus::Playing;
    room.current_turn_user_id = Some("u1".into());
    room.game_state = Some(serde_json::json!({
        "grid": [[null, null, null], [null, null, null], [null, null, null]],
        "timer": 30
    }));
    conn.server.push(&ServerMessage::GameStarted(RoomNotice {
        room: Some(room.clone()),
        ..RoomNotice::default()
    }));

    let mut room_rx = session.subscribe_room();
    room_rx
        .wait_for(|r| r.as_ref().is_some_and(|r| r.status == RoomStatus::Playing))
        .await?;
    let my_turn = session.room().is_some_and(|r| r.is_turn_of("u1"));
    tracing::info!("Game started; my turn: {my_turn}");

    session.click_cell(CellTarget::Coords { row: 1, col: 1 });
    if let Some(click) = conn.server.next_sent().await {
        tracing::info!("Server received: {}", serde_json::to_string(&click)?);
    }

    room.status = RoomStatus::Finished;
    conn.server.push(&ServerMessage::GameFinished(GameFinishedPayload {
        room: Some(room),
        winner: Some("u1".into()),
        is_draw: false,
        reason: Some("completed".into()),
    }));

    // ─────────────────────────────────────────────────────────────────
    // Step 4: Read session events until the result arrives
    // ─────────────────────────────────────────────────────────────────

    while let Ok(event) = events.recv().await {
        match event {
            SessionEvent::GameFinished(result) => {
                tracing::info!("Event: GameFinished: {:?}", result.outcome_for("u1"));
                break;
            }
            other => tracing::info!("Event: {other:?}"),
        }
    }

    // ── Clean shutdown ──────────────────────────────────────────────
    session.disconnect().await;
    if let Some(leave) = conn.server.next_sent().await {
        tracing::info!("Server received: {}", leave.name());
    }
    manager.shutdown().await;
    tracing::info!("Done. Loopback session works!");
    Ok(())
}
