//! # Quiz Lobby Example
//!
//! Demonstrates a complete Matchday session lifecycle:
//!
//! 1. Connect to the `/quiz` namespace over WebSocket with a bearer token
//! 2. Join a lobby and mark the player ready
//! 3. Follow Room State changes (players, turns, timer)
//! 4. Report the outcome when the game finishes
//! 5. Leave and shut down on Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # Start a Matchday game server on localhost:3000, then:
//! MATCHDAY_TOKEN=<jwt> cargo run --example quiz_lobby
//!
//! # Override the server URL or the player:
//! MATCHDAY_URL=wss://play.example.com MATCHDAY_USER=u42 cargo run --example quiz_lobby
//! ```

use std::sync::Arc;

use matchday_client::{
    ConnectionManager, FileIdentityStore, GameSession, SessionConfig, SessionEvent,
    WebSocketConnector,
};

/// Default server URL when `MATCHDAY_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=matchday_client=debug` for per-frame output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("MATCHDAY_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let token = std::env::var("MATCHDAY_TOKEN").ok();
    let user_id = std::env::var("MATCHDAY_USER").unwrap_or_else(|_| "demo-user".to_string());
    tracing::info!("Connecting to {url}/quiz");

    let manager = ConnectionManager::new(WebSocketConnector::new(&url));
    manager.set_auth_token(token);

    let session = GameSession::new(
        manager.clone(),
        "/quiz",
        Arc::new(FileIdentityStore::new("matchday-identity.json")),
        SessionConfig::default(),
    );
    let mut events = session.subscribe();
    let mut room_rx = session.subscribe_room();

    // ── Join ────────────────────────────────────────────────────────
    let room = session.join_lobby(&user_id, "RustPlayer", None).await?;
    tracing::info!(
        "Joined room {} ({}/{} players)",
        room.room_id,
        room.players.len(),
        room.max_players
    );
    session.toggle_ready();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            changed = room_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(room) = room_rx.borrow_and_update().clone() else {
                    tracing::info!("No room");
                    continue;
                };
                tracing::info!(
                    "Room {} is {:?}; turn: {}; timer: {:?}",
                    room.room_id,
                    room.status,
                    room.current_turn_user_id.as_deref().unwrap_or("-"),
                    room.timer()
                );
            }

            event = events.recv() => {
                let Ok(event) = event else {
                    tracing::info!("Event bus closed, exiting");
                    break;
                };
                match event {
                    SessionEvent::GameFinished(result) => {
                        tracing::info!("Game over: {:?}", result.outcome_for(&user_id));
                    }
                    SessionEvent::OpponentDisconnected { username } => {
                        tracing::info!("{username} left; you win by default");
                    }
                    SessionEvent::ReturnToLobby => {
                        tracing::info!("Back in the lobby");
                        session.toggle_ready();
                    }
                    SessionEvent::Error { message } => {
                        tracing::error!("Server error: {message}");
                    }
                    SessionEvent::Disconnected { reason, will_reconnect, .. } => {
                        tracing::warn!(
                            "Disconnected: {} (reconnecting: {will_reconnect})",
                            reason.as_deref().unwrap_or("unknown")
                        );
                        if !will_reconnect {
                            break;
                        }
                    }
                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    session.disconnect().await;
    manager.shutdown().await;
    tracing::info!("Session closed. Goodbye!");
    Ok(())
}
