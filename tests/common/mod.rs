#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Matchday Client integration tests.
//!
//! Provides a scripted [`MockTransport`], a [`Harness`] wiring a
//! [`GameSession`] to a loopback server, and builders for common server
//! events.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use matchday_client::identity::MemoryIdentityStore;
use matchday_client::protocol::{
    ClientMessage, Player, Room, RoomNotice, RoomSnapshot, RoomStatus, ServerErrorPayload,
    ServerMessage,
};
use matchday_client::transports::{Accepted, LoopbackAcceptor, LoopbackConnector};
use matchday_client::{
    ConnectionConfig, ConnectionManager, GameSession, Identity, MatchdayError, SessionConfig,
    Transport,
};

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted mock transport.
///
/// Scripted server frames are consumed in order by `recv()`.
/// All frames sent by the client are recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, MatchdayError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(
        incoming: Vec<Option<Result<String, MatchdayError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), MatchdayError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, MatchdayError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // Out of script: stay open until closed.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), MatchdayError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub const NAMESPACE: &str = "/quiz";

/// A session on [`NAMESPACE`] backed by loopback connections.
pub struct Harness {
    pub manager: ConnectionManager,
    pub connector: LoopbackConnector,
    pub acceptor: LoopbackAcceptor,
    pub identity: Arc<MemoryIdentityStore>,
    pub session: GameSession,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        Self::with(ConnectionConfig::default(), config, Identity::default())
    }

    pub fn with(connection: ConnectionConfig, config: SessionConfig, identity: Identity) -> Self {
        let (connector, acceptor) = LoopbackConnector::new();
        let manager = ConnectionManager::with_config(connector.clone(), connection);
        manager.set_auth_token(Some("test-token".into()));
        let identity = Arc::new(MemoryIdentityStore::with_identity(identity));
        let session = GameSession::new(manager.clone(), NAMESPACE, identity.clone(), config);
        Self {
            manager,
            connector,
            acceptor,
            identity,
            session,
        }
    }

    pub async fn accept(&mut self) -> Accepted {
        tokio::time::timeout(Duration::from_secs(5), self.acceptor.accept())
            .await
            .expect("connection not opened in time")
            .expect("acceptor closed")
    }

    /// Connect and return the server side.
    pub async fn connect(&mut self) -> Accepted {
        self.session.connect().await.unwrap();
        self.accept().await
    }

    /// Join as `u1`/Alice and seat the player in [`lobby_room`].
    pub async fn join(&mut self) -> Accepted {
        let session = self.session.clone();
        let join = tokio::spawn(async move { session.join_lobby("u1", "Alice", None).await });
        let mut server = self.accept().await;
        expect_sent(&mut server, "joinLobby").await;
        server.server.push(&room_joined(lobby_room()));
        join.await.unwrap().unwrap();
        server
    }
}

/// Wait for the next client frame and check its event name.
pub async fn expect_sent(accepted: &mut Accepted, event: &str) -> ClientMessage {
    let message = tokio::time::timeout(Duration::from_secs(5), accepted.server.next_sent())
        .await
        .expect("no client frame in time")
        .expect("client side gone");
    assert_eq!(message.name(), event, "unexpected client event {message:?}");
    message
}

/// Wait until the room cell satisfies `predicate`.
pub async fn wait_room(session: &GameSession, predicate: impl FnMut(&Option<Room>) -> bool) {
    let mut rx = session.subscribe_room();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("room condition not reached in time")
        .unwrap();
}

// ── Builders ────────────────────────────────────────────────────────

pub fn player(user_id: &str, username: &str, is_host: bool) -> Player {
    Player {
        user_id: user_id.into(),
        username: username.into(),
        is_host,
        is_ready: false,
        score: 0,
        joined_at: None,
    }
}

/// `R1`, waiting, Alice as host.
pub fn lobby_room() -> Room {
    let mut room = Room::new("R1", 2);
    room.players.push(player("u1", "Alice", true));
    room
}

/// `R1`, playing, Alice and Bob, with a timer in the game state.
pub fn playing_room() -> Room {
    let mut room = lobby_room();
    room.players.push(player("u2", "Bob", false));
    room.status = RoomStatus::Playing;
    room.current_turn_user_id = Some("u1".into());
    room.game_state = Some(serde_json::json!({"timer": 15, "other": "x"}));
    room
}

pub fn room_joined(room: Room) -> ServerMessage {
    ServerMessage::RoomJoined(RoomSnapshot { room })
}

pub fn notice(room: Room) -> RoomNotice {
    RoomNotice {
        room: Some(room),
        ..RoomNotice::default()
    }
}

pub fn error(message: &str) -> ServerMessage {
    ServerMessage::Error(ServerErrorPayload {
        message: message.into(),
        code: None,
    })
}

pub fn to_json(message: &ServerMessage) -> String {
    serde_json::to_string(message).expect("server message serialization")
}
