//! Action Dispatcher: the consumer-facing game session.
//!
//! A [`GameSession`] binds one namespace of a shared [`ConnectionManager`] to
//! a Room State cell, a game-result cell, an error field and a
//! [`SessionEvent`] bus. Consumers call intention-revealing actions; state
//! arrives asynchronously through the listener registry.
//!
//! Two actions are awaitable: [`join_lobby`](GameSession::join_lobby) and
//! [`reset_game`](GameSession::reset_game). Every other action is
//! fire-and-forget and returns `false`, emitting nothing, when its
//! preconditions (connection, user id, room) are not met.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), matchday_client::MatchdayError> {
//! use std::sync::Arc;
//! use matchday_client::{
//!     ConnectionManager, GameSession, MemoryIdentityStore, SessionConfig,
//!     WebSocketConnector,
//! };
//!
//! let manager = ConnectionManager::new(WebSocketConnector::new("wss://play.example.com"));
//! manager.set_auth_token(Some("jwt".into()));
//!
//! let session = GameSession::new(
//!     manager,
//!     "/quiz",
//!     Arc::new(MemoryIdentityStore::new()),
//!     SessionConfig::default(),
//! );
//! let room = session.join_lobby("u1", "Alice", None).await?;
//! println!("seated in {}", room.room_id);
//! session.toggle_ready();
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::connection::{Connection, EventListener};
use crate::correlate::{Correlator, RequestKind};
use crate::error::{MatchdayError, Result};
use crate::event::{GameResult, Outcome, SessionEvent};
use crate::identity::{Identity, IdentityStore};
use crate::manager::{ConnectionManager, ConnectionObserver, Disconnect};
use crate::protocol::{
    Answer, CellTarget, ClientMessage, Room, RoomId, RoomStatus, ServerMessage, UserId,
};
use crate::registry::{self, Change, Context};
use crate::store::StateCell;

/// A game session on one namespace.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct GameSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    namespace: String,
    manager: ConnectionManager,
    identity_store: Arc<dyn IdentityStore>,
    config: SessionConfig,
    room: StateCell<Option<Room>>,
    result: StateCell<Option<GameResult>>,
    error: StateCell<Option<String>>,
    identity: StateCell<Identity>,
    correlator: Correlator,
    events: broadcast::Sender<SessionEvent>,
    awaiting_room: AtomicBool,
    last_room_id: Mutex<Option<RoomId>>,
    hook: Arc<SessionHook>,
}

/// Weak back-reference handed to the manager and the connection, so neither
/// keeps a dropped session alive.
struct SessionHook(Weak<SessionInner>);

impl GameSession {
    /// Create a session and attach it to `namespace`.
    ///
    /// The stored identity is loaded immediately. If the namespace is already
    /// connected, the listener registry is attached to that connection.
    pub fn new(
        manager: ConnectionManager,
        namespace: impl Into<String>,
        identity_store: Arc<dyn IdentityStore>,
        config: SessionConfig,
    ) -> Self {
        let namespace = namespace.into();
        let identity = identity_store.load().unwrap_or_else(|e| {
            warn!("failed to load stored identity: {e}");
            Identity::default()
        });
        let (events, _rx) = broadcast::channel(config.event_channel_capacity.max(1));

        let inner = Arc::new_cyclic(|weak| SessionInner {
            namespace,
            manager,
            identity_store,
            config,
            room: StateCell::new(None),
            result: StateCell::new(None),
            error: StateCell::new(None),
            identity: StateCell::new(identity),
            correlator: Correlator::new(),
            events,
            awaiting_room: AtomicBool::new(false),
            last_room_id: Mutex::new(None),
            hook: Arc::new(SessionHook(weak.clone())),
        });

        let observer: Arc<dyn ConnectionObserver> = inner.hook.clone();
        inner.manager.attach(&inner.namespace, observer);
        Self { inner }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.inner.manager
    }

    /// Current Room State.
    pub fn room(&self) -> Option<Room> {
        self.inner.room.get()
    }

    /// Receiver woken once per actual Room State change.
    pub fn subscribe_room(&self) -> watch::Receiver<Option<Room>> {
        self.inner.room.subscribe()
    }

    /// Number of accepted Room State changes.
    pub fn room_version(&self) -> u64 {
        self.inner.room.version()
    }

    pub fn game_result(&self) -> Option<GameResult> {
        self.inner.result.get()
    }

    pub fn subscribe_result(&self) -> watch::Receiver<Option<GameResult>> {
        self.inner.result.subscribe()
    }

    /// The result seen from the local player.
    pub fn outcome(&self) -> Option<Outcome> {
        let user_id = self.user_id()?;
        self.inner
            .result
            .with(|result| result.as_ref().map(|r| r.outcome_for(&user_id)))
    }

    /// `true` once the room is `finished` or a result is known.
    pub fn is_game_over(&self) -> bool {
        let finished = self.inner.room.with(|room| {
            room.as_ref()
                .is_some_and(|r| r.status == RoomStatus::Finished)
        });
        finished || self.inner.result.with(Option::is_some)
    }

    /// Last server error, or the last connection error.
    pub fn error(&self) -> Option<String> {
        self.inner.error.get().or_else(|| self.inner.manager.error())
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error.subscribe()
    }

    pub fn clear_error(&self) {
        self.inner.error.set(None);
        self.inner.manager.clear_error();
    }

    pub fn identity(&self) -> Identity {
        self.inner.identity.get()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.inner.identity.with(|identity| identity.user_id.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.manager.is_connected(&self.inner.namespace)
    }

    /// Subscribe to [`SessionEvent`]s. Slow subscribers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        self.inner.manager.connection(&self.inner.namespace)
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Connect this session's namespace (or reuse the live connection).
    ///
    /// # Errors
    ///
    /// See [`ConnectionManager::connect`].
    pub async fn connect(&self) -> Result<()> {
        self.inner.manager.connect(&self.inner.namespace).await
    }

    /// Re-attach the listener registry to the live connection, e.g. when a
    /// view remounts. Attaching again never duplicates event handling.
    /// Returns `false` when not connected.
    pub fn attach(&self) -> bool {
        let Some(connection) = self.connection() else {
            return false;
        };
        let listener: Arc<dyn EventListener> = self.inner.hook.clone();
        registry::attach(&connection, &listener);
        true
    }

    /// Stop handling server events, e.g. when the game view unmounts.
    /// Room State keeps its last value; [`attach`](Self::attach) resumes.
    pub fn detach(&self) -> bool {
        let Some(connection) = self.connection() else {
            return false;
        };
        registry::detach(&connection);
        true
    }

    /// Leave the room if in one, then close the transport.
    ///
    /// The `leaveRoom` notification gets [`SessionConfig::leave_grace`] to be
    /// flushed. Room State and the game result are cleared; identity is kept.
    pub async fn disconnect(&self) {
        if self.emit_in_room("leaveRoom", |user_id, _| {
            Some(ClientMessage::LeaveRoom { user_id })
        }) {
            tokio::time::sleep(self.inner.config.leave_grace).await;
        }
        self.inner
            .manager
            .disconnect(&self.inner.namespace)
            .await;
        self.inner.forget_room();
    }

    // ── Request/response actions ────────────────────────────────────

    /// Join a lobby room and wait for the server to seat the player.
    ///
    /// Connects first if needed, waiting up to [`SessionConfig::connect_wait`].
    /// The identity is persisted before the request is sent. Resolves with the
    /// joined room, which is already in Room State by then.
    ///
    /// # Errors
    ///
    /// - [`MatchdayError::NotConnected`] if no connection could be made in time
    /// - any connect error from [`ConnectionManager::connect`]
    /// - [`MatchdayError::Server`] on a server `error` (check
    ///   [`MatchdayError::is_room_full`])
    /// - [`MatchdayError::Timeout`] after [`SessionConfig::join_timeout`]
    /// - [`MatchdayError::Superseded`] if another join replaced this one
    pub async fn join_lobby(
        &self,
        user_id: impl Into<UserId>,
        username: impl Into<String>,
        league: Option<&str>,
    ) -> Result<Room> {
        let user_id = user_id.into();
        let username = username.into();
        let inner = &self.inner;

        if !self.is_connected() {
            self.connect().await?;
            if !inner
                .manager
                .wait_connected(&inner.namespace, inner.config.connect_wait)
                .await
            {
                return Err(MatchdayError::NotConnected);
            }
        }
        let connection = self.connection().ok_or(MatchdayError::NotConnected)?;

        inner.persist_identity(Identity::new(user_id.clone(), username.clone()));

        inner.awaiting_room.store(true, Ordering::Release);
        let ticket = inner.correlator.register(RequestKind::Join);
        info!(namespace = %inner.namespace, user_id = %user_id, "joining lobby");
        if let Err(e) = connection.emit(ClientMessage::JoinLobby {
            user_id,
            username,
            league: league.map(str::to_string),
        }) {
            inner.correlator.abandon(ticket);
            inner.awaiting_room.store(false, Ordering::Release);
            return Err(e);
        }

        let outcome = inner
            .correlator
            .wait(ticket, inner.config.join_timeout)
            .await;
        if !inner.correlator.is_pending(RequestKind::Join) {
            inner.awaiting_room.store(false, Ordering::Release);
        }
        match outcome {
            Ok(Some(room)) => Ok(room),
            Ok(None) => Err(MatchdayError::NotInRoom),
            Err(e) => {
                debug!(namespace = %inner.namespace, "join failed: {e}");
                Err(e)
            }
        }
    }

    /// Ask the server to reset the finished game and wait for `gameReset`.
    ///
    /// Room State is not cleared here; the `gameReset` event does that
    /// through the listener registry.
    ///
    /// # Errors
    ///
    /// - [`MatchdayError::NotConnected`], [`MatchdayError::NotInRoom`] or
    ///   [`MatchdayError::MissingIdentity`] when preconditions fail
    /// - [`MatchdayError::Server`] on a server `error`
    /// - [`MatchdayError::Timeout`] after [`SessionConfig::reset_timeout`]
    pub async fn reset_game(&self) -> Result<()> {
        let inner = &self.inner;
        let connection = self.connection().ok_or(MatchdayError::NotConnected)?;
        if inner.room.with(Option::is_none) {
            return Err(MatchdayError::NotInRoom);
        }
        let user_id = self.user_id().ok_or(MatchdayError::MissingIdentity)?;

        let ticket = inner.correlator.register(RequestKind::Reset);
        if let Err(e) = connection.emit(ClientMessage::ResetGame { user_id }) {
            inner.correlator.abandon(ticket);
            return Err(e);
        }
        inner
            .correlator
            .wait(ticket, inner.config.reset_timeout)
            .await
            .map(|_| ())
    }

    // ── Fire-and-forget actions ─────────────────────────────────────

    /// Emit the message built from the user id and current room, if all
    /// three (connection, user id, room) are present.
    fn emit_in_room(
        &self,
        action: &'static str,
        build: impl FnOnce(UserId, &Room) -> Option<ClientMessage>,
    ) -> bool {
        let Some(user_id) = self.user_id() else {
            debug!(action, "no user id; action ignored");
            return false;
        };
        let Some(message) = self
            .inner
            .room
            .with(|room| room.as_ref().and_then(|r| build(user_id, r)))
        else {
            debug!(action, "not in a room; action ignored");
            return false;
        };
        self.emit(action, message)
    }

    fn emit(&self, action: &'static str, message: ClientMessage) -> bool {
        let Some(connection) = self.connection() else {
            debug!(action, "not connected; action ignored");
            return false;
        };
        match connection.emit(message) {
            Ok(()) => true,
            Err(e) => {
                debug!(action, "emit failed: {e}");
                false
            }
        }
    }

    /// Flip the local player's ready flag.
    pub fn toggle_ready(&self) -> bool {
        self.emit_in_room("playerReady", |user_id, room| {
            let is_ready = !room.player(&user_id)?.is_ready;
            Some(ClientMessage::PlayerReady { user_id, is_ready })
        })
    }

    pub fn start_game(&self) -> bool {
        self.emit_in_room("startGame", |user_id, _| {
            Some(ClientMessage::StartGame { user_id })
        })
    }

    pub fn click_cell(&self, target: CellTarget) -> bool {
        self.emit_in_room("clickCell", |user_id, _| {
            Some(ClientMessage::click_cell(user_id, target))
        })
    }

    pub fn submit_answer(&self, answer: Answer) -> bool {
        self.emit_in_room("submitAnswer", |user_id, _| {
            Some(ClientMessage::SubmitAnswer(answer.into_submission(user_id)))
        })
    }

    pub fn skip_turn(&self) -> bool {
        self.emit_in_room("skipTurn", |user_id, _| {
            Some(ClientMessage::SkipTurn { user_id })
        })
    }

    pub fn skip_question(&self) -> bool {
        self.emit_in_room("skipQuestion", |user_id, _| {
            Some(ClientMessage::SkipQuestion { user_id })
        })
    }

    pub fn request_draw(&self) -> bool {
        self.emit_in_room("requestDraw", |user_id, _| {
            Some(ClientMessage::RequestDraw { user_id })
        })
    }

    pub fn respond_draw(&self, accept: bool) -> bool {
        self.emit_in_room("respondDraw", |user_id, _| {
            Some(ClientMessage::RespondDraw { user_id, accept })
        })
    }

    pub fn request_rematch(&self) -> bool {
        self.emit_in_room("rematchRequest", |user_id, _| {
            Some(ClientMessage::RematchRequest { user_id })
        })
    }

    pub fn accept_rematch(&self) -> bool {
        self.emit_in_room("acceptRematch", |user_id, _| {
            Some(ClientMessage::AcceptRematch { user_id })
        })
    }

    pub fn decline_rematch(&self) -> bool {
        self.emit_in_room("declineRematch", |user_id, _| {
            Some(ClientMessage::DeclineRematch { user_id })
        })
    }

    /// Tell the server we are leaving and drop Room State.
    ///
    /// Room State is cleared even when nothing could be sent.
    pub fn leave_room(&self) -> bool {
        let sent = self.emit_in_room("leaveRoom", |user_id, _| {
            Some(ClientMessage::LeaveRoom { user_id })
        });
        self.inner.forget_room();
        sent
    }

    /// Leave even if the server still has us in a running game, drop Room
    /// State and publish [`SessionEvent::ForceLeaveRequested`].
    ///
    /// Does not require a current room.
    pub fn force_leave_room(&self) -> bool {
        let sent = match self.user_id() {
            Some(user_id) => self.emit("forceLeaveRoom", ClientMessage::ForceLeaveRoom { user_id }),
            None => false,
        };
        self.inner.forget_room();
        self.inner.publish(SessionEvent::ForceLeaveRequested);
        sent
    }

    /// Ask the server for the authoritative room. The reply is applied even
    /// if there is no current room.
    pub fn request_game_state(&self) -> bool {
        let Some(user_id) = self.user_id() else {
            return false;
        };
        if !self.is_connected() {
            debug!("not connected; getGameState ignored");
            return false;
        }
        // The reply can be applied before `emit` returns.
        self.inner.awaiting_room.store(true, Ordering::Release);
        let sent = self.emit("getGameState", ClientMessage::GetGameState { user_id });
        if !sent {
            self.inner.awaiting_room.store(false, Ordering::Release);
        }
        sent
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("namespace", &self.inner.namespace)
            .field("connected", &self.is_connected())
            .field(
                "room_id",
                &self.inner.room.with(|r| r.as_ref().map(|r| r.room_id.clone())),
            )
            .field("user_id", &self.user_id())
            .finish()
    }
}

// ── Shared state ────────────────────────────────────────────────────

impl SessionInner {
    fn publish(&self, event: SessionEvent) {
        debug!(namespace = %self.namespace, ?event, "session event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn persist_identity(&self, identity: Identity) {
        if let Err(e) = self.identity_store.save(&identity) {
            warn!("failed to persist identity: {e}");
        }
        if self.identity.set(identity.clone()) {
            if let (Some(user_id), Some(username)) = (identity.user_id, identity.username) {
                self.publish(SessionEvent::IdentityChanged { user_id, username });
            }
        }
    }

    fn forget_room(&self) {
        self.room.set(None);
        self.result.set(None);
        self.awaiting_room.store(false, Ordering::Release);
        *self
            .last_room_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn apply(&self, message: &ServerMessage) {
        let ctx = Context {
            awaiting_room: self.awaiting_room.load(Ordering::Acquire),
            draw_policy: self.config.draw_policy,
            result: self.result.get(),
        };
        let transition = self
            .room
            .with(|prior| registry::transition(prior.as_ref(), message, &ctx));

        match transition.room {
            Change::Keep => {}
            Change::Set(room) => {
                *self
                    .last_room_id
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(room.room_id.clone());
                self.room.set(Some(room));
                self.awaiting_room.store(false, Ordering::Release);
            }
            Change::Clear => {
                self.room.set(None);
                *self
                    .last_room_id
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = None;
            }
        }
        match transition.result {
            Change::Keep => {}
            Change::Set(result) => {
                self.result.set(Some(result));
            }
            Change::Clear => {
                self.result.set(None);
            }
        }
        if let Some(message) = transition.error {
            self.error.set(Some(message));
        }

        // Store first, then settle: a join resolves with its room already applied.
        self.correlator.settle(message);

        for event in transition.events {
            self.publish(event);
        }
    }

    fn resync(&self, connection: &Connection) {
        let had_room = self
            .last_room_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        let Some(user_id) = self.identity.with(|i| i.user_id.clone()) else {
            return;
        };
        if !had_room {
            return;
        }
        info!(namespace = %self.namespace, "requesting game state after reconnect");
        self.awaiting_room.store(true, Ordering::Release);
        if let Err(e) = connection.emit(ClientMessage::GetGameState { user_id }) {
            debug!("resync request failed: {e}");
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let observer: Arc<dyn ConnectionObserver> = self.hook.clone();
        self.manager.detach(&self.namespace, &observer);
    }
}

impl EventListener for SessionHook {
    fn on_event(&self, message: &ServerMessage) {
        if let Some(inner) = self.0.upgrade() {
            inner.apply(message);
        }
    }
}

impl ConnectionObserver for SessionHook {
    fn on_connected(&self, connection: &Arc<Connection>, reconnected: bool) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        let listener: Arc<dyn EventListener> = inner.hook.clone();
        registry::attach(connection, &listener);
        if reconnected {
            inner.resync(connection);
        }
        inner.publish(SessionEvent::Connected { reconnected });
    }

    fn on_disconnected(&self, disconnect: &Disconnect) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        // Events are not replayed across a gap; the room is re-requested on reconnect.
        inner.room.set(None);
        if disconnect.local {
            inner.forget_room();
        }
        inner.publish(SessionEvent::Disconnected {
            reason: disconnect.reason.clone(),
            local: disconnect.local,
            will_reconnect: disconnect.will_reconnect,
        });
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use crate::protocol::{Player, RoomSnapshot};
    use crate::transports::loopback::{Accepted, LoopbackAcceptor, LoopbackConnector};
    use std::time::Duration;

    async fn connected_session() -> (GameSession, Accepted, LoopbackAcceptor) {
        let (connector, mut acceptor) = LoopbackConnector::new();
        let manager = ConnectionManager::new(connector);
        manager.set_auth_token(Some("t".into()));
        let session = GameSession::new(
            manager,
            "/quiz",
            Arc::new(MemoryIdentityStore::with_identity(Identity::new("u1", "Alice"))),
            SessionConfig::default(),
        );
        session.connect().await.unwrap();
        let accepted = acceptor.accept().await.unwrap();
        (session, accepted, acceptor)
    }

    fn lobby(ready: bool) -> Room {
        let mut room = Room::new("R1", 2);
        room.players.push(Player {
            user_id: "u1".into(),
            username: "Alice".into(),
            is_host: true,
            is_ready: ready,
            score: 0,
            joined_at: None,
        });
        room
    }

    async fn seat(session: &GameSession, accepted: &Accepted, room: Room) {
        let mut rx = session.subscribe_room();
        session.inner.awaiting_room.store(true, Ordering::Release);
        accepted
            .server
            .push(&ServerMessage::RoomJoined(RoomSnapshot { room }));
        rx.wait_for(Option::is_some).await.unwrap();
    }

    #[tokio::test]
    async fn actions_without_room_are_silent_no_ops() {
        let (session, mut accepted, _acceptor) = connected_session().await;
        assert!(!session.toggle_ready());
        assert!(!session.start_game());
        assert!(!session.click_cell(CellTarget::Coords { row: 0, col: 1 }));
        assert!(!session.submit_answer(Answer::text("Messi")));
        assert!(!session.request_draw());
        assert!(!session.accept_rematch());
        tokio::task::yield_now().await;
        assert!(accepted.server.drain_sent().is_empty());
    }

    #[tokio::test]
    async fn toggle_ready_inverts_current_flag() {
        let (session, mut accepted, _acceptor) = connected_session().await;
        seat(&session, &accepted, lobby(false)).await;

        assert!(session.toggle_ready());
        assert_eq!(
            accepted.server.next_sent().await.unwrap(),
            ClientMessage::PlayerReady {
                user_id: "u1".into(),
                is_ready: true
            }
        );
    }

    #[tokio::test]
    async fn reset_requires_room() {
        let (session, _accepted, _acceptor) = connected_session().await;
        assert!(matches!(
            session.reset_game().await,
            Err(MatchdayError::NotInRoom)
        ));
    }

    #[tokio::test]
    async fn leave_room_clears_state() {
        let (session, mut accepted, _acceptor) = connected_session().await;
        seat(&session, &accepted, lobby(false)).await;

        assert!(session.leave_room());
        assert!(session.room().is_none());
        assert_eq!(
            accepted.server.next_sent().await.unwrap(),
            ClientMessage::LeaveRoom {
                user_id: "u1".into()
            }
        );
    }

    #[tokio::test]
    async fn force_leave_publishes_signal_without_room() {
        let (session, mut accepted, _acceptor) = connected_session().await;
        let mut events = session.subscribe();
        assert!(session.force_leave_room());
        assert_eq!(events.recv().await.unwrap(), SessionEvent::ForceLeaveRequested);
        assert_eq!(
            accepted.server.next_sent().await.unwrap(),
            ClientMessage::ForceLeaveRoom {
                user_id: "u1".into()
            }
        );
    }

    #[tokio::test]
    async fn disconnect_sends_leave_and_keeps_identity() {
        let (session, mut accepted, _acceptor) = connected_session().await;
        seat(&session, &accepted, lobby(false)).await;

        session.disconnect().await;
        assert_eq!(
            accepted.server.next_sent().await.unwrap(),
            ClientMessage::LeaveRoom {
                user_id: "u1".into()
            }
        );
        assert!(accepted.server.client_closed());
        assert!(session.room().is_none());
        assert!(!session.is_connected());
        assert_eq!(session.identity(), Identity::new("u1", "Alice"));
    }

    #[tokio::test]
    async fn dropped_session_detaches_from_manager() {
        let (session, accepted, _acceptor) = connected_session().await;
        let manager = session.manager().clone();
        drop(session);
        // Events for a dropped session are ignored.
        accepted
            .server
            .push(&ServerMessage::RoomJoined(RoomSnapshot { room: lobby(false) }));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(manager.is_connected("/quiz"));
    }

    #[tokio::test]
    async fn unsent_game_state_request_leaves_nothing_pending() {
        let (session, accepted, _acceptor) = connected_session().await;
        session.manager().disconnect("/quiz").await;
        assert!(!session.request_game_state());
        assert!(!session.inner.awaiting_room.load(Ordering::Acquire));
        assert!(accepted.server.client_closed());
    }
}
