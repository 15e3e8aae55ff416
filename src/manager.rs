//! Connection Manager: one live transport per namespace.
//!
//! Each game variant lives on its own server namespace (`/bingo`, `/quiz`,
//! `/team-guess`, `/tictactoe`). [`ConnectionManager`] opens at most one
//! transport per namespace, reuses it across sessions, and reconnects
//! automatically after unexpected drops.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!       ▲                          │                 │
//!       └──────────── err ─────────┘                 │ transport drop
//!       ▲                                            ▼
//!       └── disconnect() / attempts exhausted ── wait reconnect_delay ──▶ connect()
//! ```
//!
//! A locally requested [`disconnect`](ConnectionManager::disconnect) suppresses
//! the automatic reconnect for that one disconnect only.
//!
//! The manager is an explicit, cheaply cloneable service; every clone shares
//! the same registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::connection::{Connection, LoopExit};
use crate::error::{MatchdayError, Result};
use crate::store::StateCell;
use crate::transport::Connector;

/// Per-namespace connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Details of one transport drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: Option<String>,
    /// The drop was requested through [`ConnectionManager::disconnect`].
    pub local: bool,
    /// An automatic reconnect has been scheduled.
    pub will_reconnect: bool,
}

/// Told about every connect and disconnect on a namespace.
///
/// Callbacks run synchronously; they must not block.
pub trait ConnectionObserver: Send + Sync + 'static {
    /// A transport is live. `reconnected` is `true` for every connect after
    /// the first one on this namespace.
    fn on_connected(&self, connection: &Arc<Connection>, reconnected: bool);

    fn on_disconnected(&self, disconnect: &Disconnect);
}

/// Check the `/[a-zA-Z0-9-]+` namespace shape.
///
/// # Errors
///
/// Returns [`MatchdayError::InvalidNamespace`] for any other shape.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let valid = namespace.strip_prefix('/').is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if valid {
        Ok(())
    } else {
        Err(MatchdayError::InvalidNamespace(namespace.to_string()))
    }
}

struct Slot {
    state: watch::Sender<ConnectionState>,
    connection: Option<Arc<Connection>>,
    observers: Vec<Arc<dyn ConnectionObserver>>,
    /// Bumped on every successful connect; stale supervisors compare against it.
    generation: u64,
    /// Bumped on every explicit disconnect; cancels in-flight connects and
    /// pending reconnects.
    epoch: u64,
    local_disconnect: bool,
    reconnect_attempts: u32,
    ever_connected: bool,
}

impl Slot {
    fn new() -> Self {
        let (state, _rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            connection: None,
            observers: Vec::new(),
            generation: 0,
            epoch: 0,
            local_disconnect: false,
            reconnect_attempts: 0,
            ever_connected: false,
        }
    }

    fn live_connection(&self) -> Option<&Arc<Connection>> {
        self.connection.as_ref().filter(|c| c.is_connected())
    }
}

struct Inner {
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    auth_token: RwLock<Option<String>>,
    error: StateCell<Option<String>>,
    slots: Mutex<HashMap<String, Slot>>,
}

/// Registry of namespace connections.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(connector: impl Connector) -> Self {
        Self::with_config(connector, ConnectionConfig::default())
    }

    pub fn with_config(connector: impl Connector, config: ConnectionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector: Arc::new(connector),
                config,
                auth_token: RwLock::new(None),
                error: StateCell::new(None),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Credential & error field ────────────────────────────────────

    /// Set the credential sent with every handshake. `None` signs out.
    pub fn set_auth_token(&self, token: Option<String>) {
        *self
            .inner
            .auth_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn auth_token(&self) -> Option<String> {
        self.inner
            .auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_empty())
    }

    /// Last connection error, cleared by the next successful connect.
    pub fn error(&self) -> Option<String> {
        self.inner.error.get()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error.subscribe()
    }

    pub fn clear_error(&self) {
        self.inner.error.set(None);
    }

    fn fail(&self, namespace: &str, error: MatchdayError) -> MatchdayError {
        warn!(namespace = %namespace, "connection error: {error}");
        self.inner.error.set(Some(error.to_string()));
        error
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn state(&self, namespace: &str) -> ConnectionState {
        self.slots()
            .get(namespace)
            .map_or(ConnectionState::Disconnected, |slot| *slot.state.borrow())
    }

    /// Receiver for the namespace state; creates the slot if needed.
    pub fn subscribe_state(&self, namespace: &str) -> watch::Receiver<ConnectionState> {
        self.slots()
            .entry(namespace.to_string())
            .or_insert_with(Slot::new)
            .state
            .subscribe()
    }

    pub fn is_connected(&self, namespace: &str) -> bool {
        self.connection(namespace).is_some()
    }

    /// The live connection for `namespace`, if any.
    pub fn connection(&self, namespace: &str) -> Option<Arc<Connection>> {
        self.slots()
            .get(namespace)
            .and_then(Slot::live_connection)
            .cloned()
    }

    /// Wait until `namespace` is connected. Returns `false` on timeout.
    pub async fn wait_connected(&self, namespace: &str, timeout: Duration) -> bool {
        let mut rx = self.subscribe_state(namespace);
        let connected = tokio::time::timeout(
            timeout,
            rx.wait_for(|state| *state == ConnectionState::Connected),
        )
        .await;
        matches!(connected, Ok(Ok(_)))
    }

    /// Namespaces that currently have a live connection.
    pub fn connected_namespaces(&self) -> Vec<String> {
        self.slots()
            .iter()
            .filter(|(_, slot)| slot.live_connection().is_some())
            .map(|(ns, _)| ns.clone())
            .collect()
    }

    // ── Observers ───────────────────────────────────────────────────

    /// Register an observer. If the namespace is already connected it is
    /// told so immediately.
    pub fn attach(&self, namespace: &str, observer: Arc<dyn ConnectionObserver>) {
        let live = {
            let mut slots = self.slots();
            let slot = slots
                .entry(namespace.to_string())
                .or_insert_with(Slot::new);
            if !slot.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
                slot.observers.push(Arc::clone(&observer));
            }
            slot.live_connection().cloned()
        };
        if let Some(connection) = live {
            observer.on_connected(&connection, false);
        }
    }

    pub fn detach(&self, namespace: &str, observer: &Arc<dyn ConnectionObserver>) {
        if let Some(slot) = self.slots().get_mut(namespace) {
            slot.observers.retain(|o| !Arc::ptr_eq(o, observer));
        }
    }

    // ── Connect / disconnect ────────────────────────────────────────

    /// Open the transport for `namespace`, or reuse the live one.
    ///
    /// A connect already in flight makes this a no-op.
    ///
    /// # Errors
    ///
    /// - [`MatchdayError::InvalidNamespace`] for a malformed namespace
    /// - [`MatchdayError::MissingCredential`] when no auth token is set
    /// - [`MatchdayError::NotConnected`] if [`disconnect`](Self::disconnect)
    ///   ran while connecting
    /// - any error from the [`Connector`]
    ///
    /// Each of these is also written to the [`error`](Self::error) field.
    pub async fn connect(&self, namespace: &str) -> Result<()> {
        if let Err(e) = validate_namespace(namespace) {
            return Err(self.fail(namespace, e));
        }

        let (token, epoch) = {
            let mut slots = self.slots();
            let slot = slots
                .entry(namespace.to_string())
                .or_insert_with(Slot::new);
            if slot.live_connection().is_some() {
                debug!(namespace = %namespace, "reusing live connection");
                return Ok(());
            }
            if *slot.state.borrow() == ConnectionState::Connecting {
                debug!(namespace = %namespace, "connect already in flight");
                return Ok(());
            }
            let Some(token) = self.auth_token() else {
                drop(slots);
                return Err(self.fail(namespace, MatchdayError::MissingCredential));
            };
            slot.state.send_replace(ConnectionState::Connecting);
            (token, slot.epoch)
        };

        info!(namespace = %namespace, "connecting");
        let pending = PendingConnect {
            manager: self,
            namespace,
            epoch,
            armed: true,
        };
        let transport = match self.inner.connector.connect(namespace, &token).await {
            Ok(transport) => transport,
            Err(e) => {
                drop(pending);
                return Err(self.fail(namespace, e));
            }
        };

        let (connection, task) = Connection::spawn(namespace, transport);
        let registered = {
            let mut slots = self.slots();
            let slot = slots
                .entry(namespace.to_string())
                .or_insert_with(Slot::new);
            if slot.epoch == epoch {
                slot.connection = Some(Arc::clone(&connection));
                slot.generation += 1;
                slot.local_disconnect = false;
                slot.reconnect_attempts = 0;
                let reconnected = slot.ever_connected;
                slot.ever_connected = true;
                slot.state.send_replace(ConnectionState::Connected);
                Some((slot.generation, reconnected, slot.observers.clone()))
            } else {
                None
            }
        };

        pending.disarm();

        let Some((generation, reconnected, observers)) = registered else {
            debug!(namespace = %namespace, "disconnect requested while connecting");
            connection.close(self.inner.config.shutdown_timeout).await;
            return Err(MatchdayError::NotConnected);
        };

        info!(namespace = %namespace, reconnected, "connected");
        self.inner.error.set(None);
        tokio::spawn(
            self.clone()
                .supervise(namespace.to_string(), generation, task),
        );
        for observer in observers {
            observer.on_connected(&connection, reconnected);
        }
        Ok(())
    }

    /// Close the transport for `namespace`, suppressing auto-reconnect for
    /// this one disconnect.
    pub async fn disconnect(&self, namespace: &str) {
        let connection = {
            let mut slots = self.slots();
            let Some(slot) = slots.get_mut(namespace) else {
                return;
            };
            slot.epoch += 1;
            let connection = slot.connection.take();
            if connection.is_some() {
                slot.local_disconnect = true;
            }
            slot.state.send_replace(ConnectionState::Disconnected);
            connection
        };
        if let Some(connection) = connection {
            info!(namespace = %namespace, "disconnecting");
            connection.close(self.inner.config.shutdown_timeout).await;
        }
    }

    /// Disconnect every namespace.
    pub async fn shutdown(&self) {
        let namespaces: Vec<String> = self.slots().keys().cloned().collect();
        for namespace in namespaces {
            self.disconnect(&namespace).await;
        }
    }

    // ── Supervision ─────────────────────────────────────────────────

    async fn supervise(self, namespace: String, generation: u64, task: JoinHandle<LoopExit>) {
        let exit = match task.await {
            Ok(exit) => exit,
            Err(e) if e.is_cancelled() => LoopExit::Closed,
            Err(e) => LoopExit::Dropped {
                reason: Some(format!("transport task failed: {e}")),
            },
        };
        self.handle_exit(&namespace, generation, exit);
    }

    fn handle_exit(&self, namespace: &str, generation: u64, exit: LoopExit) {
        let max_attempts = self.inner.config.max_reconnect_attempts;
        let (disconnect, observers, epoch) = {
            let mut slots = self.slots();
            let Some(slot) = slots.get_mut(namespace) else {
                return;
            };
            if slot.generation != generation {
                return;
            }
            slot.connection = None;
            slot.state.send_replace(ConnectionState::Disconnected);
            let local = std::mem::take(&mut slot.local_disconnect) || exit == LoopExit::Closed;
            let reason = match exit {
                LoopExit::Closed => Some("client disconnect".to_string()),
                LoopExit::Dropped { reason } => reason,
            };
            let disconnect = Disconnect {
                reason,
                local,
                will_reconnect: !local && slot.reconnect_attempts < max_attempts,
            };
            (disconnect, slot.observers.clone(), slot.epoch)
        };

        if disconnect.local {
            info!(namespace = %namespace, "disconnected");
        } else {
            warn!(
                namespace = %namespace,
                reason = ?disconnect.reason,
                will_reconnect = disconnect.will_reconnect,
                "connection lost"
            );
        }
        for observer in &observers {
            observer.on_disconnected(&disconnect);
        }
        if disconnect.will_reconnect {
            tokio::spawn(self.clone().reconnect(namespace.to_string(), epoch));
        }
    }

    /// Retry `connect` after a fixed delay until it succeeds, the attempt
    /// budget runs out, or an explicit disconnect bumps the epoch.
    async fn reconnect(self, namespace: String, epoch: u64) {
        let max_attempts = self.inner.config.max_reconnect_attempts;
        loop {
            tokio::time::sleep(self.inner.config.reconnect_delay).await;

            let attempt = {
                let mut slots = self.slots();
                let Some(slot) = slots.get_mut(&namespace) else {
                    return;
                };
                if slot.epoch != epoch || slot.live_connection().is_some() {
                    return;
                }
                if slot.reconnect_attempts >= max_attempts {
                    warn!(namespace = %namespace, "giving up after {max_attempts} reconnect attempts");
                    return;
                }
                slot.reconnect_attempts += 1;
                slot.reconnect_attempts
            };

            info!(namespace = %namespace, attempt, "reconnecting");
            match self.connect(&namespace).await {
                Ok(()) => return,
                Err(e) => debug!(namespace = %namespace, attempt, "reconnect attempt failed: {e}"),
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: HashMap<String, ConnectionState> = self
            .slots()
            .iter()
            .map(|(ns, slot)| (ns.clone(), *slot.state.borrow()))
            .collect();
        f.debug_struct("ConnectionManager")
            .field("config", &self.inner.config)
            .field("namespaces", &states)
            .field("error", &self.error())
            .finish()
    }
}

/// An in-flight connect. Dropped before completion, it puts the slot back to
/// `Disconnected` unless a disconnect has moved the epoch on.
struct PendingConnect<'a> {
    manager: &'a ConnectionManager,
    namespace: &'a str,
    epoch: u64,
    armed: bool,
}

impl PendingConnect<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slots = self.manager.slots();
        let Some(slot) = slots.get_mut(self.namespace) else {
            return;
        };
        if slot.epoch == self.epoch && *slot.state.borrow() == ConnectionState::Connecting {
            debug!(namespace = %self.namespace, "connect abandoned");
            slot.state.send_replace(ConnectionState::Disconnected);
        }
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
    use crate::protocol::ClientMessage;
    use crate::transport::Transport;
    use crate::transports::loopback::{LoopbackAcceptor, LoopbackConnector};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Semaphore;

    /// Holds every handshake until [`open`](Self::open) is called.
    struct GatedConnector {
        inner: LoopbackConnector,
        gate: Arc<Semaphore>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Connector for GatedConnector {
        async fn connect(
            &self,
            namespace: &str,
            auth_token: &str,
        ) -> Result<Box<dyn Transport>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| MatchdayError::TransportClosed)?;
            self.inner.connect(namespace, auth_token).await
        }
    }

    struct Gate {
        gate: Arc<Semaphore>,
        calls: Arc<AtomicU32>,
    }

    impl Gate {
        fn open(&self) {
            self.gate.add_permits(1);
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn gated_manager() -> (ConnectionManager, Gate, LoopbackAcceptor) {
        let (inner, acceptor) = LoopbackConnector::new();
        let gate = Gate {
            gate: Arc::new(Semaphore::new(0)),
            calls: Arc::new(AtomicU32::new(0)),
        };
        let manager = ConnectionManager::new(GatedConnector {
            inner,
            gate: Arc::clone(&gate.gate),
            calls: Arc::clone(&gate.calls),
        });
        manager.set_auth_token(Some("token-1".into()));
        (manager, gate, acceptor)
    }

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl ConnectionObserver for Recorder {
        fn on_connected(&self, _connection: &Arc<Connection>, reconnected: bool) {
            self.log
                .lock()
                .unwrap()
                .push(format!("connected reconnected={reconnected}"));
        }

        fn on_disconnected(&self, d: &Disconnect) {
            self.log.lock().unwrap().push(format!(
                "disconnected local={} will_reconnect={}",
                d.local, d.will_reconnect
            ));
        }
    }

    fn manager(config: ConnectionConfig) -> (ConnectionManager, LoopbackConnector, LoopbackAcceptor) {
        let (connector, acceptor) = LoopbackConnector::new();
        let manager = ConnectionManager::with_config(connector.clone(), config);
        manager.set_auth_token(Some("token-1".into()));
        (manager, connector, acceptor)
    }

    #[test]
    fn namespace_shape() {
        assert!(validate_namespace("/quiz").is_ok());
        assert!(validate_namespace("/team-guess").is_ok());
        assert!(validate_namespace("/Bingo2").is_ok());
        for bad in ["", "/", "quiz", "/quiz/room", "/tic tac", "/quiz_1", "//quiz"] {
            assert!(validate_namespace(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn connect_sends_credential_and_reuses_transport() {
        let (manager, _connector, mut acceptor) = manager(ConnectionConfig::default());
        manager.connect("/quiz").await.unwrap();
        let accepted = acceptor.accept().await.unwrap();
        assert_eq!(accepted.namespace, "/quiz");
        assert_eq!(accepted.auth_token, "token-1");

        let first = manager.connection("/quiz").unwrap();
        manager.connect("/quiz").await.unwrap();
        let second = manager.connection("/quiz").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(acceptor.try_accept().is_none());
        assert_eq!(manager.state("/quiz"), ConnectionState::Connected);
        assert_eq!(manager.connected_namespaces(), vec!["/quiz".to_string()]);
    }

    #[tokio::test]
    async fn connect_in_flight_makes_second_connect_a_no_op() {
        let (manager, gate, mut acceptor) = gated_manager();
        let mut state = manager.subscribe_state("/quiz");

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.connect("/quiz").await }
        });
        state
            .wait_for(|s| *s == ConnectionState::Connecting)
            .await
            .unwrap();

        manager.connect("/quiz").await.unwrap();
        assert_eq!(gate.calls(), 1);

        gate.open();
        first.await.unwrap().unwrap();
        assert!(acceptor.accept().await.is_some());
        assert!(acceptor.try_accept().is_none());
        assert_eq!(gate.calls(), 1);
        assert_eq!(manager.state("/quiz"), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_connect_does_not_block_later_connects() {
        let (manager, gate, mut acceptor) = gated_manager();
        let attempt =
            tokio::time::timeout(Duration::from_millis(50), manager.connect("/quiz")).await;
        assert!(attempt.is_err());
        assert_eq!(manager.state("/quiz"), ConnectionState::Disconnected);

        gate.open();
        manager.connect("/quiz").await.unwrap();
        assert_eq!(gate.calls(), 2);
        assert!(manager.is_connected("/quiz"));
        assert!(acceptor.accept().await.is_some());
    }

    #[tokio::test]
    async fn invalid_namespace_sets_error() {
        let (manager, _connector, mut acceptor) = manager(ConnectionConfig::default());
        let err = manager.connect("quiz").await.unwrap_err();
        assert!(matches!(err, MatchdayError::InvalidNamespace(_)));
        assert!(manager.error().unwrap().contains("invalid namespace"));
        assert!(acceptor.try_accept().is_none());
    }

    #[tokio::test]
    async fn missing_credential_aborts_without_connecting() {
        let (manager, _connector, mut acceptor) = manager(ConnectionConfig::default());
        manager.set_auth_token(None);
        let err = manager.connect("/bingo").await.unwrap_err();
        assert!(matches!(err, MatchdayError::MissingCredential));
        assert!(manager.error().is_some());
        assert!(acceptor.try_accept().is_none());
        assert_eq!(manager.state("/bingo"), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn successful_connect_clears_error() {
        let (manager, connector, _acceptor) = manager(ConnectionConfig::default());
        connector.refuse_next(1);
        assert!(manager.connect("/quiz").await.is_err());
        assert!(manager.error().is_some());
        manager.connect("/quiz").await.unwrap();
        assert_eq!(manager.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_drop_reconnects_after_delay() {
        let config = ConnectionConfig::new().with_reconnect_delay(Duration::from_secs(2));
        let (manager, _connector, mut acceptor) = manager(config);
        let recorder = Arc::new(Recorder::default());
        manager.attach("/quiz", recorder.clone());

        manager.connect("/quiz").await.unwrap();
        let first = acceptor.accept().await.unwrap();
        first.server.disconnect();

        let second = acceptor.accept().await.unwrap();
        assert_eq!(second.namespace, "/quiz");
        assert!(manager.wait_connected("/quiz", Duration::from_secs(1)).await);
        assert_eq!(
            recorder.entries(),
            vec![
                "connected reconnected=false",
                "disconnected local=false will_reconnect=true",
                "connected reconnected=true",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn local_disconnect_suppresses_one_reconnect() {
        let (manager, _connector, mut acceptor) = manager(ConnectionConfig::default());
        let recorder = Arc::new(Recorder::default());
        manager.attach("/quiz", recorder.clone());

        manager.connect("/quiz").await.unwrap();
        let first = acceptor.accept().await.unwrap();
        manager.disconnect("/quiz").await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(acceptor.try_accept().is_none());
        assert!(first.server.client_closed());
        assert_eq!(
            recorder.entries().last().unwrap(),
            "disconnected local=true will_reconnect=false"
        );

        // The suppression does not carry over to the next connection.
        manager.connect("/quiz").await.unwrap();
        let second = acceptor.accept().await.unwrap();
        second.server.disconnect();
        assert!(acceptor.accept().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let config = ConnectionConfig::new()
            .with_reconnect_delay(Duration::from_millis(100))
            .with_max_reconnect_attempts(2);
        let (manager, connector, mut acceptor) = manager(config);
        manager.connect("/quiz").await.unwrap();
        let first = acceptor.accept().await.unwrap();

        connector.refuse_next(u32::MAX);
        first.server.disconnect();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(connector.refused(), 2);
        assert_eq!(manager.state("/quiz"), ConnectionState::Disconnected);
        assert!(manager.error().is_some());
    }

    #[tokio::test]
    async fn attach_to_live_connection_notifies_immediately() {
        let (manager, _connector, _acceptor) = manager(ConnectionConfig::default());
        manager.connect("/tictactoe").await.unwrap();
        let recorder = Arc::new(Recorder::default());
        manager.attach("/tictactoe", recorder.clone());
        manager.attach("/tictactoe", recorder.clone());
        assert_eq!(recorder.entries(), vec!["connected reconnected=false"; 2]);

        let observer: Arc<dyn ConnectionObserver> = recorder.clone();
        manager.detach("/tictactoe", &observer);
        manager.disconnect("/tictactoe").await;
        assert_eq!(recorder.entries().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_closes_every_namespace() {
        let (manager, _connector, mut acceptor) = manager(ConnectionConfig::default());
        manager.connect("/quiz").await.unwrap();
        manager.connect("/bingo").await.unwrap();
        let a = acceptor.accept().await.unwrap();
        let b = acceptor.accept().await.unwrap();

        manager.shutdown().await;
        assert!(!manager.is_connected("/quiz"));
        assert!(!manager.is_connected("/bingo"));
        assert!(a.server.client_closed());
        assert!(b.server.client_closed());
    }

    #[tokio::test]
    async fn emit_reaches_server() {
        let (manager, _connector, mut acceptor) = manager(ConnectionConfig::default());
        manager.connect("/quiz").await.unwrap();
        let mut accepted = acceptor.accept().await.unwrap();
        manager
            .connection("/quiz")
            .unwrap()
            .emit(ClientMessage::GetGameState {
                user_id: "u1".into(),
            })
            .unwrap();
        assert_eq!(
            accepted.server.next_sent().await.unwrap(),
            ClientMessage::GetGameState {
                user_id: "u1".into()
            }
        );
    }
}
