//! One live transport to a game-server namespace.
//!
//! [`Connection`] is a thin handle over a background transport loop task. The
//! loop multiplexes outgoing [`ClientMessage`]s (queued on an unbounded MPSC
//! channel) with incoming frames, decodes each frame into a
//! [`ServerMessage`] and hands it to the listeners registered for that
//! event name, strictly in arrival order.
//!
//! Listeners are keyed by [`ServerEventKind`]. [`Connection::off`] removes
//! every listener for a name, which is what makes re-attachment idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{MatchdayError, Result};
use crate::protocol::{ClientMessage, ServerEventKind, ServerMessage};
use crate::transport::Transport;

/// Receives decoded server events.
///
/// Called from the transport loop; implementations must not block.
pub trait EventListener: Send + Sync + 'static {
    fn on_event(&self, message: &ServerMessage);
}

impl<F> EventListener for F
where
    F: Fn(&ServerMessage) + Send + Sync + 'static,
{
    fn on_event(&self, message: &ServerMessage) {
        self(message);
    }
}

/// Handle for removing a single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

struct ListenerEntry {
    id: ListenerId,
    kind: ServerEventKind,
    listener: Arc<dyn EventListener>,
}

#[derive(Default)]
struct ListenerTable {
    entries: Vec<ListenerEntry>,
}

impl ListenerTable {
    fn matching(&self, kind: ServerEventKind) -> Vec<Arc<dyn EventListener>> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }
}

/// Why the transport loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// [`Connection::close`] was called.
    Closed,
    /// The server closed the connection or the transport failed.
    Dropped { reason: Option<String> },
}

enum Command {
    Emit(ClientMessage),
    Close(oneshot::Sender<()>),
}

/// Handle to one live transport.
pub struct Connection {
    namespace: String,
    cmd_tx: mpsc::UnboundedSender<Command>,
    listeners: Arc<RwLock<ListenerTable>>,
    connected: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl Connection {
    /// Spawn the transport loop for an already-open transport.
    ///
    /// The returned [`JoinHandle`] resolves when the loop exits; the
    /// connection manager supervises it to drive auto-reconnect.
    pub fn spawn(
        namespace: impl Into<String>,
        transport: impl Transport,
    ) -> (Arc<Self>, JoinHandle<LoopExit>) {
        let namespace = namespace.into();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let listeners = Arc::new(RwLock::new(ListenerTable::default()));
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            namespace.clone(),
            transport,
            cmd_rx,
            Arc::clone(&listeners),
            Arc::clone(&connected),
        ));

        let connection = Arc::new(Self {
            namespace,
            cmd_tx,
            listeners,
            connected,
            abort: task.abort_handle(),
        });
        (connection, task)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns `true` until the transport loop exits.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue a client event. Returns once queued; delivery is not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`MatchdayError::NotConnected`] if the transport loop has exited.
    pub fn emit(&self, message: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(MatchdayError::NotConnected);
        }
        self.cmd_tx
            .send(Command::Emit(message))
            .map_err(|_| MatchdayError::NotConnected)
    }

    /// Register a listener for one event name.
    pub fn on(&self, kind: ServerEventKind, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .push(ListenerEntry { id, kind, listener });
        id
    }

    /// Remove every listener for `kind`. Returns how many were removed.
    pub fn off(&self, kind: ServerEventKind) -> usize {
        let mut table = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = table.entries.len();
        table.entries.retain(|entry| entry.kind != kind);
        before - table.entries.len()
    }

    /// Remove one listener. Returns `false` if it was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut table = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = table.entries.len();
        table.entries.retain(|entry| entry.id != id);
        before != table.entries.len()
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: ServerEventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Close the transport and stop the loop.
    ///
    /// Waits up to `timeout` for a graceful close, then aborts the loop task.
    pub async fn close(&self, timeout: Duration) {
        debug!(namespace = %self.namespace, "closing connection");
        self.connected.store(false, Ordering::Release);

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Close(ack_tx)).is_err() {
            // Loop already gone.
            return;
        }
        if tokio::time::timeout(timeout, ack_rx).await.is_err() {
            warn!(namespace = %self.namespace, "transport did not close within timeout; aborting task");
            self.abort.abort();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("namespace", &self.namespace)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // No executor context here for a graceful close.
        self.abort.abort();
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background loop that multiplexes send/receive via `tokio::select!`.
///
/// Exits when:
/// - [`Connection::close`] is called, or every handle is dropped
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
async fn transport_loop(
    namespace: String,
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    listeners: Arc<RwLock<ListenerTable>>,
    connected: Arc<AtomicBool>,
) -> LoopExit {
    debug!(namespace = %namespace, "transport loop started");

    let exit = loop {
        tokio::select! {
            // Branch 1: outgoing command from the handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Emit(msg)) => {
                        debug!(namespace = %namespace, event = msg.name(), "emitting client event");
                        match serde_json::to_string(&msg) {
                            Ok(json) => {
                                if let Err(e) = transport.send(json).await {
                                    error!(namespace = %namespace, "transport send error: {e}");
                                    break LoopExit::Dropped {
                                        reason: Some(format!("transport send error: {e}")),
                                    };
                                }
                            }
                            Err(e) => {
                                error!("failed to serialize ClientMessage: {e}");
                            }
                        }
                    }
                    Some(Command::Close(ack)) => {
                        let _ = transport.close().await;
                        let _ = ack.send(());
                        break LoopExit::Closed;
                    }
                    // Every handle dropped.
                    None => {
                        let _ = transport.close().await;
                        break LoopExit::Closed;
                    }
                }
            }

            // Branch 2: incoming frame from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(server_msg) => dispatch(&listeners, &server_msg),
                        Err(e) => {
                            warn!(namespace = %namespace, "failed to decode server event: {e}; raw: {text}");
                        }
                    },
                    Some(Err(e)) => {
                        error!(namespace = %namespace, "transport receive error: {e}");
                        break LoopExit::Dropped {
                            reason: Some(format!("transport receive error: {e}")),
                        };
                    }
                    None => {
                        debug!(namespace = %namespace, "transport closed by server");
                        break LoopExit::Dropped { reason: None };
                    }
                }
            }
        }
    };

    connected.store(false, Ordering::Release);
    debug!(namespace = %namespace, ?exit, "transport loop exited");
    exit
}

/// Deliver one event to its listeners. The table lock is released before
/// any listener runs so listeners may register or remove listeners.
fn dispatch(listeners: &RwLock<ListenerTable>, message: &ServerMessage) {
    let kind = message.kind();
    let targets = listeners
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .matching(kind);
    if targets.is_empty() {
        debug!(event = %kind, "no listener for server event");
        return;
    }
    for listener in targets {
        listener.on_event(message);
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
    use crate::protocol::{RoomNotice, TimerUpdatePayload};
    use crate::transports::loopback::loopback_pair;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn EventListener>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let listener: Arc<dyn EventListener> = Arc::new(move |_: &ServerMessage| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    fn timer_json(seconds: u32) -> String {
        serde_json::to_string(&ServerMessage::TimerUpdate(TimerUpdatePayload {
            time_remaining: seconds,
            room: None,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn emit_serializes_client_event() {
        let (transport, mut server) = loopback_pair();
        let (conn, _task) = Connection::spawn("/quiz", transport);

        conn.emit(ClientMessage::StartGame {
            user_id: "u1".into(),
        })
        .unwrap();

        let sent = server.next_sent().await.unwrap();
        assert_eq!(
            sent,
            ClientMessage::StartGame {
                user_id: "u1".into()
            }
        );
        conn.close(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn listeners_run_in_arrival_order() {
        let (transport, server) = loopback_pair();
        let (conn, task) = Connection::spawn("/quiz", transport);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        conn.on(
            ServerEventKind::TimerUpdate,
            Arc::new(move |msg: &ServerMessage| {
                if let ServerMessage::TimerUpdate(p) = msg {
                    sink.lock().unwrap().push(p.time_remaining);
                }
            }),
        );

        for s in [3, 2, 1] {
            server.push_raw(timer_json(s));
        }
        server.disconnect();
        let _ = task.await;
        assert_eq!(*seen.lock().unwrap(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn off_removes_every_listener_for_the_name() {
        let (transport, _server) = loopback_pair();
        let (conn, _task) = Connection::spawn("/quiz", transport);
        let (_c1, l1) = counter();
        let (_c2, l2) = counter();
        conn.on(ServerEventKind::GameReset, l1);
        conn.on(ServerEventKind::GameReset, l2);
        conn.on(ServerEventKind::Error, counter().1);

        assert_eq!(conn.off(ServerEventKind::GameReset), 2);
        assert_eq!(conn.listener_count(ServerEventKind::GameReset), 0);
        assert_eq!(conn.listener_count(ServerEventKind::Error), 1);
    }

    #[tokio::test]
    async fn remove_single_listener() {
        let (transport, server) = loopback_pair();
        let (conn, task) = Connection::spawn("/quiz", transport);
        let (kept, l1) = counter();
        let (removed, l2) = counter();
        conn.on(ServerEventKind::GameReset, l1);
        let id = conn.on(ServerEventKind::GameReset, l2);
        assert!(conn.remove(id));
        assert!(!conn.remove(id));

        server.push(&ServerMessage::GameReset(RoomNotice::default()));
        server.disconnect();
        let _ = task.await;
        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_frames_are_skipped() {
        let (transport, server) = loopback_pair();
        let (conn, task) = Connection::spawn("/quiz", transport);
        let (count, listener) = counter();
        conn.on(ServerEventKind::TimerUpdate, listener);

        server.push_raw("{not json".to_string());
        server.push_raw(r#"{"event":"mystery","data":{}}"#.to_string());
        server.push_raw(timer_json(5));
        server.disconnect();

        let exit = task.await.unwrap();
        assert_eq!(exit, LoopExit::Dropped { reason: None });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn close_reports_closed_and_rejects_emit() {
        let (transport, _server) = loopback_pair();
        let (conn, task) = Connection::spawn("/quiz", transport);
        conn.close(Duration::from_millis(100)).await;

        assert_eq!(task.await.unwrap(), LoopExit::Closed);
        let err = conn
            .emit(ClientMessage::SkipTurn {
                user_id: "u1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, MatchdayError::NotConnected));
    }
}
