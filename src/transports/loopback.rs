//! In-process transport for tests, demos and offline play.
//!
//! [`loopback_pair`] returns a [`LoopbackTransport`] for the client and a
//! [`LoopbackServer`] handle for whoever plays the server: it pushes
//! [`ServerMessage`]s in and reads the client's [`ClientMessage`]s out.
//!
//! [`LoopbackConnector`] plugs the same pair into a
//! [`ConnectionManager`](crate::manager::ConnectionManager): every connect
//! creates a fresh pair and hands the server side to a [`LoopbackAcceptor`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::MatchdayError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{Connector, Transport};

/// Create a connected client/server pair.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        LoopbackTransport {
            inbound,
            outbound,
            closed: Arc::clone(&closed),
        },
        LoopbackServer {
            to_client: Mutex::new(Some(to_client)),
            from_client,
            closed,
        },
    )
}

/// Client side of a loopback pair.
///
/// `recv` is cancel-safe: it only awaits an MPSC receiver.
#[derive(Debug)]
pub struct LoopbackTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), MatchdayError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MatchdayError::TransportClosed);
        }
        self.outbound
            .send(message)
            .map_err(|_| MatchdayError::TransportSend("loopback server dropped".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, MatchdayError>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), MatchdayError> {
        self.closed.store(true, Ordering::Release);
        self.inbound.close();
        Ok(())
    }
}

/// Server side of a loopback pair.
#[derive(Debug)]
pub struct LoopbackServer {
    to_client: Mutex<Option<mpsc::UnboundedSender<String>>>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl LoopbackServer {
    /// Push an event to the client. Returns `false` once the pair is torn down.
    pub fn push(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(json) => self.push_raw(json),
            Err(e) => {
                tracing::error!("failed to serialize ServerMessage: {e}");
                false
            }
        }
    }

    /// Push a raw text frame to the client.
    pub fn push_raw(&self, frame: impl Into<String>) -> bool {
        self.to_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    /// Simulate the server closing the connection. Frames already pushed are
    /// still delivered first.
    pub fn disconnect(&self) {
        self.to_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Next frame the client sent, decoded. Undecodable frames are skipped.
    pub async fn next_sent(&mut self) -> Option<ClientMessage> {
        while let Some(raw) = self.from_client.recv().await {
            match serde_json::from_str(&raw) {
                Ok(message) => return Some(message),
                Err(e) => tracing::warn!("loopback server skipped frame: {e}"),
            }
        }
        None
    }

    /// Next raw frame the client sent.
    pub async fn next_raw(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Every frame already sent by the client, decoded, without waiting.
    pub fn drain_sent(&mut self) -> Vec<ClientMessage> {
        let mut sent = Vec::new();
        while let Ok(raw) = self.from_client.try_recv() {
            if let Ok(message) = serde_json::from_str(&raw) {
                sent.push(message);
            }
        }
        sent
    }

    /// Whether the client closed its side.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// One accepted loopback connection.
#[derive(Debug)]
pub struct Accepted {
    pub namespace: String,
    pub auth_token: String,
    pub server: LoopbackServer,
}

/// Receives the server side of every connection a [`LoopbackConnector`] opens.
#[derive(Debug)]
pub struct LoopbackAcceptor {
    rx: mpsc::UnboundedReceiver<Accepted>,
}

impl LoopbackAcceptor {
    pub async fn accept(&mut self) -> Option<Accepted> {
        self.rx.recv().await
    }

    pub fn try_accept(&mut self) -> Option<Accepted> {
        self.rx.try_recv().ok()
    }
}

/// [`Connector`] that opens loopback pairs.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    tx: mpsc::UnboundedSender<Accepted>,
    refuse: Arc<AtomicU32>,
    refused: Arc<AtomicU32>,
}

impl LoopbackConnector {
    pub fn new() -> (Self, LoopbackAcceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                refuse: Arc::new(AtomicU32::new(0)),
                refused: Arc::new(AtomicU32::new(0)),
            },
            LoopbackAcceptor { rx },
        )
    }

    /// Refuse the next `count` connects with a connection-refused error.
    pub fn refuse_next(&self, count: u32) {
        self.refuse.store(count, Ordering::Release);
    }

    /// How many connects have been refused so far.
    pub fn refused(&self) -> u32 {
        self.refused.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(
        &self,
        namespace: &str,
        auth_token: &str,
    ) -> Result<Box<dyn Transport>, MatchdayError> {
        let refuse = self
            .refuse
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if refuse {
            self.refused.fetch_add(1, Ordering::AcqRel);
            return Err(MatchdayError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "loopback connection refused",
            )));
        }

        let (transport, server) = loopback_pair();
        self.tx
            .send(Accepted {
                namespace: namespace.to_string(),
                auth_token: auth_token.to_string(),
                server,
            })
            .map_err(|_| {
                MatchdayError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "loopback acceptor dropped",
                ))
            })?;
        Ok(Box::new(transport))
    }
}
