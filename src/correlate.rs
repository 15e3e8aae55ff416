//! Request/response correlation for the two awaitable actions.
//!
//! `joinLobby` and `resetGame` are fire-and-forget on the wire; the reply
//! arrives later as an ordinary server event. [`Correlator`] keeps at most one
//! pending slot per [`RequestKind`]. Registering a new request of the same
//! kind supersedes the old one, an `error` event rejects every pending
//! request, and a late reply after a timeout finds no slot and is ignored.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{MatchdayError, Result};
use crate::protocol::{Room, ServerEventKind, ServerMessage};

/// The awaitable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Join,
    Reset,
}

impl RequestKind {
    /// Client event name, used in timeout and supersede errors.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Join => "joinLobby",
            Self::Reset => "resetGame",
        }
    }

    fn settled_by(self) -> ServerEventKind {
        match self {
            Self::Join => ServerEventKind::RoomJoined,
            Self::Reset => ServerEventKind::GameReset,
        }
    }
}

/// What a settled request yields.
pub type Reply = Option<Room>;

struct Pending {
    id: u64,
    tx: oneshot::Sender<Result<Reply>>,
}

/// A registered request waiting for its reply.
#[derive(Debug)]
pub struct Ticket {
    kind: RequestKind,
    id: u64,
    rx: oneshot::Receiver<Result<Reply>>,
}

impl Ticket {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

#[derive(Default)]
struct Slots {
    next_id: u64,
    pending: HashMap<RequestKind, Pending>,
}

/// One pending slot per [`RequestKind`].
#[derive(Default)]
pub struct Correlator {
    slots: Mutex<Slots>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot for `kind`, superseding any request already waiting.
    pub fn register(&self, kind: RequestKind) -> Ticket {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.next_id += 1;
        let id = slots.next_id;
        if let Some(old) = slots.pending.insert(kind, Pending { id, tx }) {
            debug!(operation = kind.operation(), "superseding pending request");
            let _ = old.tx.send(Err(MatchdayError::Superseded {
                operation: kind.operation(),
            }));
        }
        Ticket { kind, id, rx }
    }

    /// Wait for the reply, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// - [`MatchdayError::Timeout`] if nothing settled the slot in time
    /// - [`MatchdayError::Superseded`] if a newer request took the slot
    /// - [`MatchdayError::Server`] if an `error` event arrived first
    pub async fn wait(&self, ticket: Ticket, timeout: Duration) -> Result<Reply> {
        let Ticket { kind, id, rx } = ticket;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without settling: the correlator was torn down.
            Ok(Err(_)) => Err(MatchdayError::NotConnected),
            Err(_) => {
                self.cancel(kind, id);
                debug!(operation = kind.operation(), "request timed out");
                Err(MatchdayError::Timeout {
                    operation: kind.operation(),
                })
            }
        }
    }

    /// Give up on a request that never made it onto the wire.
    pub fn abandon(&self, ticket: Ticket) {
        self.cancel(ticket.kind, ticket.id);
    }

    /// Drop the slot for `kind` if it still belongs to request `id`.
    fn cancel(&self, kind: RequestKind, id: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.pending.get(&kind).is_some_and(|p| p.id == id) {
            slots.pending.remove(&kind);
        }
    }

    /// Settle whichever slot `message` answers. Returns `true` if one was settled.
    pub fn settle(&self, message: &ServerMessage) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let ServerMessage::Error(payload) = message {
            let drained: Vec<_> = slots.pending.drain().collect();
            let settled = !drained.is_empty();
            for (_, pending) in drained {
                let _ = pending
                    .tx
                    .send(Err(MatchdayError::server(&payload.message, payload.code)));
            }
            return settled;
        }

        let kind = message.kind();
        let Some(request) = [RequestKind::Join, RequestKind::Reset]
            .into_iter()
            .find(|r| r.settled_by() == kind)
        else {
            return false;
        };
        match slots.pending.remove(&request) {
            Some(pending) => {
                let _ = pending.tx.send(Ok(message.room().cloned()));
                true
            }
            None => false,
        }
    }

    /// Whether a request of `kind` is waiting.
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .contains_key(&kind)
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Correlator")
            .field("pending", &slots.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::protocol::{RoomNotice, RoomSnapshot, ServerErrorPayload};

    fn joined(room_id: &str) -> ServerMessage {
        ServerMessage::RoomJoined(RoomSnapshot {
            room: Room::new(room_id, 2),
        })
    }

    #[tokio::test]
    async fn reply_settles_matching_slot() {
        let correlator = Correlator::new();
        let ticket = correlator.register(RequestKind::Join);
        assert!(correlator.settle(&joined("R1")));

        let room = correlator
            .wait(ticket, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(room.room_id, "R1");
        assert!(!correlator.is_pending(RequestKind::Join));
    }

    #[tokio::test]
    async fn unrelated_events_do_not_settle() {
        let correlator = Correlator::new();
        let _ticket = correlator.register(RequestKind::Reset);
        assert!(!correlator.settle(&joined("R1")));
        assert!(correlator.is_pending(RequestKind::Reset));
        assert!(correlator.settle(&ServerMessage::GameReset(RoomNotice::default())));
    }

    #[tokio::test]
    async fn newer_request_supersedes_older() {
        let correlator = Correlator::new();
        let first = correlator.register(RequestKind::Join);
        let second = correlator.register(RequestKind::Join);
        correlator.settle(&joined("R2"));

        let err = correlator
            .wait(first, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchdayError::Superseded { operation: "joinLobby" }));
        let room = correlator
            .wait(second, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(room.unwrap().room_id, "R2");
    }

    #[tokio::test]
    async fn error_rejects_every_pending_request() {
        let correlator = Correlator::new();
        let join = correlator.register(RequestKind::Join);
        let reset = correlator.register(RequestKind::Reset);
        correlator.settle(&ServerMessage::Error(ServerErrorPayload {
            message: "Room is full".into(),
            code: None,
        }));

        let err = correlator
            .wait(join, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_room_full());
        assert!(correlator
            .wait(reset, Duration::from_secs(1))
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_frees_slot_and_late_reply_is_ignored() {
        let correlator = Correlator::new();
        let ticket = correlator.register(RequestKind::Join);
        let err = correlator
            .wait(ticket, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchdayError::Timeout { operation: "joinLobby" }));
        assert!(!correlator.is_pending(RequestKind::Join));
        assert!(!correlator.settle(&joined("R1")));
    }

    #[tokio::test]
    async fn wait_stays_pending_until_settled() {
        let correlator = Correlator::new();
        let ticket = correlator.register(RequestKind::Reset);
        let mut wait = tokio_test::task::spawn(correlator.wait(ticket, Duration::from_secs(5)));

        tokio_test::assert_pending!(wait.poll());
        correlator.settle(&ServerMessage::GameReset(RoomNotice::default()));
        assert!(wait.is_woken());
        let reply = tokio_test::assert_ready_ok!(wait.poll());
        assert!(reply.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timeout_keeps_newer_slot() {
        let correlator = Correlator::new();
        let old = correlator.register(RequestKind::Join);
        let old_id = old.id;
        let _new = correlator.register(RequestKind::Join);
        correlator.cancel(RequestKind::Join, old_id);
        assert!(correlator.is_pending(RequestKind::Join));
    }
}
