//! Listener Registry: server events to Room State transitions.
//!
//! [`transition`] is a pure function of the prior room, the event and a small
//! [`Context`]. It returns a [`Transition`] describing what to do with the
//! room cell, the game-result cell and the error field, plus any
//! [`SessionEvent`]s to publish. The session applies it; nothing here touches
//! shared state.
//!
//! Rules, in order of precedence:
//!
//! - A room whose status is `finished` is always applied, even with no
//!   current room.
//! - `roomJoined` replaces the current room outright; joining a new lobby
//!   from a finished game is not a reset.
//! - A full room moving a `playing`/`finished` room back to a bare `waiting`
//!   lobby is a reset: the room is cleared and [`SessionEvent::ReturnToLobby`]
//!   is published.
//! - Any other full room replaces the current one wholesale, provided there
//!   is a current room or one is awaited (join or resync pending). Otherwise
//!   the event is dropped.
//! - A bare `timeRemaining` merges onto the current room's timer and touches
//!   nothing else.

use std::sync::Arc;

use tracing::debug;

use crate::config::DrawPolicy;
use crate::connection::{Connection, EventListener};
use crate::event::{FinishReason, GameResult, SessionEvent};
use crate::protocol::{Room, RoomNotice, RoomStatus, ServerEventKind, ServerMessage};

/// What to do with one reactive cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Change<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Change<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Inputs to [`transition`] that do not live in the room.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// A join or a reconnect resync is outstanding, so full rooms apply even
    /// when there is no current room.
    pub awaiting_room: bool,
    pub draw_policy: DrawPolicy,
    /// The game result currently held.
    pub result: Option<GameResult>,
}

/// The effect of one server event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    pub room: Change<Room>,
    pub result: Change<GameResult>,
    /// New value for the error field.
    pub error: Option<String>,
    pub events: Vec<SessionEvent>,
}

impl Transition {
    fn keep() -> Self {
        Self::default()
    }

    fn room(room: Room) -> Self {
        Self {
            room: Change::Set(room),
            ..Self::default()
        }
    }
}

/// Compute the transition for `message` given the current room.
pub fn transition(prior: Option<&Room>, message: &ServerMessage, ctx: &Context) -> Transition {
    use ServerMessage as M;

    match message {
        M::RoomJoined(p) => joined(prior, &p.room, ctx),

        M::PlayerJoined(n)
        | M::PlayerLeft(n)
        | M::PlayerReadyUpdate(n)
        | M::GameStarting(n)
        | M::GameStarted(n)
        | M::CellClicked(n)
        | M::TurnChanged(n)
        | M::DrawRequested(n)
        | M::DrawDeclined(n)
        | M::RematchRequested(n)
        | M::RematchAccepted(n)
        | M::RematchDeclined(n)
        | M::RematchCancelled(n) => notice(prior, n, ctx, message.kind()),

        M::AnswerResult(p) => match &p.room {
            Some(room) => replace(prior, room, ctx, message.kind()),
            None => Transition::keep(),
        },

        M::GameStateUpdate(p) => match (&p.room, p.time_remaining) {
            (Some(room), _) => replace(prior, room, ctx, message.kind()),
            (None, Some(seconds)) => merge_timer(prior, seconds),
            (None, None) => Transition::keep(),
        },

        M::TimerUpdate(p) => match &p.room {
            Some(room) => replace(prior, room, ctx, message.kind()),
            None => merge_timer(prior, p.time_remaining),
        },

        M::GameFinished(p) => {
            let room = p.room.clone().map_or(Change::Keep, Change::Set);
            let result = GameResult::from_finish(p.winner.clone(), p.is_draw, p.reason.as_deref());
            let won_by_disconnect = ctx.result.as_ref().is_some_and(|held| {
                matches!(held.reason, FinishReason::OpponentDisconnected { .. })
                    && held.winner == result.winner
            });
            if won_by_disconnect {
                debug!("game already decided by disconnect; result kept");
                return Transition {
                    room,
                    ..Transition::default()
                };
            }
            Transition {
                room,
                result: Change::Set(result.clone()),
                error: None,
                events: vec![SessionEvent::GameFinished(result)],
            }
        }

        M::GameReset(_) => Transition {
            room: Change::Clear,
            result: Change::Clear,
            error: None,
            events: vec![SessionEvent::ReturnToLobby],
        },

        M::GameDraw(n) | M::DrawAccepted(n) => draw(prior, n, ctx),

        M::OpponentDisconnected(p) => {
            let username = p.disconnected_player.username.clone();
            let result = GameResult {
                winner: p.winner.clone(),
                reason: FinishReason::OpponentDisconnected {
                    username: username.clone(),
                },
            };
            Transition {
                room: p.room.clone().map_or(Change::Keep, Change::Set),
                result: Change::Set(result.clone()),
                error: None,
                events: vec![
                    SessionEvent::OpponentDisconnected { username },
                    SessionEvent::GameFinished(result),
                ],
            }
        }

        M::Error(p) => Transition {
            error: Some(p.message.clone()),
            events: vec![SessionEvent::Error {
                message: p.message.clone(),
            }],
            ..Transition::default()
        },
    }
}

fn notice(prior: Option<&Room>, n: &RoomNotice, ctx: &Context, kind: ServerEventKind) -> Transition {
    match &n.room {
        Some(room) => replace(prior, room, ctx, kind),
        None => Transition::keep(),
    }
}

/// The reply to a join: always the player's new room.
fn joined(prior: Option<&Room>, next: &Room, ctx: &Context) -> Transition {
    if prior.is_none() && !ctx.awaiting_room && next.status != RoomStatus::Finished {
        debug!(room_id = %next.room_id, "roomJoined without a pending join; dropped");
        return Transition::keep();
    }
    let mut t = Transition::room(next.clone());
    if next.status != RoomStatus::Finished {
        t.result = Change::Clear;
    }
    t
}

/// Full replacement, with the finished force-apply and reset detection.
fn replace(prior: Option<&Room>, next: &Room, ctx: &Context, kind: ServerEventKind) -> Transition {
    if next.status == RoomStatus::Finished {
        return Transition::room(next.clone());
    }

    let Some(prior) = prior else {
        if ctx.awaiting_room {
            return Transition::room(next.clone());
        }
        debug!(event = %kind, room_id = %next.room_id, "no current room; event dropped");
        return Transition::keep();
    };

    let was_in_game = matches!(prior.status, RoomStatus::Playing | RoomStatus::Finished);
    if was_in_game && next.is_lobby() {
        debug!(event = %kind, room_id = %next.room_id, "room reset to lobby");
        return Transition {
            room: Change::Clear,
            result: Change::Clear,
            error: None,
            events: vec![SessionEvent::ReturnToLobby],
        };
    }

    let mut t = Transition::room(next.clone());
    if matches!(next.status, RoomStatus::Starting | RoomStatus::Playing) {
        // A new game (e.g. after a rematch) drops the previous result.
        t.result = Change::Clear;
    }
    t
}

fn merge_timer(prior: Option<&Room>, seconds: u32) -> Transition {
    match prior {
        Some(room) => Transition::room(room.with_timer(seconds)),
        None => {
            debug!(seconds, "timer update without a current room; dropped");
            Transition::keep()
        }
    }
}

/// An agreed draw either continues in place or ends the game.
fn draw(prior: Option<&Room>, n: &RoomNotice, ctx: &Context) -> Transition {
    let continued = match ctx.draw_policy {
        DrawPolicy::ContinueInPlace => true,
        DrawPolicy::ReturnToLobby => false,
        DrawPolicy::FollowServer => n
            .room
            .as_ref()
            .is_some_and(|r| r.status == RoomStatus::Playing && r.game_state.is_some()),
    };

    if continued {
        let mut t = match &n.room {
            Some(room) if prior.is_some() || ctx.awaiting_room => Transition::room(room.clone()),
            _ => Transition::keep(),
        };
        t.events.push(SessionEvent::DrawAccepted { continued: true });
        return t;
    }

    let result = GameResult::draw();
    Transition {
        room: Change::Clear,
        result: Change::Set(result.clone()),
        error: None,
        events: vec![
            SessionEvent::DrawAccepted { continued: false },
            SessionEvent::GameFinished(result),
            SessionEvent::ReturnToLobby,
        ],
    }
}

// ── Attachment ──────────────────────────────────────────────────────

/// Attach `listener` to every server event on `connection`.
///
/// Listeners already registered for those names are removed first, so
/// attaching twice still handles each event once.
pub fn attach(connection: &Connection, listener: &Arc<dyn EventListener>) {
    for kind in ServerEventKind::ALL {
        connection.off(kind);
        connection.on(kind, Arc::clone(listener));
    }
    debug!(namespace = %connection.namespace(), "listener registry attached");
}

/// Remove every server-event listener from `connection`.
pub fn detach(connection: &Connection) {
    for kind in ServerEventKind::ALL {
        connection.off(kind);
    }
}
