//! # Matchday Client
//!
//! Real-time multiplayer session client for football trivia games: bingo,
//! quiz, team guessing and tic-tac-toe.
//!
//! The crate keeps one authenticated connection per game namespace, turns
//! every server push into a Room State transition, and exposes the player's
//! actions as methods on a [`GameSession`].
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **Typed wire model**: [`ClientMessage`] and [`ServerMessage`] are closed tagged unions
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   `WebSocketConnector`
//! - **Reactive state**: Room State, game result and error field are watch cells
//!   that only signal on real changes
//! - **Auto-reconnect** with a game-state resync after every reconnect
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), matchday_client::MatchdayError> {
//! use std::sync::Arc;
//! use matchday_client::{
//!     ConnectionManager, FileIdentityStore, GameSession, SessionConfig, SessionEvent,
//!     WebSocketConnector,
//! };
//!
//! let manager = ConnectionManager::new(WebSocketConnector::new("wss://play.example.com"));
//! manager.set_auth_token(Some("jwt".into()));
//!
//! let session = GameSession::new(
//!     manager.clone(),
//!     "/tictactoe",
//!     Arc::new(FileIdentityStore::new("identity.json")),
//!     SessionConfig::default(),
//! );
//! let mut events = session.subscribe();
//!
//! session.join_lobby("u1", "Alice", None).await?;
//! session.toggle_ready();
//!
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::GameFinished(result) = event {
//!         println!("{:?}", result.outcome_for("u1"));
//!         break;
//!     }
//! }
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod correlate;
pub mod error;
pub mod error_codes;
pub mod event;
pub mod identity;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod store;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use config::{ConnectionConfig, DrawPolicy, SessionConfig};
pub use connection::{Connection, EventListener};
pub use error::{MatchdayError, Result};
pub use error_codes::ErrorCode;
pub use event::{FinishReason, GameResult, Outcome, SessionEvent};
pub use identity::{FileIdentityStore, Identity, IdentityStore, MemoryIdentityStore};
pub use manager::{ConnectionManager, ConnectionState};
pub use protocol::{Answer, CellTarget, ClientMessage, Player, Room, RoomStatus, ServerMessage};
pub use session::GameSession;
pub use store::StateCell;
pub use transport::{Connector, Transport};
pub use transports::{LoopbackConnector, LoopbackTransport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
