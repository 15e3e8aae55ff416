//! Transport implementations for the Matchday session client.
//!
//! | Module        | Feature                | Provides |
//! |---------------|------------------------|----------|
//! | [`websocket`] | `transport-websocket`  | `WebSocketTransport`, `WebSocketConnector` |
//! | [`loopback`]  | always                 | [`LoopbackTransport`], [`LoopbackConnector`] |
//!
//! # Example
//!
//! ```rust
//! # async fn example() -> Result<(), matchday_client::MatchdayError> {
//! use matchday_client::transports::loopback_pair;
//! use matchday_client::Transport;
//!
//! let (mut client, mut server) = loopback_pair();
//! client.send(r#"{"event":"startGame","data":{"userId":"u1"}}"#.to_string()).await?;
//! assert!(server.next_sent().await.is_some());
//! # Ok(())
//! # }
//! ```

pub mod loopback;

#[cfg(feature = "transport-websocket")]
pub mod websocket;

pub use loopback::{
    loopback_pair, Accepted, LoopbackAcceptor, LoopbackConnector, LoopbackServer,
    LoopbackTransport,
};

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
