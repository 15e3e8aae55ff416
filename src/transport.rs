//! Transport abstraction for the Matchday session client.
//!
//! The [`Transport`] trait defines a bidirectional text message channel between
//! the client and one game-server namespace. Every frame is one JSON message,
//! so implementations handle message framing internally.
//!
//! Opening a transport is the job of a [`Connector`]: the connection manager
//! calls it on the first `connect` and again on every automatic reconnect,
//! passing the namespace and the auth credential that must travel with the
//! handshake.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use matchday_client::error::MatchdayError;
//! use matchday_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), MatchdayError> {
//!         // Send the JSON text message over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, MatchdayError>> {
//!         // Receive the next JSON text message
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), MatchdayError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::MatchdayError;

/// A bidirectional text message transport to one game-server namespace.
///
/// # Ordering
///
/// Frames must be delivered in send order (FIFO per connection). Nothing is
/// expected to survive a disconnect gap.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`MatchdayError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), MatchdayError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed cleanly by the server
    async fn recv(&mut self) -> Option<Result<String, MatchdayError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), MatchdayError>;
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, message: String) -> Result<(), MatchdayError> {
        (**self).send(message).await
    }

    async fn recv(&mut self) -> Option<Result<String, MatchdayError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), MatchdayError> {
        (**self).close().await
    }
}

/// Opens authenticated transports for a namespace.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `namespace` (e.g. `"/quiz"`), presenting
    /// `auth_token` during the handshake.
    ///
    /// # Errors
    ///
    /// Any transport-level failure; its message is surfaced on the
    /// connection manager's error field.
    async fn connect(
        &self,
        namespace: &str,
        auth_token: &str,
    ) -> Result<Box<dyn Transport>, MatchdayError>;
}
