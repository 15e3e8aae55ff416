//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries the JSON text frames over one WebSocket.
//! [`WebSocketConnector`] opens one per namespace at `{base_url}{namespace}`
//! with the auth credential in the handshake's `Authorization: Bearer`
//! header. Both `ws://` and `wss://` URLs are supported; TLS is handled
//! transparently via [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), matchday_client::MatchdayError> {
//! use matchday_client::{ConnectionManager, WebSocketConnector};
//!
//! let manager = ConnectionManager::new(WebSocketConnector::new("wss://play.example.com"));
//! manager.set_auth_token(Some("jwt".into()));
//! manager.connect("/bingo").await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::MatchdayError;
use crate::transport::{Connector, Transport};

/// Default limit on the WebSocket handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Type alias for the underlying WebSocket stream.
///
/// Made public so that callers can construct a [`WebSocketTransport`] from an
/// existing stream via [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any messages,
/// making it safe to use inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

fn connect_error(e: tokio_tungstenite::tungstenite::Error) -> MatchdayError {
    let kind = match &e {
        tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
        _ => std::io::ErrorKind::Other,
    };
    MatchdayError::Io(std::io::Error::new(kind, e))
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL without
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`MatchdayError::Io`] if the URL is invalid or the connection
    /// cannot be established. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved; all other errors are
    /// mapped to [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, MatchdayError> {
        tracing::debug!(url = %url, "connecting to WebSocket server");
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(connect_error)?;
        tracing::info!(url = %url, "WebSocket connection established");
        Ok(Self::from_stream(stream))
    }

    /// Establish a new WebSocket connection, sending `token` as a bearer
    /// credential in the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`MatchdayError::Io`] as [`connect`](Self::connect) does, or
    /// when the token is not a valid header value.
    pub async fn connect_with_token(url: &str, token: &str) -> Result<Self, MatchdayError> {
        tracing::debug!(url = %url, "connecting to WebSocket server with credential");
        let mut request = url.into_client_request().map_err(connect_error)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            MatchdayError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(connect_error)?;
        tracing::info!(url = %url, "WebSocket connection established");
        Ok(Self::from_stream(stream))
    }

    /// Create a [`WebSocketTransport`] from an already-established WebSocket stream.
    ///
    /// This is useful when you need custom TLS configuration, proxy headers, or
    /// any other connection setup the constructors do not expose.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), MatchdayError> {
        if self.closed {
            return Err(MatchdayError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| MatchdayError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, MatchdayError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(MatchdayError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), MatchdayError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| MatchdayError::TransportSend(e.to_string()))
    }
}

// ── Connector ───────────────────────────────────────────────────────

/// Opens one authenticated [`WebSocketTransport`] per namespace.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: String,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// `base_url` is the server origin, e.g. `wss://play.example.com`; the
    /// namespace is appended as the path. A trailing `/` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Limit on the handshake. Defaults to **10 seconds**.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// URL for `namespace`.
    pub fn url_for(&self, namespace: &str) -> String {
        format!("{}{namespace}", self.base_url)
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        namespace: &str,
        auth_token: &str,
    ) -> Result<Box<dyn Transport>, MatchdayError> {
        let url = self.url_for(namespace);
        let transport = tokio::time::timeout(
            self.connect_timeout,
            WebSocketTransport::connect_with_token(&url, auth_token),
        )
        .await
        .map_err(|_| MatchdayError::Timeout {
            operation: "connect",
        })??;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn connector_builds_namespace_url() {
        let connector = WebSocketConnector::new("wss://play.example.com/");
        assert_eq!(connector.url_for("/quiz"), "wss://play.example.com/quiz");
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, MatchdayError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketConnector::new("ws://127.0.0.1:1")
            .connect("/quiz", "t")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MatchdayError::Io(_)));
    }

    #[tokio::test]
    async fn connect_times_out_on_silent_server() {
        // Accepts TCP but never answers the handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(tcp);
        });

        let connector = WebSocketConnector::new(format!("ws://{addr}"))
            .with_connect_timeout(Duration::from_millis(100));
        let err = connector.connect("/quiz", "t").await.err().unwrap();
        assert!(matches!(err, MatchdayError::Timeout { operation: "connect" }));
        silent.abort();
    }

    // ── Mock-server helpers ─────────────────────────────────────────

    /// Start a local WebSocket server that records the handshake path and
    /// `Authorization` header, then runs `handler` on the connection.
    async fn start_mock_server<F, Fut>(handler: F) -> (String, Arc<Mutex<Option<(String, String)>>>)
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_hdr_async(tcp, move |req: &Request, resp: Response| {
                let auth = req
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                *record.lock().unwrap() = Some((req.uri().path().to_string(), auth));
                Ok(resp)
            })
            .await
            .unwrap();
            handler(ws).await;
        });

        (format!("ws://{addr}"), seen)
    }

    #[tokio::test]
    async fn connector_sends_bearer_credential_to_namespace_path() {
        let (base, seen) = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"event":"error","data":{"message":"x"}}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector::new(base)
            .connect("/tictactoe", "secret")
            .await
            .unwrap();
        assert!(transport.recv().await.unwrap().is_ok());

        let (path, auth) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(path, "/tictactoe");
        assert_eq!(auth, "Bearer secret");
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let (url, _) = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, "after_binary");
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let (url, _) =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, MatchdayError::TransportClosed));
    }

    #[tokio::test]
    async fn send_round_trip() {
        let (url, _) = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.send("echo".to_string()).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "echo");
    }
}
