//! WebSocket transport built on `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries one connection; [`WebSocketConnector`]
//! dials a fresh one each time the session (re)opens its channel. Both `ws://`
//! and `wss://` URLs work; TLS is handled by
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! Only available with the `transport-websocket` feature (on by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), parlor_client::ClientError> {
//! use parlor_client::games::dig::Dig;
//! use parlor_client::{ClientConfig, GameClient, MemoryResumeStore, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:8000/dig");
//! let (client, mut events) =
//!     GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());
//! client.edit_join_form("AB", "Al", false)?;
//! client.submit_join()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::ClientError;
use crate::transport::{Connector, Transport};

/// The underlying WebSocket stream, public so callers can wrap a stream they
/// set up themselves via [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One WebSocket connection to the game server.
///
/// Each protocol frame travels as one text message. Binary messages are
/// skipped; ping/pong is answered by tungstenite.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) only awaits the stream's `next()`, so dropping it
/// inside `tokio::select!` loses no message.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the URL is invalid or the connection
    /// fails. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind); anything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        tracing::debug!(url = %url, "connecting to game server");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            ClientError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "WebSocket connection established");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established stream (custom TLS, proxies, headers).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// [`connect`](Self::connect) with a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] if the deadline elapses, or any error
    /// [`connect`](Self::connect) returns.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| ClientError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| ClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(ClientError::TransportReceive(e.to_string()))),
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "server sent close frame");
                    return None;
                }
                Message::Binary(_) => {
                    tracing::warn!("skipping binary WebSocket message");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ClientError::TransportSend(e.to_string()))
    }
}

/// Dials a fresh [`WebSocketTransport`] for every channel open.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    /// Fail a connection attempt that takes longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, ClientError> {
        let transport = match self.timeout {
            Some(timeout) => WebSocketTransport::connect_with_timeout(&self.url, timeout).await?,
            None => WebSocketTransport::connect(&self.url).await?,
        };
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
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
    use crate::channel::{Channel, ChannelEvent};
    use crate::protocol::Frame;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send_and_debug() {
        fn assert_bounds<T: Send + std::fmt::Debug>() {}
        assert_bounds::<WebSocketTransport>();
        assert_bounds::<WebSocketConnector>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url").await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn connector_times_out_when_handshake_stalls() {
        // Accept the TCP connection but never answer the WebSocket upgrade.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(tcp);
        });

        let mut connector =
            WebSocketConnector::new(format!("ws://{addr}")).with_timeout(Duration::from_millis(50));
        match connector.connect().await {
            Err(ClientError::Timeout) => {}
            Err(other) => panic!("expected Timeout, got {other:?}"),
            Ok(_) => panic!("expected Timeout, got a connection"),
        }
        server.abort();
    }

    /// Accept `connections` WebSocket clients one after another, running
    /// `handler` on each.
    async fn serve<F, Fut>(connections: usize, handler: F) -> String
    where
        F: Fn(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..connections {
                let (tcp, _) = listener.accept().await.unwrap();
                let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                handler(ws).await;
            }
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn text_frames_arrive_and_binary_is_skipped() {
        let url = serve(1, |mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into())).await.unwrap();
            ws.send(Message::Text(r#"{"type":"ensureLobby"}"#.into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let text = transport.recv().await.unwrap().unwrap();
        assert_eq!(Frame::from_json(&text).unwrap().event, "ensureLobby");
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_is_rejected_and_close_is_idempotent() {
        let url = serve(1, |mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, ClientError::TransportClosed));
    }

    #[tokio::test]
    async fn channel_reopens_over_fresh_websocket() {
        // Each connection greets with ensureLobby and echoes one request.
        let url = serve(2, |mut ws| async move {
            ws.send(Message::Text(r#"{"type":"ensureLobby"}"#.into())).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut channel = Channel::new(WebSocketConnector::new(url));
        for _ in 0..2 {
            channel.open().await.unwrap();
            assert_eq!(
                channel.recv().await,
                ChannelEvent::Frame(Frame::new("ensureLobby", serde_json::Value::Null))
            );
            channel.send(Frame::new("undoRequest", serde_json::Value::Null));
            assert_eq!(
                channel.recv().await,
                ChannelEvent::Frame(Frame::new("undoRequest", serde_json::Value::Null))
            );
            channel.close().await;
        }

        // A payload survives the round trip unchanged.
        let frame = Frame::new("digRequest", json!({ "i": 1, "j": 2 }));
        assert_eq!(Frame::from_json(&frame.to_json().unwrap()).unwrap(), frame);
    }
}
