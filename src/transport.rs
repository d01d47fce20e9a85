//! Transport abstraction for the parlor wire protocol.
//!
//! The [`Transport`] trait defines one bidirectional text message connection
//! between the client and the game server. Every message is a single JSON text
//! frame, so each implementation handles message framing internally.
//!
//! Unlike a one-shot client, a game session may need to tear its connection
//! down and open a fresh one (navigating back to the lobby forces a reset), so
//! connection setup lives behind a second trait, [`Connector`], which the
//! [`Channel`](crate::channel::Channel) calls every time it opens.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use parlor_client::error::ClientError;
//! use parlor_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), ClientError> {
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ClientError>> {
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ClientError> {
//!         todo!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     async fn connect(&mut self) -> Result<Box<dyn Transport>, ClientError> {
//!         Ok(Box::new(MyTransport {}))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ClientError;

/// A bidirectional text message transport.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON message.
/// Each call to [`recv`](Transport::recv) returns one complete JSON message.
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
    /// Returns [`ClientError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), ClientError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed cleanly by the server
    async fn recv(&mut self) -> Option<Result<String, ClientError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Opens fresh [`Transport`] connections to the game server.
///
/// Called once when the session starts and again whenever the session forces
/// a channel reset.
#[async_trait]
pub trait Connector: Send + 'static {
    /// Establish a new connection.
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying connection setup produced.
    async fn connect(&mut self) -> Result<Box<dyn Transport>, ClientError>;
}
