//! # Parlor Client
//!
//! Transport-agnostic session and game-state client for turn-based
//! multiplayer board games.
//!
//! The server owns every game. This crate keeps a local view of one room in
//! sync with the server's pushes, gates what the local user may do, and
//! turns interactions into requests over a single persistent channel.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **Snapshot-driven**: every push replaces its slice of state; renders are pure
//! - **Shared session logic**: lobby, join, spectate, log and undo work the same
//!   for every [`GameVariant`]
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   `WebSocketTransport` and `WebSocketConnector`
//!
//! ## Layers
//!
//! | Layer | Entry point |
//! |---|---|
//! | Reducer | [`ClientState::apply`], [`ClientState::handle`] |
//! | Render | [`view::render`] |
//! | Driver | [`GameClient::start`] |

pub mod channel;
pub mod client;
pub mod error;
pub mod game;
pub mod games;
pub mod lobby;
pub mod log;
pub mod protocol;
pub mod resume;
pub mod state;
pub mod transport;
pub mod transports;
pub mod view;

// Re-export primary types for ergonomic imports.
pub use client::{ClientConfig, ClientEvent, GameClient};
pub use error::ClientError;
pub use game::GameVariant;
pub use protocol::Frame;
pub use resume::{MemoryResumeStore, NavEntry, ResumeStore, ResumeToken};
pub use state::{ClientState, Effect, Intent, SessionStatus};
pub use transport::{Connector, Transport};
pub use view::ClientView;

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
