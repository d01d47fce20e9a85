//! Wire types shared by every game variant.
//!
//! Every message, in both directions, is one JSON text frame tagged with its
//! event name: `{"type": "<eventName>", "data": <payload>}`. Events without a
//! payload omit `data`. Per-game vocabularies (bids, grids, pieces, counters)
//! live next to their game in [`crate::games`]; this module only carries the
//! envelope and the session-level payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Event names of the session-level pushes.
pub mod events {
    pub const ENSURE_LOBBY: &str = "ensureLobby";
    pub const UPDATE_GAMES: &str = "updateGames";
    pub const UPDATE_UNSEATED: &str = "updateUnseated";
    pub const UPDATE_PLAYERS: &str = "updatePlayers";
    pub const UPDATE_SPECTATORS: &str = "updateSpectators";
    pub const JOINED_GAME: &str = "joinedGame";
    pub const GAME_STARTED: &str = "gameStarted";
    pub const APPEND_LOG: &str = "appendLog";
    pub const REMOVE_LOG: &str = "removeLog";
    pub const SHOW_UNDO: &str = "showUndo";
    pub const ERROR_MSG: &str = "errorMsg";
}

// ── Envelope ────────────────────────────────────────────────────────

/// One message on the wire: an event name plus its (possibly absent) payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name, e.g. `"updateGrid"`.
    #[serde(rename = "type")]
    pub event: String,
    /// Event payload. `Null` when the event carries none.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Frame {
    /// Build a frame from an event name and a raw payload.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Encode a request enum (tagged with `type`/`data`) into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if the message does not serialize
    /// to the tagged envelope shape.
    pub fn encode<M: Serialize>(message: &M) -> Result<Self> {
        let value = serde_json::to_value(message)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a frame from a JSON text message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] for malformed JSON or a missing
    /// `type` field.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize this frame to a JSON text message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode the payload into the type the event expects.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidPayload`] naming this frame's event.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ClientError::invalid_payload(&self.event, e.to_string()))
    }
}

// ── Session payloads ────────────────────────────────────────────────

/// A named participant and whether their connection is currently live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub connected: bool,
}

/// One room as listed in the lobby directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Two-letter room code.
    pub name: String,
    /// Seated players in seat order.
    #[serde(default)]
    pub players: Vec<Participant>,
}

/// Payload of the `joinedGame` push: the server's canonical join tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedGame {
    pub game_name: String,
    pub player_name: String,
    #[serde(default)]
    pub spectating: bool,
}

/// A board position referenced by a log entry.
///
/// Grid games use both coordinates; linear boards use `i` as the index and
/// leave `j` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub i: usize,
    #[serde(default)]
    pub j: usize,
}

/// Payload of the `appendLog` push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogEntry {
    /// Plain text line.
    Text(String),
    /// Line that cross-references a board position.
    Linked { msg: String, pos: CellRef },
}

impl LogEntry {
    /// The text shown for this entry.
    pub fn message(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Linked { msg, .. } => msg,
        }
    }

    /// The referenced board position, if any.
    pub fn position(&self) -> Option<CellRef> {
        match self {
            Self::Text(_) => None,
            Self::Linked { pos, .. } => Some(*pos),
        }
    }
}

// ── Session requests ────────────────────────────────────────────────

/// Requests every game variant understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionRequest {
    /// Take (or reclaim) a seat, or watch as a spectator.
    #[serde(rename = "joinRequest")]
    JoinRequest {
        #[serde(rename = "gameName")]
        game_name: String,
        #[serde(rename = "playerName")]
        player_name: String,
        spectate: bool,
    },
    /// Start the game in the current room.
    #[serde(rename = "startGame")]
    StartGame,
    /// Undo the last action in the current room.
    #[serde(rename = "undoRequest")]
    UndoRequest,
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
    use serde_json::json;

    #[test]
    fn unit_request_encodes_without_data() {
        let frame = Frame::encode(&SessionRequest::StartGame).unwrap();
        assert_eq!(frame.event, "startGame");
        assert!(frame.data.is_null());
        assert_eq!(frame.to_json().unwrap(), r#"{"type":"startGame"}"#);
    }

    #[test]
    fn join_request_uses_wire_field_names() {
        let frame = Frame::encode(&SessionRequest::JoinRequest {
            game_name: "AB".into(),
            player_name: "Al".into(),
            spectate: false,
        })
        .unwrap();
        assert_eq!(frame.event, "joinRequest");
        assert_eq!(
            frame.data,
            json!({ "gameName": "AB", "playerName": "Al", "spectate": false })
        );
    }

    #[test]
    fn frame_without_data_parses_as_null() {
        let frame = Frame::from_json(r#"{"type":"ensureLobby"}"#).unwrap();
        assert_eq!(frame.event, events::ENSURE_LOBBY);
        assert!(frame.data.is_null());
    }

    #[test]
    fn frame_without_type_is_rejected() {
        assert!(Frame::from_json(r#"{"data":1}"#).is_err());
    }

    #[test]
    fn log_entry_accepts_text_and_linked_forms() {
        let text: LogEntry = serde_json::from_value(json!("Al bid 2")).unwrap();
        assert_eq!(text.message(), "Al bid 2");
        assert_eq!(text.position(), None);

        let linked: LogEntry =
            serde_json::from_value(json!({ "msg": "Al dug", "pos": { "i": 1, "j": 2 } })).unwrap();
        assert_eq!(linked.message(), "Al dug");
        assert_eq!(linked.position(), Some(CellRef { i: 1, j: 2 }));
    }

    #[test]
    fn payload_error_names_the_event() {
        let frame = Frame::new(events::REMOVE_LOG, json!("three"));
        let err = frame.payload::<usize>().unwrap_err();
        match err {
            ClientError::InvalidPayload { event, .. } => assert_eq!(event, "removeLog"),
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn joined_game_defaults_spectating_to_false() {
        let joined: JoinedGame =
            serde_json::from_value(json!({ "gameName": "AB", "playerName": "Al" })).unwrap();
        assert!(!joined.spectating);
    }
}
