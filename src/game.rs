//! The capability set each game variant plugs into the shared session.
//!
//! Lobby, join, spectate, log and undo handling are shared. A variant only
//! supplies its board state, the pushes that update it, the requests its
//! controls send, its gating rules, and a pure render of its board.

use std::fmt::Debug;

use crate::error::Result;
use crate::protocol::Frame;
use crate::state::{ClientState, Effects, SessionRouter};

/// One game variant.
///
/// Implementors are zero-sized markers; all data lives in
/// [`ClientState::game`].
pub trait GameVariant: Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Human-readable game name.
    const NAME: &'static str;

    /// Board/seat snapshot plus any local-only control state.
    type State: Debug + Clone + Default + PartialEq + Send + 'static;

    /// Game-specific user interactions, also used as click bindings.
    type Intent: Debug + Clone + PartialEq + Send + 'static;

    /// Render output for the game's play surface.
    type View: Debug + Clone + PartialEq + Send + 'static;

    /// Register handlers for the game's own pushes.
    fn register(router: &mut SessionRouter<Self>);

    /// Consume the `gameStarted` payload, whose shape varies per game.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::InvalidPayload`] if the payload does not
    /// decode. Implementations must decode before mutating. The session logs
    /// the error and enters the game anyway.
    fn on_game_started(
        _state: &mut ClientState<Self>,
        _frame: &Frame,
    ) -> Result<Effects<Self::Intent>> {
        Ok(Vec::new())
    }

    /// Gate and translate a game interaction into requests.
    ///
    /// # Errors
    ///
    /// Returns an error only if a request fails to encode.
    fn handle_intent(
        state: &mut ClientState<Self>,
        intent: Self::Intent,
    ) -> Result<Effects<Self::Intent>>;

    /// Project the game's play surface. Must be free of side effects.
    fn render(state: &ClientState<Self>) -> Self::View;
}
