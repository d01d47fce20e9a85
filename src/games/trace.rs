//! Letter tracing game. The client only shows the board; players trace words
//! through the server's own interface.

use tracing::debug;

use crate::error::Result;
use crate::game::GameVariant;
use crate::protocol::Frame;
use crate::state::{ClientState, Effects, SessionRouter};
use crate::view::{is_highlighted, Cell};

pub mod events {
    pub const UPDATE_BOARD: &str = "updateBoard";
}

pub const LETTER_STYLE: &str = "letter";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceState {
    pub letters: Vec<String>,
}

/// This game has no client-side actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceIntent {}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceView {
    pub letters: Vec<Cell<TraceIntent>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trace;

impl GameVariant for Trace {
    const NAME: &'static str = "Trace";

    type State = TraceState;
    type Intent = TraceIntent;
    type View = TraceView;

    fn register(router: &mut SessionRouter<Self>) {
        router.on_receive(events::UPDATE_BOARD, on_update_board);
    }

    fn handle_intent(
        _state: &mut ClientState<Self>,
        intent: TraceIntent,
    ) -> Result<Effects<TraceIntent>> {
        match intent {}
    }

    fn render(state: &ClientState<Self>) -> TraceView {
        let highlight = state.log.highlighted_cell();
        TraceView {
            letters: state
                .game
                .letters
                .iter()
                .enumerate()
                .map(|(idx, letter)| Cell {
                    text: letter.clone(),
                    style: LETTER_STYLE,
                    highlighted: is_highlighted(highlight, idx, 0),
                    action: None,
                })
                .collect(),
        }
    }
}

fn on_update_board(state: &mut ClientState<Trace>, frame: &Frame) -> Result<Effects<TraceIntent>> {
    state.game.letters = frame.payload()?;
    debug!(letters = state.game.letters.len(), "board replaced");
    state.log.clear_highlight();
    state.clear_error();
    Ok(Vec::new())
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
    use crate::state::session_router;
    use crate::view::render;
    use serde_json::json;

    #[test]
    fn board_is_replaced_and_inert() {
        let router = session_router::<Trace>();
        let mut state = ClientState::<Trace>::default();
        state
            .apply(&router, &Frame::new("updateBoard", json!(["Q", "U", "I", "Z"])))
            .unwrap();
        state
            .apply(&router, &Frame::new("updateBoard", json!(["A", "B"])))
            .unwrap();
        let view = render(&state).game;
        let texts: Vec<&str> = view.letters.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
        assert!(view.letters.iter().all(|c| !c.is_clickable()));
    }
}
