//! Arrow game: players pick a piece from their hand and drop it on a linear
//! board.
//!
//! Each piece carries four orientation digits. The hand shows one selected
//! piece while its owner is dropping; otherwise the owner is picking.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::game::GameVariant;
use crate::protocol::Frame;
use crate::state::{send, ClientState, Effects, SessionRouter};
use crate::view::{is_highlighted, Cell};

pub mod events {
    pub const UPDATE_PIECES: &str = "updatePieces";
    pub const UPDATE_BOARD: &str = "updateBoard";
}

pub const PIECE_STYLE: &str = "piece";
pub const SELECTED_STYLE: &str = "selected";
pub const EMPTY_STYLE: &str = "empty";

/// The four orientation digits of a piece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrow {
    pub d: [u8; 4],
}

impl Arrow {
    pub fn label(&self) -> String {
        self.d.iter().map(u8::to_string).collect()
    }
}

/// A piece in the current player's hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPiece {
    pub d: [u8; 4],
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiecesUpdate {
    pub pieces: Vec<HandPiece>,
    #[serde(default)]
    pub current_player: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ArrowRequest {
    #[serde(rename = "pickRequest")]
    Pick { index: usize },
    #[serde(rename = "dropRequest")]
    Drop { index: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Picking,
    Dropping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrowsState {
    pub hand: Vec<HandPiece>,
    pub current_player: Option<String>,
    /// `None` marks an empty slot.
    pub board: Vec<Option<Arrow>>,
}

impl ArrowsState {
    pub fn mode(&self) -> Mode {
        if self.hand.iter().any(|p| p.selected) {
            Mode::Dropping
        } else {
            Mode::Picking
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowIntent {
    /// Pick the hand piece at this index.
    Pick(usize),
    /// Drop the selected piece on this board slot.
    Drop(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowsView {
    pub mode: Mode,
    pub my_turn: bool,
    pub current_player: Option<String>,
    pub hand: Vec<Cell<ArrowIntent>>,
    pub board: Vec<Cell<ArrowIntent>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Arrows;

fn my_turn(state: &ClientState<Arrows>) -> bool {
    !state.is_spectating()
        && state.local_player().is_some()
        && state.game.current_player.as_deref() == state.local_player()
}

impl GameVariant for Arrows {
    const NAME: &'static str = "Arrows";

    type State = ArrowsState;
    type Intent = ArrowIntent;
    type View = ArrowsView;

    fn register(router: &mut SessionRouter<Self>) {
        router.on_receive(events::UPDATE_PIECES, on_update_pieces);
        router.on_receive(events::UPDATE_BOARD, on_update_board);
    }

    fn handle_intent(
        state: &mut ClientState<Self>,
        intent: ArrowIntent,
    ) -> Result<Effects<ArrowIntent>> {
        let mode = state.game.mode();
        if !my_turn(state) {
            debug!(?intent, "not the local player's turn");
            return Ok(Vec::new());
        }
        match intent {
            ArrowIntent::Pick(index) if mode == Mode::Picking && index < state.game.hand.len() => {
                Ok(vec![send(&ArrowRequest::Pick { index })?])
            }
            ArrowIntent::Drop(index)
                if mode == Mode::Dropping && matches!(state.game.board.get(index), Some(None)) =>
            {
                Ok(vec![send(&ArrowRequest::Drop { index })?])
            }
            _ => {
                debug!(?intent, ?mode, "move not available");
                Ok(Vec::new())
            }
        }
    }

    fn render(state: &ClientState<Self>) -> ArrowsView {
        let game = &state.game;
        let mode = game.mode();
        let my_turn = my_turn(state);
        let highlight = state.log.highlighted_cell();

        let hand = game
            .hand
            .iter()
            .enumerate()
            .map(|(idx, piece)| Cell {
                text: Arrow { d: piece.d }.label(),
                style: if piece.selected { SELECTED_STYLE } else { PIECE_STYLE },
                highlighted: false,
                action: (my_turn && mode == Mode::Picking).then_some(ArrowIntent::Pick(idx)),
            })
            .collect();

        let board = game
            .board
            .iter()
            .enumerate()
            .map(|(idx, slot)| match slot {
                Some(arrow) => Cell {
                    text: arrow.label(),
                    style: PIECE_STYLE,
                    highlighted: is_highlighted(highlight, idx, 0),
                    action: None,
                },
                None => Cell {
                    text: String::new(),
                    style: EMPTY_STYLE,
                    highlighted: is_highlighted(highlight, idx, 0),
                    action: (my_turn && mode == Mode::Dropping).then_some(ArrowIntent::Drop(idx)),
                },
            })
            .collect();

        ArrowsView {
            mode,
            my_turn,
            current_player: game.current_player.clone(),
            hand,
            board,
        }
    }
}

fn on_update_pieces(
    state: &mut ClientState<Arrows>,
    frame: &Frame,
) -> Result<Effects<ArrowIntent>> {
    let update: PiecesUpdate = frame.payload()?;
    state.game.hand = update.pieces;
    state.game.current_player = update.current_player;
    state.log.clear_highlight();
    state.clear_error();
    Ok(Vec::new())
}

fn on_update_board(state: &mut ClientState<Arrows>, frame: &Frame) -> Result<Effects<ArrowIntent>> {
    state.game.board = frame.payload()?;
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
    use crate::state::{session_router, Effect, Intent};
    use crate::view::render;
    use serde_json::{json, Value};

    type State = ClientState<Arrows>;

    fn push(state: &mut State, event: &str, data: Value) {
        let router = session_router::<Arrows>();
        state.apply(&router, &Frame::new(event, data)).unwrap();
    }

    fn in_game(name: &str, spectating: bool) -> State {
        let mut state = State::default();
        push(&mut state, "ensureLobby", json!(null));
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": name, "spectating": spectating }),
        );
        push(&mut state, "gameStarted", json!(null));
        push(
            &mut state,
            "updateBoard",
            json!([null, { "d": [1, 0, 2, 3] }, null, null]),
        );
        state
    }

    fn pieces(selected: Option<usize>, current: &str) -> Value {
        let pieces: Vec<Value> = (0..3)
            .map(|k| json!({ "d": [k, k, 0, 1], "selected": selected == Some(k) }))
            .collect();
        json!({ "pieces": pieces, "currentPlayer": current })
    }

    #[test]
    fn selected_piece_means_dropping_on_empty_cells() {
        let mut state = in_game("Al", false);
        push(&mut state, "updatePieces", pieces(Some(1), "Al"));
        let view = render(&state).game;

        assert_eq!(view.mode, Mode::Dropping);
        assert!(view.hand.iter().all(|c| !c.is_clickable()));
        assert_eq!(view.board[0].action, Some(ArrowIntent::Drop(0)));
        assert!(!view.board[1].is_clickable());
        assert_eq!(view.board[1].text, "1023");
        assert_eq!(view.board[2].action, Some(ArrowIntent::Drop(2)));
        assert_eq!(view.board[3].action, Some(ArrowIntent::Drop(3)));
        assert_eq!(view.hand[1].style, SELECTED_STYLE);
    }

    #[test]
    fn no_selection_means_picking_from_hand() {
        let mut state = in_game("Al", false);
        push(&mut state, "updatePieces", pieces(None, "Al"));
        let view = render(&state).game;

        assert_eq!(view.mode, Mode::Picking);
        assert!(view.board.iter().all(|c| !c.is_clickable()));
        assert!(view.hand.iter().all(Cell::is_clickable));
    }

    #[test]
    fn nothing_clickable_off_turn_or_as_spectator() {
        let mut state = in_game("Al", false);
        push(&mut state, "updatePieces", pieces(Some(0), "Bo"));
        let view = render(&state).game;
        assert!(!view.my_turn);
        assert!(view.board.iter().chain(&view.hand).all(|c| !c.is_clickable()));

        let mut spectator = in_game("Al", true);
        push(&mut spectator, "updatePieces", pieces(None, "Al"));
        let view = render(&spectator).game;
        assert!(view.board.iter().chain(&view.hand).all(|c| !c.is_clickable()));
    }

    #[test]
    fn requests_follow_mode() {
        let mut state = in_game("Al", false);
        push(&mut state, "updatePieces", pieces(None, "Al"));
        let effects = state.handle(Intent::Game(ArrowIntent::Pick(2))).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Send(Frame::new("pickRequest", json!({ "index": 2 })))]
        );
        assert!(state
            .handle(Intent::Game(ArrowIntent::Drop(0)))
            .unwrap()
            .is_empty());

        push(&mut state, "updatePieces", pieces(Some(2), "Al"));
        let effects = state.handle(Intent::Game(ArrowIntent::Drop(2))).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Send(Frame::new("dropRequest", json!({ "index": 2 })))]
        );
        // Occupied slot.
        assert!(state
            .handle(Intent::Game(ArrowIntent::Drop(1)))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn board_highlight_uses_log_index() {
        let mut state = in_game("Al", false);
        push(&mut state, "appendLog", json!({ "msg": "Bo dropped", "pos": { "i": 1 } }));
        state.handle(Intent::ClickLog(0)).unwrap();
        assert!(render(&state).game.board[1].highlighted);

        push(&mut state, "updateBoard", json!([null, null]));
        assert!(render(&state).game.board.iter().all(|c| !c.highlighted));
    }
}
