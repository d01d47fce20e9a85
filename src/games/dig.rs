//! Digging game: players bid stamina for the right to dig on a square grid.
//!
//! Each round opens with a bid. The bid control is enabled only while bidding
//! is open and the local player has not bid yet; with autobid on, the current
//! selection is submitted automatically a short delay after the control
//! becomes enabled. The round winner then digs one undiscovered cell.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::game::GameVariant;
use crate::protocol::Frame;
use crate::state::{send, ClientState, Effect, Effects, SessionRouter};
use crate::view::{is_highlighted, Cell};

/// Pushes specific to this game.
pub mod events {
    pub const UPDATE_BIDS: &str = "updateBids";
    pub const UPDATE_GRID: &str = "updateGrid";
}

/// Styles for revealed cells, indexed by the dug value.
pub const PALETTE: [&str; 9] = [
    "lightgray", "blue", "green", "yellow", "orange", "red", "purple", "brown", "black",
];
/// Style for values past the end of [`PALETTE`].
const OVERFLOW_STYLE: &str = "black";
pub const TREASURE_STYLE: &str = "acorn";
pub const TREASURE_TEXT: &str = "*";
pub const UNDUG_STYLE: &str = "undug";

/// Largest stamina the bid selector offers options for.
pub const MAX_STAMINA: u32 = 1_000;

// ── Wire payloads ───────────────────────────────────────────────────

/// One seat as listed in `updateBids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bidder {
    pub name: String,
    pub stamina: u32,
    pub acorns: u32,
    /// Whether this seat holds the current turn.
    #[serde(default)]
    pub current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
    /// This round's bid, once placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidsUpdate {
    /// Acorns left in the pot.
    pub acorns: u32,
    pub players: Vec<Bidder>,
    #[serde(default)]
    pub whose_turn: Option<String>,
    #[serde(default)]
    pub bidding: bool,
}

/// One grid square. An undiscovered square has neither field set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dug: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acorn: Option<bool>,
}

impl GridCell {
    pub fn is_treasure(&self) -> bool {
        self.acorn == Some(true)
    }

    pub fn is_revealed(&self) -> bool {
        self.dug.is_some() || self.is_treasure()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridUpdate {
    pub grid: Vec<Vec<GridCell>>,
    /// Whether the local player digs next.
    #[serde(default)]
    pub current: bool,
}

/// Payload of `gameStarted` for this game: the grid itself or `{grid}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum GameStart {
    Grid(Vec<Vec<GridCell>>),
    Setup {
        #[serde(default)]
        grid: Option<Vec<Vec<GridCell>>>,
    },
}

impl GameStart {
    fn into_grid(self) -> Option<Vec<Vec<GridCell>>> {
        match self {
            Self::Grid(grid) => Some(grid),
            Self::Setup { grid } => grid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DigRequest {
    #[serde(rename = "bidRequest")]
    Bid { index: u32 },
    #[serde(rename = "digRequest")]
    Dig { i: usize, j: usize },
}

// ── Local state ─────────────────────────────────────────────────────

/// The bid selector's options, always `0..=stamina`.
///
/// Options are grown and shrunk at the end so a selection that stays in range
/// survives a stamina change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidSelector {
    options: Vec<u32>,
    selected: u32,
}

impl Default for BidSelector {
    fn default() -> Self {
        Self {
            options: vec![0],
            selected: 0,
        }
    }
}

impl BidSelector {
    /// Resize the options to `stamina + 1`, with stamina capped at
    /// [`MAX_STAMINA`].
    pub fn resize(&mut self, stamina: u32) {
        let stamina = stamina.min(MAX_STAMINA);
        let wanted = stamina as usize + 1;
        while self.options.len() > wanted {
            self.options.pop();
        }
        while self.options.len() < wanted {
            self.options.push(self.options.len() as u32);
        }
        if self.selected > stamina {
            self.selected = 0;
        }
    }

    /// Select `value` if it is one of the options.
    pub fn select(&mut self, value: u32) -> bool {
        if !self.options.contains(&value) {
            return false;
        }
        self.selected = value;
        true
    }

    pub fn options(&self) -> &[u32] {
        &self.options
    }

    pub fn selected(&self) -> u32 {
        self.selected
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigState {
    pub pot: u32,
    pub bidders: Vec<Bidder>,
    pub whose_turn: Option<String>,
    pub bidding: bool,
    pub selector: BidSelector,
    /// Local preference, kept across rounds.
    pub autobid: bool,
    pub bid_enabled: bool,
    pub grid: Vec<Vec<GridCell>>,
    pub my_dig_turn: bool,
}

impl DigState {
    fn cell(&self, i: usize, j: usize) -> Option<&GridCell> {
        self.grid.get(i).and_then(|row| row.get(j))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigIntent {
    SelectBid(u32),
    SubmitBid,
    SetAutobid(bool),
    /// The autobid delay ran out.
    AutobidElapsed,
    Dig { i: usize, j: usize },
}

// ── View ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidderView {
    pub name: String,
    pub stamina: u32,
    pub acorns: u32,
    pub current: bool,
    pub has_bid: bool,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigView {
    pub pot: u32,
    pub bidders: Vec<BidderView>,
    pub whose_turn: Option<String>,
    pub bid_options: Vec<u32>,
    pub selected_bid: u32,
    pub bid_enabled: bool,
    pub autobid: bool,
    pub grid: Vec<Vec<Cell<DigIntent>>>,
}

/// Style for a revealed cell's dug value.
pub fn palette(value: u32) -> &'static str {
    PALETTE
        .get(value as usize)
        .copied()
        .unwrap_or(OVERFLOW_STYLE)
}

// ── Variant ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dig;

impl GameVariant for Dig {
    const NAME: &'static str = "Dig";

    type State = DigState;
    type Intent = DigIntent;
    type View = DigView;

    fn register(router: &mut SessionRouter<Self>) {
        router.on_receive(events::UPDATE_BIDS, on_update_bids);
        router.on_receive(events::UPDATE_GRID, on_update_grid);
    }

    fn on_game_started(state: &mut ClientState<Self>, frame: &Frame) -> Result<Effects<DigIntent>> {
        let start: Option<GameStart> = frame.payload()?;
        if let Some(grid) = start.and_then(GameStart::into_grid) {
            state.game.grid = grid;
            state.log.clear_highlight();
        }
        Ok(Vec::new())
    }

    fn handle_intent(
        state: &mut ClientState<Self>,
        intent: DigIntent,
    ) -> Result<Effects<DigIntent>> {
        match intent {
            DigIntent::SelectBid(value) => {
                if !state.game.selector.select(value) {
                    debug!(value, "bid out of range, ignoring");
                }
                Ok(Vec::new())
            }
            DigIntent::SubmitBid => submit_bid(state),
            DigIntent::SetAutobid(on) => {
                state.game.autobid = on;
                if on && state.game.bid_enabled {
                    return Ok(vec![autobid_timer(state)]);
                }
                Ok(Vec::new())
            }
            DigIntent::AutobidElapsed => {
                if !state.game.autobid {
                    debug!("autobid turned off before it fired");
                    return Ok(Vec::new());
                }
                submit_bid(state)
            }
            DigIntent::Dig { i, j } => {
                let undug = state.game.cell(i, j).is_some_and(|c| !c.is_revealed());
                if state.is_spectating() || !state.game.my_dig_turn || !undug {
                    debug!(i, j, "dig not available");
                    return Ok(Vec::new());
                }
                Ok(vec![send(&DigRequest::Dig { i, j })?])
            }
        }
    }

    fn render(state: &ClientState<Self>) -> DigView {
        let game = &state.game;
        let local = state.local_player();
        let highlight = state.log.highlighted_cell();
        let can_dig = game.my_dig_turn && !state.is_spectating();

        let grid = game
            .grid
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, cell)| {
                        let highlighted = is_highlighted(highlight, i, j);
                        if cell.is_treasure() {
                            Cell {
                                text: TREASURE_TEXT.to_string(),
                                style: TREASURE_STYLE,
                                highlighted,
                                action: None,
                            }
                        } else if let Some(value) = cell.dug {
                            Cell {
                                text: value.to_string(),
                                style: palette(value),
                                highlighted,
                                action: None,
                            }
                        } else {
                            Cell {
                                text: String::new(),
                                style: UNDUG_STYLE,
                                highlighted,
                                action: can_dig.then_some(DigIntent::Dig { i, j }),
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        DigView {
            pot: game.pot,
            bidders: game
                .bidders
                .iter()
                .map(|b| BidderView {
                    name: b.name.clone(),
                    stamina: b.stamina,
                    acorns: b.acorns,
                    current: b.current,
                    has_bid: b.bid.is_some(),
                    is_local: local == Some(b.name.as_str()),
                })
                .collect(),
            whose_turn: game.whose_turn.clone(),
            bid_options: game.selector.options().to_vec(),
            selected_bid: game.selector.selected(),
            bid_enabled: game.bid_enabled,
            autobid: game.autobid,
            grid,
        }
    }
}

fn autobid_timer(state: &ClientState<Dig>) -> Effect<DigIntent> {
    Effect::Schedule {
        delay: state.autobid_delay,
        intent: DigIntent::AutobidElapsed,
    }
}

fn submit_bid(state: &mut ClientState<Dig>) -> Result<Effects<DigIntent>> {
    if !state.game.bid_enabled {
        debug!("bid control disabled, ignoring");
        return Ok(Vec::new());
    }
    let index = state.game.selector.selected();
    // Re-enabled only by the next bids push.
    state.game.bid_enabled = false;
    Ok(vec![send(&DigRequest::Bid { index })?])
}

fn on_update_bids(state: &mut ClientState<Dig>, frame: &Frame) -> Result<Effects<DigIntent>> {
    let update: BidsUpdate = frame.payload()?;

    let local = state
        .local_player()
        .and_then(|name| update.players.iter().find(|b| b.name == name));
    let stamina = local.map_or(0, |b| b.stamina);
    let enabled =
        update.bidding && local.is_some_and(|b| b.bid.is_none()) && !state.is_spectating();

    let game = &mut state.game;
    let was_enabled = game.bid_enabled;
    game.selector.resize(stamina);
    game.pot = update.acorns;
    game.bidders = update.players;
    game.whose_turn = update.whose_turn;
    game.bidding = update.bidding;
    game.bid_enabled = enabled;
    state.clear_error();

    if enabled && !was_enabled && state.game.autobid {
        debug!(delay = ?state.autobid_delay, "scheduling autobid");
        return Ok(vec![autobid_timer(state)]);
    }
    Ok(Vec::new())
}

fn on_update_grid(state: &mut ClientState<Dig>, frame: &Frame) -> Result<Effects<DigIntent>> {
    let update: GridUpdate = frame.payload()?;
    state.game.grid = update.grid;
    state.game.my_dig_turn = update.current;
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
    use crate::state::{session_router, Intent};
    use crate::view::render;
    use serde_json::{json, Value};

    type State = ClientState<Dig>;

    fn push(state: &mut State, event: &str, data: Value) -> Effects<DigIntent> {
        let router = session_router::<Dig>();
        state.apply(&router, &Frame::new(event, data)).unwrap()
    }

    fn joined_as(name: &str, spectating: bool) -> State {
        let mut state = State::default();
        push(&mut state, "ensureLobby", json!(null));
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": name, "spectating": spectating }),
        );
        push(&mut state, "gameStarted", json!(null));
        state
    }

    fn bids(stamina: u32, bid: Option<u32>, bidding: bool) -> Value {
        json!({
            "acorns": 12,
            "players": [
                { "name": "Al", "stamina": stamina, "acorns": 0, "current": true, "socketId": "s1", "bid": bid },
                { "name": "Bo", "stamina": 5, "acorns": 2 }
            ],
            "whoseTurn": "Al",
            "bidding": bidding
        })
    }

    fn sent(effects: &[Effect<DigIntent>]) -> Vec<Frame> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn bid_options_follow_stamina() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateBids", bids(3, None, true));
        assert_eq!(render(&state).game.bid_options, vec![0, 1, 2, 3]);

        state.handle(Intent::Game(DigIntent::SelectBid(1))).unwrap();
        push(&mut state, "updateBids", bids(1, None, true));
        let view = render(&state).game;
        assert_eq!(view.bid_options, vec![0, 1]);
        assert_eq!(view.selected_bid, 1);

        push(&mut state, "updateBids", bids(4, None, true));
        let view = render(&state).game;
        assert_eq!(view.bid_options.len(), 5);
        assert_eq!(view.selected_bid, 1);
    }

    #[test]
    fn out_of_range_selection_resets_to_zero() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateBids", bids(4, None, true));
        state.handle(Intent::Game(DigIntent::SelectBid(3))).unwrap();
        push(&mut state, "updateBids", bids(2, None, true));
        assert_eq!(state.game.selector.selected(), 0);

        // Values outside the options are not selectable.
        state.handle(Intent::Game(DigIntent::SelectBid(9))).unwrap();
        assert_eq!(state.game.selector.selected(), 0);
    }

    #[test]
    fn bid_enabled_only_while_bidding_and_not_yet_bid() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateBids", bids(3, None, true));
        assert!(state.game.bid_enabled);

        push(&mut state, "updateBids", bids(3, Some(2), true));
        assert!(!state.game.bid_enabled);

        push(&mut state, "updateBids", bids(3, None, false));
        assert!(!state.game.bid_enabled);

        let mut spectator = joined_as("Al", true);
        push(&mut spectator, "updateBids", bids(3, None, true));
        assert!(!spectator.game.bid_enabled);

        // Not seated in this game at all.
        let mut stranger = joined_as("Cy", false);
        push(&mut stranger, "updateBids", bids(3, None, true));
        assert!(!stranger.game.bid_enabled);
        assert_eq!(stranger.game.selector.options(), &[0]);
    }

    #[test]
    fn submit_bid_sends_selection_once() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateBids", bids(3, None, true));
        state.handle(Intent::Game(DigIntent::SelectBid(2))).unwrap();

        let effects = state.handle(Intent::Game(DigIntent::SubmitBid)).unwrap();
        assert_eq!(sent(&effects), vec![Frame::new("bidRequest", json!({ "index": 2 }))]);

        let again = state.handle(Intent::Game(DigIntent::SubmitBid)).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn autobid_schedules_when_control_becomes_enabled() {
        let mut state = joined_as("Al", false);
        assert!(state
            .handle(Intent::Game(DigIntent::SetAutobid(true)))
            .unwrap()
            .is_empty());

        let effects = push(&mut state, "updateBids", bids(3, None, true));
        assert_eq!(
            effects,
            vec![Effect::Schedule {
                delay: state.autobid_delay,
                intent: DigIntent::AutobidElapsed,
            }]
        );

        // Still enabled: no second timer.
        assert!(push(&mut state, "updateBids", bids(3, None, true)).is_empty());

        let fired = state.handle(Intent::Game(DigIntent::AutobidElapsed)).unwrap();
        assert_eq!(sent(&fired), vec![Frame::new("bidRequest", json!({ "index": 0 }))]);
    }

    #[test]
    fn autobid_toggled_on_while_enabled_schedules_immediately() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateBids", bids(3, None, true));
        let effects = state.handle(Intent::Game(DigIntent::SetAutobid(true))).unwrap();
        assert!(matches!(
            effects.as_slice(),
            [Effect::Schedule { intent: DigIntent::AutobidElapsed, .. }]
        ));
    }

    #[test]
    fn autobid_turned_off_before_firing_does_nothing() {
        let mut state = joined_as("Al", false);
        state.handle(Intent::Game(DigIntent::SetAutobid(true))).unwrap();
        push(&mut state, "updateBids", bids(3, None, true));
        state.handle(Intent::Game(DigIntent::SetAutobid(false))).unwrap();
        let fired = state.handle(Intent::Game(DigIntent::AutobidElapsed)).unwrap();
        assert!(fired.is_empty());
    }

    fn three_by_three(current: bool) -> Value {
        json!({
            "grid": [
                [{}, {}, {}],
                [{}, { "dug": 3, "acorn": false }, {}],
                [{}, {}, { "acorn": true }]
            ],
            "current": current
        })
    }

    #[test]
    fn revealed_cells_are_inert_and_styled_by_value() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateGrid", three_by_three(true));
        let grid = render(&state).game.grid;

        let dug = &grid[1][1];
        assert_eq!(dug.text, "3");
        assert_eq!(dug.style, "yellow");
        assert!(!dug.is_clickable());

        let treasure = &grid[2][2];
        assert_eq!(treasure.style, TREASURE_STYLE);
        assert_eq!(treasure.text, TREASURE_TEXT);
        assert!(!treasure.is_clickable());

        for (i, row) in grid.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                if (i, j) != (1, 1) && (i, j) != (2, 2) {
                    assert_eq!(cell.action, Some(DigIntent::Dig { i, j }), "cell ({i},{j})");
                }
            }
        }
    }

    #[test]
    fn undug_cells_inert_off_turn_and_for_spectators() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateGrid", three_by_three(false));
        assert!(render(&state).game.grid.iter().flatten().all(|c| !c.is_clickable()));

        let mut spectator = joined_as("Al", true);
        push(&mut spectator, "updateGrid", three_by_three(true));
        assert!(render(&spectator).game.grid.iter().flatten().all(|c| !c.is_clickable()));
        let effects = spectator
            .handle(Intent::Game(DigIntent::Dig { i: 0, j: 0 }))
            .unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn dig_request_only_for_undug_cells() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateGrid", three_by_three(true));

        let effects = state.handle(Intent::Game(DigIntent::Dig { i: 0, j: 2 })).unwrap();
        assert_eq!(sent(&effects), vec![Frame::new("digRequest", json!({ "i": 0, "j": 2 }))]);

        assert!(state
            .handle(Intent::Game(DigIntent::Dig { i: 1, j: 1 }))
            .unwrap()
            .is_empty());
        assert!(state
            .handle(Intent::Game(DigIntent::Dig { i: 7, j: 7 }))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn palette_saturates_at_last_style() {
        assert_eq!(palette(0), "lightgray");
        assert_eq!(palette(8), "black");
        assert_eq!(palette(42), "black");
    }

    #[test]
    fn grid_push_clears_log_highlight() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateGrid", three_by_three(true));
        push(&mut state, "appendLog", json!({ "msg": "Al dug", "pos": { "i": 1, "j": 1 } }));
        state.handle(Intent::ClickLog(0)).unwrap();
        assert!(render(&state).game.grid[1][1].highlighted);

        state.handle(Intent::ClickLog(0)).unwrap();
        assert!(!render(&state).game.grid[1][1].highlighted);
        state.handle(Intent::ClickLog(0)).unwrap();
        push(&mut state, "updateGrid", three_by_three(true));
        assert!(!render(&state).game.grid[1][1].highlighted);
    }

    #[test]
    fn game_started_may_carry_the_grid() {
        let mut state = State::default();
        push(&mut state, "ensureLobby", json!(null));
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
        push(&mut state, "gameStarted", json!({ "grid": [[{}, {}], [{}, {}]] }));
        assert_eq!(state.game.grid.len(), 2);
        assert!(state.is_started());
    }

    #[test]
    fn game_started_may_be_the_bare_grid() {
        let mut state = State::default();
        push(&mut state, "ensureLobby", json!(null));
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
        push(&mut state, "gameStarted", json!([[{}, {}], [{}, { "dug": 1 }]]));
        assert!(state.is_started());
        assert_eq!(state.game.grid.len(), 2);
        assert_eq!(render(&state).game.grid[1][1].text, "1");
    }

    #[test]
    fn undecodable_game_setup_still_starts_the_game() {
        let mut state = State::default();
        push(&mut state, "ensureLobby", json!(null));
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
        push(&mut state, "gameStarted", json!(true));
        assert!(state.is_started());
        assert!(state.game.grid.is_empty());
        let view = render(&state);
        assert!(!view.start_visible);
        assert!(view.play_visible);
    }

    #[test]
    fn huge_stamina_is_capped() {
        let mut selector = BidSelector::default();
        selector.resize(u32::MAX);
        assert_eq!(selector.options().len(), MAX_STAMINA as usize + 1);
        assert_eq!(selector.options().last(), Some(&MAX_STAMINA));

        selector.resize(2);
        assert_eq!(selector.options(), &[0, 1, 2]);
    }

    #[test]
    fn bidders_render_with_local_marker() {
        let mut state = joined_as("Al", false);
        push(&mut state, "updateBids", bids(3, Some(1), true));
        let view = render(&state).game;
        assert_eq!(view.pot, 12);
        assert!(view.bidders[0].is_local && view.bidders[0].has_bid);
        assert!(!view.bidders[1].is_local && !view.bidders[1].has_bid);
        assert_eq!(view.whose_turn.as_deref(), Some("Al"));
    }
}
