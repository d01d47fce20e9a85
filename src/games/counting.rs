//! Counting game: four shared counters and a reward range negotiated before
//! the start.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::game::GameVariant;
use crate::protocol::Frame;
use crate::state::{send, ClientState, Effects, SessionRouter, SessionStatus};
use crate::view::{is_highlighted, Cell};

pub mod events {
    pub const UPDATE_BOARD: &str = "updateBoard";
    pub const UPDATE_MIN_REWARD: &str = "updateMinReward";
    pub const UPDATE_MAX_REWARD: &str = "updateMaxReward";
}

/// The board always has this many counters.
pub const COUNTER_SLOTS: usize = 4;

pub const COUNTER_STYLE: &str = "counter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CountingRequest {
    #[serde(rename = "setMinReward")]
    SetMinReward { number: i64 },
    #[serde(rename = "setMaxReward")]
    SetMaxReward { number: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountingState {
    /// `None` until the first board push.
    pub counters: Option<[i64; COUNTER_SLOTS]>,
    pub min_reward: Option<i64>,
    pub max_reward: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingIntent {
    SetMinReward(i64),
    SetMaxReward(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountingView {
    pub counters: Vec<Cell<CountingIntent>>,
    pub min_reward: Option<i64>,
    pub max_reward: Option<i64>,
    /// The reward inputs accept edits.
    pub rewards_editable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counting;

/// Rewards can be set by seated players until the game starts.
fn rewards_editable(state: &ClientState<Counting>) -> bool {
    state.status == SessionStatus::SeatedWaiting
}

impl GameVariant for Counting {
    const NAME: &'static str = "Counting";

    type State = CountingState;
    type Intent = CountingIntent;
    type View = CountingView;

    fn register(router: &mut SessionRouter<Self>) {
        router.on_receive(events::UPDATE_BOARD, on_update_board);
        router.on_receive(events::UPDATE_MIN_REWARD, on_update_min_reward);
        router.on_receive(events::UPDATE_MAX_REWARD, on_update_max_reward);
    }

    fn handle_intent(
        state: &mut ClientState<Self>,
        intent: CountingIntent,
    ) -> Result<Effects<CountingIntent>> {
        if !rewards_editable(state) {
            debug!(?intent, status = ?state.status, "rewards are locked");
            return Ok(Vec::new());
        }
        let request = match intent {
            CountingIntent::SetMinReward(number) => CountingRequest::SetMinReward { number },
            CountingIntent::SetMaxReward(number) => CountingRequest::SetMaxReward { number },
        };
        Ok(vec![send(&request)?])
    }

    fn render(state: &ClientState<Self>) -> CountingView {
        let highlight = state.log.highlighted_cell();
        let counters = state
            .game
            .counters
            .map(|counters| {
                counters
                    .iter()
                    .enumerate()
                    .map(|(idx, value)| Cell {
                        text: value.to_string(),
                        style: COUNTER_STYLE,
                        highlighted: is_highlighted(highlight, idx, 0),
                        action: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        CountingView {
            counters,
            min_reward: state.game.min_reward,
            max_reward: state.game.max_reward,
            rewards_editable: rewards_editable(state),
        }
    }
}

fn on_update_board(
    state: &mut ClientState<Counting>,
    frame: &Frame,
) -> Result<Effects<CountingIntent>> {
    let values: Vec<i64> = frame.payload()?;
    let counters: [i64; COUNTER_SLOTS] = values.try_into().map_err(|values: Vec<i64>| {
        ClientError::invalid_payload(
            &frame.event,
            format!("expected {COUNTER_SLOTS} counters, got {}", values.len()),
        )
    })?;
    state.game.counters = Some(counters);
    state.log.clear_highlight();
    state.clear_error();
    Ok(Vec::new())
}

fn on_update_min_reward(
    state: &mut ClientState<Counting>,
    frame: &Frame,
) -> Result<Effects<CountingIntent>> {
    state.game.min_reward = Some(frame.payload()?);
    Ok(Vec::new())
}

fn on_update_max_reward(
    state: &mut ClientState<Counting>,
    frame: &Frame,
) -> Result<Effects<CountingIntent>> {
    state.game.max_reward = Some(frame.payload()?);
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

    type State = ClientState<Counting>;

    fn push(state: &mut State, event: &str, data: Value) -> Result<Effects<CountingIntent>> {
        let router = session_router::<Counting>();
        state.apply(&router, &Frame::new(event, data))
    }

    fn joined(spectating: bool) -> State {
        let mut state = State::default();
        push(&mut state, "ensureLobby", json!(null)).unwrap();
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": spectating }),
        )
        .unwrap();
        state
    }

    #[test]
    fn board_needs_exactly_four_counters() {
        let mut state = joined(false);
        push(&mut state, "updateBoard", json!([3, 0, 7, 1])).unwrap();
        let view = render(&state).game;
        let texts: Vec<&str> = view.counters.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["3", "0", "7", "1"]);
        assert!(view.counters.iter().all(|c| !c.is_clickable()));

        let before = state.clone();
        let err = push(&mut state, "updateBoard", json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload { .. }), "got {err:?}");
        assert_eq!(state, before);
    }

    #[test]
    fn rewards_mirror_pushes() {
        let mut state = joined(false);
        push(&mut state, "updateMinReward", json!(2)).unwrap();
        push(&mut state, "updateMaxReward", json!(9)).unwrap();
        let view = render(&state).game;
        assert_eq!((view.min_reward, view.max_reward), (Some(2), Some(9)));
    }

    #[test]
    fn reward_requests_only_before_start_for_seated_players() {
        let mut state = joined(false);
        assert!(render(&state).game.rewards_editable);
        let effects = state
            .handle(Intent::Game(CountingIntent::SetMaxReward(5)))
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::Send(Frame::new("setMaxReward", json!({ "number": 5 })))]
        );

        push(&mut state, "gameStarted", json!(null)).unwrap();
        assert!(!render(&state).game.rewards_editable);
        assert!(state
            .handle(Intent::Game(CountingIntent::SetMinReward(1)))
            .unwrap()
            .is_empty());

        let mut spectator = joined(true);
        assert!(spectator
            .handle(Intent::Game(CountingIntent::SetMinReward(1)))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn empty_before_first_board() {
        let state = joined(false);
        assert!(render(&state).game.counters.is_empty());
    }
}
