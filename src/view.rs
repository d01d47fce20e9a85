//! Pure projection from [`ClientState`] to a view description.
//!
//! Every render rebuilds the whole description from the current snapshot;
//! nothing is cached between renders. Clickable elements carry the intent to
//! dispatch, keyed by board index or coordinates, so the click layer never
//! needs to look back at a previous render.

use crate::game::GameVariant;
use crate::protocol::CellRef;
use crate::state::{ClientState, SessionStatus};

/// One board cell or piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<I> {
    pub text: String,
    /// Style class, e.g. a palette color.
    pub style: &'static str,
    pub highlighted: bool,
    /// What a click dispatches. `None` means the cell is inert.
    pub action: Option<I>,
}

impl<I> Cell<I> {
    pub fn is_clickable(&self) -> bool {
        self.action.is_some()
    }
}

/// Whether a log highlight points at `(i, j)`.
pub fn is_highlighted(highlight: Option<CellRef>, i: usize, j: usize) -> bool {
    highlight == Some(CellRef { i, j })
}

/// A seated player's name in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLinkView {
    pub name: String,
    pub connected: bool,
    /// Disconnected seats can be clicked to reclaim.
    pub reclaimable: bool,
    /// Currently pre-filled into the join form.
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub name: String,
    /// The room is the join form's current target.
    pub selected: bool,
    pub players: Vec<SeatLinkView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFormView {
    pub room: String,
    pub name: String,
    pub spectate: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantView {
    pub name: String,
    pub connected: bool,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLineView {
    pub text: String,
    /// The line references a cell and can be clicked.
    pub link: bool,
    pub highlighted: bool,
}

/// Everything the view sink needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientView<V> {
    pub status: SessionStatus,
    pub room: Option<String>,
    pub error: Option<String>,
    /// `None` while the directory is hidden (no rooms).
    pub directory: Option<Vec<RoomView>>,
    pub join_form: JoinFormView,
    pub unseated: Vec<ParticipantView>,
    pub players: Vec<ParticipantView>,
    pub spectators: Vec<ParticipantView>,
    pub start_visible: bool,
    /// Play surfaces are shown once the game is running.
    pub play_visible: bool,
    pub undo_visible: bool,
    pub log: Vec<LogLineView>,
    pub game: V,
}

/// Render the whole client.
pub fn render<G: GameVariant>(state: &ClientState<G>) -> ClientView<G::View> {
    let form = &state.form;
    let directory = state.directory.is_visible().then(|| {
        state
            .directory
            .rooms()
            .iter()
            .map(|room| RoomView {
                name: room.name.clone(),
                selected: form.room == room.name,
                players: room
                    .players
                    .iter()
                    .map(|p| SeatLinkView {
                        name: p.name.clone(),
                        connected: p.connected,
                        reclaimable: !p.connected && form.enabled,
                        selected: form.room == room.name && form.name == p.name,
                    })
                    .collect(),
            })
            .collect()
    });

    let participants = |list: &[crate::protocol::Participant]| -> Vec<ParticipantView> {
        list.iter()
            .map(|p| ParticipantView {
                name: p.name.clone(),
                connected: p.connected,
                is_local: state.local_player() == Some(p.name.as_str()),
            })
            .collect()
    };

    let highlighted = state.log.highlighted_entry();
    let log = state
        .log
        .entries()
        .iter()
        .enumerate()
        .map(|(idx, entry)| LogLineView {
            text: entry.message().to_string(),
            link: entry.position().is_some(),
            highlighted: highlighted == Some(idx),
        })
        .collect();

    ClientView {
        status: state.status,
        room: state.session.room_name.clone(),
        error: state.error.clone(),
        directory,
        join_form: JoinFormView {
            room: form.room.clone(),
            name: form.name.clone(),
            spectate: form.spectate,
            enabled: form.enabled,
        },
        unseated: participants(&state.unseated),
        players: participants(&state.players),
        spectators: participants(&state.spectators),
        start_visible: state.status == SessionStatus::SeatedWaiting,
        play_visible: state.is_started(),
        undo_visible: state.log.undo_visible(state.is_spectating()),
        log,
        game: G::render(state),
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
    use crate::games::trace::Trace;
    use crate::protocol::Frame;
    use crate::state::{session_router, Intent};
    use serde_json::json;

    fn state_after(frames: &[(&str, serde_json::Value)]) -> ClientState<Trace> {
        let router = session_router::<Trace>();
        let mut state = ClientState::default();
        for (event, data) in frames {
            state.apply(&router, &Frame::new(*event, data.clone())).unwrap();
        }
        state
    }

    #[test]
    fn directory_hidden_when_empty() {
        let state = state_after(&[("ensureLobby", json!(null)), ("updateGames", json!([]))]);
        assert_eq!(render(&state).directory, None);
    }

    #[test]
    fn directory_render_mirrors_latest_push() {
        let state = state_after(&[
            ("ensureLobby", json!(null)),
            (
                "updateGames",
                json!([{ "name": "AB", "players": [] }, { "name": "CD", "players": [] }]),
            ),
            (
                "updateGames",
                json!([{ "name": "EF", "players": [{ "name": "Cy", "connected": false }] }]),
            ),
        ]);
        let rooms = render(&state).directory.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "EF");
        assert!(rooms[0].players[0].reclaimable);
    }

    #[test]
    fn seated_player_sees_start_and_join_form_disabled() {
        let state = state_after(&[
            ("ensureLobby", json!(null)),
            ("joinedGame", json!({ "gameName": "AB", "playerName": "Al", "spectating": false })),
            (
                "updatePlayers",
                json!([{ "name": "Al", "connected": true }, { "name": "Bo", "connected": false }]),
            ),
        ]);
        let view = render(&state);
        assert!(view.start_visible);
        assert!(!view.play_visible);
        assert!(!view.join_form.enabled);
        assert_eq!(view.room.as_deref(), Some("AB"));
        assert!(view.players[0].is_local);
        assert!(!view.players[1].is_local);
    }

    #[test]
    fn game_start_hides_start_and_reveals_play() {
        let state = state_after(&[
            ("ensureLobby", json!(null)),
            ("joinedGame", json!({ "gameName": "AB", "playerName": "Al", "spectating": false })),
            ("gameStarted", json!(null)),
        ]);
        let view = render(&state);
        assert!(!view.start_visible);
        assert!(view.play_visible);
    }

    #[test]
    fn undo_hidden_for_spectators() {
        let spectator = state_after(&[
            ("ensureLobby", json!(null)),
            ("joinedGame", json!({ "gameName": "AB", "playerName": "Sy", "spectating": true })),
            ("showUndo", json!(true)),
        ]);
        assert!(!render(&spectator).undo_visible);
        assert!(!render(&spectator).start_visible);

        let player = state_after(&[
            ("ensureLobby", json!(null)),
            ("joinedGame", json!({ "gameName": "AB", "playerName": "Al", "spectating": false })),
            ("showUndo", json!(true)),
        ]);
        assert!(render(&player).undo_visible);

        let hidden = state_after(&[
            ("ensureLobby", json!(null)),
            ("joinedGame", json!({ "gameName": "AB", "playerName": "Al", "spectating": false })),
            ("showUndo", json!(true)),
            ("showUndo", json!(false)),
        ]);
        assert!(!render(&hidden).undo_visible);
    }

    #[test]
    fn log_lines_show_links_and_highlight() {
        let mut state = state_after(&[
            ("ensureLobby", json!(null)),
            ("appendLog", json!("plain")),
            ("appendLog", json!({ "msg": "linked", "pos": { "i": 1, "j": 0 } })),
        ]);
        state.handle(Intent::ClickLog(1)).unwrap();
        let view = render(&state);
        assert_eq!(view.log.len(), 2);
        assert!(!view.log[0].link);
        assert!(view.log[1].link);
        assert!(view.log[1].highlighted);
    }

    #[test]
    fn error_is_rendered() {
        let state = state_after(&[("ensureLobby", json!(null)), ("errorMsg", json!("room full"))]);
        assert_eq!(render(&state).error.as_deref(), Some("room full"));
    }
}
