//! Client state and the shared session reducer.
//!
//! [`ClientState`] is the single owned snapshot of everything the client
//! knows. Pushes are applied through a [`SessionRouter`] built by
//! [`session_router`]; user interactions go through [`ClientState::handle`].
//! Both mutate the state they are handed and return the [`Effect`]s the
//! driver has to carry out, so every transition can be exercised without a
//! connection.
//!
//! ```text
//!  Disconnected ──ensureLobby──→ Lobby ──joinedGame──→ SeatedWaiting ─┐
//!                                  ↑                 └→ Spectating  ──┼─gameStarted─→ InGame
//!                                  └──────────── ensureLobby ─────────┘
//! ```

use std::time::Duration;

use tracing::{debug, warn};

use crate::channel::Router;
use crate::error::Result;
use crate::game::GameVariant;
use crate::lobby::{JoinForm, LobbyDirectory};
use crate::log::ActionLog;
use crate::protocol::{
    events, Frame, JoinedGame, LogEntry, Participant, RoomSummary, SessionRequest,
};
use crate::resume::{NavEntry, ResumeToken};

/// Default delay before an automatic bid is submitted.
pub const DEFAULT_AUTOBID_DELAY: Duration = Duration::from_millis(500);

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No open connection, or no `ensureLobby` seen yet.
    #[default]
    Disconnected,
    /// Browsing the lobby.
    Lobby,
    /// Seated in a room whose game has not started.
    SeatedWaiting,
    /// Watching a room whose game has not started.
    Spectating,
    /// The room's game is running.
    InGame,
}

/// Who the local user is, once a join is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub room_name: Option<String>,
    pub player_name: Option<String>,
    pub spectating: bool,
}

/// Something the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<I> {
    /// Overwrite the join form's raw values.
    EditJoinForm {
        room: String,
        name: String,
        spectate: bool,
    },
    /// Submit the join form.
    SubmitJoin,
    /// A room name in the directory was clicked.
    ClickRoom(String),
    /// A seated player's name in the directory was clicked.
    ClickSeat { room: String, player: String },
    /// The start control was clicked.
    StartGame,
    /// The undo control was clicked.
    Undo,
    /// A log line was clicked.
    ClickLog(usize),
    /// The user navigated back/forward onto this entry.
    Navigate(Option<NavEntry>),
    /// A game-specific interaction.
    Game(I),
}

/// Work the driver must carry out after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<I> {
    /// Send a request frame.
    Send(Frame),
    /// Push a navigation entry for a confirmed join.
    SaveResume(ResumeToken),
    /// Replace the current navigation entry with the lobby sentinel.
    MarkLobby,
    /// Close and reopen the channel.
    ResetChannel,
    /// Feed `intent` back in after `delay`.
    Schedule { delay: Duration, intent: I },
    /// Scroll the newest log line into view.
    ScrollLog,
}

/// Effects produced by one transition.
pub type Effects<I> = Vec<Effect<I>>;

/// Router over the client state of game `G`.
pub type SessionRouter<G> =
    Router<ClientState<G>, Effects<<G as GameVariant>::Intent>>;

/// Build an [`Effect::Send`] from a request enum.
///
/// # Errors
///
/// Returns [`crate::ClientError::Serialization`] if the request does not encode.
pub fn send<M: serde::Serialize, I>(request: &M) -> Result<Effect<I>> {
    Ok(Effect::Send(Frame::encode(request)?))
}

// ── State ───────────────────────────────────────────────────────────

/// Everything the client knows, owned in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState<G: GameVariant> {
    pub status: SessionStatus,
    pub session: Session,
    pub form: JoinForm,
    pub directory: LobbyDirectory,
    pub unseated: Vec<Participant>,
    pub players: Vec<Participant>,
    pub spectators: Vec<Participant>,
    pub log: ActionLog,
    /// The most recent server error; cleared by routine state pushes.
    pub error: Option<String>,
    /// Mirror of the navigation entry the session believes is current.
    pub nav: Option<NavEntry>,
    /// Delay before automatic actions (autobid) fire.
    pub autobid_delay: Duration,
    pub game: G::State,
}

impl<G: GameVariant> Default for ClientState<G> {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOBID_DELAY)
    }
}

impl<G: GameVariant> ClientState<G> {
    pub fn new(autobid_delay: Duration) -> Self {
        Self {
            status: SessionStatus::Disconnected,
            session: Session::default(),
            form: JoinForm::default(),
            directory: LobbyDirectory::default(),
            unseated: Vec::new(),
            players: Vec::new(),
            spectators: Vec::new(),
            log: ActionLog::default(),
            error: None,
            nav: None,
            autobid_delay,
            game: G::State::default(),
        }
    }

    /// Name of the local player, once joined.
    pub fn local_player(&self) -> Option<&str> {
        self.session.player_name.as_deref()
    }

    pub fn is_spectating(&self) -> bool {
        self.session.spectating
    }

    /// Joined with a seat (not as a spectator).
    pub fn is_seated(&self) -> bool {
        self.session.player_name.is_some() && !self.session.spectating
    }

    pub fn is_started(&self) -> bool {
        self.status == SessionStatus::InGame
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Apply one push. Unknown events are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::InvalidPayload`] when the payload does not
    /// decode; the state is left as it was.
    pub fn apply(
        &mut self,
        router: &SessionRouter<G>,
        frame: &Frame,
    ) -> Result<Effects<G::Intent>> {
        match router.dispatch(self, frame) {
            Some(result) => result,
            None => {
                warn!(event = %frame.event, "no handler for push, ignoring");
                Ok(Vec::new())
            }
        }
    }

    /// The connection went away.
    pub fn disconnect(&mut self) {
        self.status = SessionStatus::Disconnected;
    }

    /// Apply one user intent.
    ///
    /// Intents that gating rejects are logged at debug level and produce no
    /// effects; they are not errors.
    ///
    /// # Errors
    ///
    /// Returns an error only if a request fails to encode.
    pub fn handle(&mut self, intent: Intent<G::Intent>) -> Result<Effects<G::Intent>> {
        match intent {
            Intent::EditJoinForm {
                room,
                name,
                spectate,
            } => {
                if self.form.enabled {
                    self.form.room = room;
                    self.form.name = name;
                    self.form.spectate = spectate;
                }
                Ok(Vec::new())
            }
            Intent::SubmitJoin => {
                if !self.form.enabled {
                    debug!("join form disabled, ignoring submit");
                    return Ok(Vec::new());
                }
                let (room, name) = self.form.sanitized();
                self.form.room.clone_from(&room);
                self.form.name.clone_from(&name);
                Ok(vec![send(&SessionRequest::JoinRequest {
                    game_name: room,
                    player_name: name,
                    spectate: self.form.spectate,
                })?])
            }
            Intent::ClickRoom(room) => {
                if self.form.enabled {
                    self.form.toggle_room(&room);
                }
                Ok(Vec::new())
            }
            Intent::ClickSeat { room, player } => {
                if self.form.enabled && self.directory.is_reclaimable(&room, &player) {
                    self.form.toggle_reclaim(&room, &player);
                }
                Ok(Vec::new())
            }
            Intent::StartGame => {
                if self.status != SessionStatus::SeatedWaiting {
                    debug!(status = ?self.status, "start not available");
                    return Ok(Vec::new());
                }
                Ok(vec![send(&SessionRequest::StartGame)?])
            }
            Intent::Undo => {
                if !self.log.undo_visible(self.session.spectating) {
                    debug!("undo not offered");
                    return Ok(Vec::new());
                }
                Ok(vec![send(&SessionRequest::UndoRequest)?])
            }
            Intent::ClickLog(index) => {
                self.log.toggle_highlight(index);
                Ok(Vec::new())
            }
            Intent::Navigate(entry) => {
                self.nav.clone_from(&entry);
                match entry {
                    Some(NavEntry::Game(token)) => Ok(vec![send(&SessionRequest::JoinRequest {
                        game_name: token.game_name,
                        player_name: token.player_name,
                        spectate: token.spectating,
                    })?]),
                    Some(NavEntry::Lobby) | None => Ok(vec![Effect::ResetChannel]),
                }
            }
            Intent::Game(intent) => G::handle_intent(self, intent),
        }
    }
}

// ── Session handlers ────────────────────────────────────────────────

/// Router with the session handlers plus those of game `G`.
pub fn session_router<G: GameVariant>() -> SessionRouter<G> {
    let mut router = Router::new();
    router.on_receive(events::ENSURE_LOBBY, on_ensure_lobby::<G>);
    router.on_receive(events::UPDATE_GAMES, on_update_games::<G>);
    router.on_receive(events::UPDATE_UNSEATED, on_update_unseated::<G>);
    router.on_receive(events::UPDATE_PLAYERS, on_update_players::<G>);
    router.on_receive(events::UPDATE_SPECTATORS, on_update_spectators::<G>);
    router.on_receive(events::JOINED_GAME, on_joined_game::<G>);
    router.on_receive(events::GAME_STARTED, on_game_started::<G>);
    router.on_receive(events::APPEND_LOG, on_append_log::<G>);
    router.on_receive(events::REMOVE_LOG, on_remove_log::<G>);
    router.on_receive(events::SHOW_UNDO, on_show_undo::<G>);
    router.on_receive(events::ERROR_MSG, on_error_msg::<G>);
    G::register(&mut router);
    router
}

fn on_ensure_lobby<G: GameVariant>(
    state: &mut ClientState<G>,
    _frame: &Frame,
) -> Result<Effects<G::Intent>> {
    state.status = SessionStatus::Lobby;
    state.session = Session::default();
    state.form.enabled = true;
    state.unseated.clear();
    state.players.clear();
    state.spectators.clear();
    state.log = ActionLog::default();
    state.error = None;
    state.game = G::State::default();
    state.nav = Some(NavEntry::Lobby);
    debug!("state: lobby");
    Ok(vec![Effect::MarkLobby])
}

fn on_update_games<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    let rooms: Vec<RoomSummary> = frame.payload()?;
    state.directory.replace(rooms);
    Ok(Vec::new())
}

fn on_update_unseated<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    state.unseated = frame.payload()?;
    state.clear_error();
    Ok(Vec::new())
}

fn on_update_players<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    state.players = frame.payload()?;
    state.clear_error();
    Ok(Vec::new())
}

fn on_update_spectators<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    state.spectators = frame.payload()?;
    state.clear_error();
    Ok(Vec::new())
}

fn on_joined_game<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    let joined: JoinedGame = frame.payload()?;
    debug!(
        room = %joined.game_name,
        player = %joined.player_name,
        spectating = joined.spectating,
        "state: joined"
    );

    state.status = if joined.spectating {
        SessionStatus::Spectating
    } else {
        SessionStatus::SeatedWaiting
    };
    state.form.room.clone_from(&joined.game_name);
    state.form.name.clone_from(&joined.player_name);
    state.form.spectate = joined.spectating;
    state.form.enabled = false;
    state.clear_error();

    let token = ResumeToken {
        game_name: joined.game_name.clone(),
        player_name: joined.player_name.clone(),
        spectating: joined.spectating,
    };
    state.session = Session {
        room_name: Some(joined.game_name),
        player_name: Some(joined.player_name),
        spectating: joined.spectating,
    };

    if state.nav == Some(NavEntry::Lobby) {
        state.nav = Some(NavEntry::Game(token.clone()));
        Ok(vec![Effect::SaveResume(token)])
    } else {
        Ok(Vec::new())
    }
}

fn on_game_started<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    state.status = SessionStatus::InGame;
    state.clear_error();
    debug!("state: in game");

    // Variant setup is optional.
    match G::on_game_started(state, frame) {
        Ok(effects) => Ok(effects),
        Err(e) => {
            warn!(game = G::NAME, "ignoring game setup in gameStarted: {e}");
            Ok(Vec::new())
        }
    }
}

fn on_append_log<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    let entry: LogEntry = frame.payload()?;
    state.log.append(entry);
    state.clear_error();
    Ok(vec![Effect::ScrollLog])
}

fn on_remove_log<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    let n: usize = frame.payload()?;
    state.log.remove_last(n);
    state.clear_error();
    Ok(Vec::new())
}

fn on_show_undo<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    let offered: bool = frame.payload()?;
    state.log.set_undo_offered(offered);
    Ok(Vec::new())
}

fn on_error_msg<G: GameVariant>(
    state: &mut ClientState<G>,
    frame: &Frame,
) -> Result<Effects<G::Intent>> {
    let message: String = frame.payload()?;
    debug!(%message, "server reported error");
    state.error = Some(message);
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
    use crate::games::trace::Trace;
    use serde_json::json;

    type State = ClientState<Trace>;

    fn push(
        state: &mut State,
        event: &str,
        data: serde_json::Value,
    ) -> Effects<<Trace as GameVariant>::Intent> {
        let router = session_router::<Trace>();
        state.apply(&router, &Frame::new(event, data)).unwrap()
    }

    fn in_lobby() -> State {
        let mut state = State::default();
        let effects = push(&mut state, "ensureLobby", json!(null));
        assert_eq!(effects, vec![Effect::MarkLobby]);
        state
    }

    fn joined(spectating: bool) -> State {
        let mut state = in_lobby();
        push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": spectating }),
        );
        state
    }

    fn sent(effects: &[Effect<<Trace as GameVariant>::Intent>]) -> Vec<Frame> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn starts_disconnected() {
        let state = State::default();
        assert_eq!(state.status, SessionStatus::Disconnected);
        assert!(state.form.enabled);
    }

    #[test]
    fn submit_join_sends_sanitized_values() {
        let mut state = in_lobby();
        state
            .handle(Intent::EditJoinForm {
                room: "a1b2c".into(),
                name: "A l!".into(),
                spectate: false,
            })
            .unwrap();
        let effects = state.handle(Intent::SubmitJoin).unwrap();
        assert_eq!(
            sent(&effects),
            vec![Frame::new(
                "joinRequest",
                json!({ "gameName": "AB", "playerName": "Al", "spectate": false })
            )]
        );
    }

    #[test]
    fn joined_game_disables_form_and_saves_resume_entry() {
        let mut state = in_lobby();
        let effects = push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
        let token = ResumeToken {
            game_name: "AB".into(),
            player_name: "Al".into(),
            spectating: false,
        };
        assert_eq!(effects, vec![Effect::SaveResume(token.clone())]);
        assert_eq!(token.title(), "Game AB");
        assert_eq!(state.status, SessionStatus::SeatedWaiting);
        assert!(!state.form.enabled);
        assert_eq!(state.local_player(), Some("Al"));

        // Submitting again is ignored while the form is disabled.
        assert!(state.handle(Intent::SubmitJoin).unwrap().is_empty());
    }

    #[test]
    fn rejoin_from_game_entry_does_not_push_again() {
        let mut state = joined(false);
        let effects = push(
            &mut state,
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn spectator_join_enters_spectating() {
        let state = joined(true);
        assert_eq!(state.status, SessionStatus::Spectating);
        assert!(state.is_spectating());
        assert!(!state.is_seated());
    }

    #[test]
    fn game_started_enters_in_game() {
        let mut state = joined(false);
        push(&mut state, "gameStarted", json!(null));
        assert_eq!(state.status, SessionStatus::InGame);
        assert!(state.is_started());
    }

    #[test]
    fn start_only_from_seated_waiting() {
        let mut state = joined(true);
        assert!(state.handle(Intent::StartGame).unwrap().is_empty());

        let mut state = joined(false);
        let effects = state.handle(Intent::StartGame).unwrap();
        assert_eq!(sent(&effects), vec![Frame::new("startGame", json!(null))]);
    }

    #[test]
    fn error_is_cleared_by_next_state_push_only() {
        let mut state = joined(false);
        push(&mut state, "errorMsg", json!("not your turn"));
        assert_eq!(state.error.as_deref(), Some("not your turn"));

        push(&mut state, "errorMsg", json!("room full"));
        assert_eq!(state.error.as_deref(), Some("room full"));

        push(&mut state, "showUndo", json!(true));
        assert_eq!(state.error.as_deref(), Some("room full"));

        push(&mut state, "appendLog", json!("Al moved"));
        assert_eq!(state.error, None);
    }

    #[test]
    fn ensure_lobby_resets_game_view_but_keeps_directory() {
        let mut state = joined(false);
        push(&mut state, "updateGames", json!([{ "name": "AB", "players": [] }]));
        push(&mut state, "appendLog", json!("hello"));
        push(&mut state, "showUndo", json!(true));
        push(&mut state, "updatePlayers", json!([{ "name": "Al", "connected": true }]));
        push(&mut state, "updateBoard", json!(["A", "B"]));
        push(&mut state, "errorMsg", json!("oops"));

        let effects = push(&mut state, "ensureLobby", json!(null));
        assert_eq!(effects, vec![Effect::MarkLobby]);
        assert_eq!(state.status, SessionStatus::Lobby);
        assert!(state.log.is_empty());
        assert!(!state.log.undo_visible(false));
        assert!(state.players.is_empty());
        assert!(state.game.letters.is_empty());
        assert_eq!(state.error, None);
        assert_eq!(state.session, Session::default());
        assert!(state.form.enabled);
        assert_eq!(state.directory.rooms().len(), 1);
        assert_eq!(state.nav, Some(NavEntry::Lobby));
    }

    #[test]
    fn append_log_scrolls_and_remove_log_truncates() {
        let mut state = joined(false);
        for k in 0..4 {
            let effects = push(&mut state, "appendLog", json!(format!("line {k}")));
            assert_eq!(effects, vec![Effect::ScrollLog]);
        }
        push(&mut state, "removeLog", json!(2));
        push(&mut state, "appendLog", json!({ "msg": "dug", "pos": { "i": 0, "j": 0 } }));
        assert_eq!(state.log.len(), 4 - 2 + 1);
        push(&mut state, "removeLog", json!(3));
        assert!(state.log.is_empty());
    }

    #[test]
    fn undo_gated_by_visibility() {
        let mut state = joined(false);
        assert!(state.handle(Intent::Undo).unwrap().is_empty());
        push(&mut state, "showUndo", json!(true));
        let effects = state.handle(Intent::Undo).unwrap();
        assert_eq!(sent(&effects), vec![Frame::new("undoRequest", json!(null))]);

        let mut spectator = joined(true);
        push(&mut spectator, "showUndo", json!(true));
        assert!(spectator.handle(Intent::Undo).unwrap().is_empty());
    }

    #[test]
    fn navigating_to_lobby_resets_channel() {
        let mut state = joined(false);
        let effects = state.handle(Intent::Navigate(Some(NavEntry::Lobby))).unwrap();
        assert_eq!(effects, vec![Effect::ResetChannel]);
        assert_eq!(state.nav, Some(NavEntry::Lobby));
    }

    #[test]
    fn navigating_to_game_rejoins_with_token() {
        let mut state = in_lobby();
        let token = ResumeToken {
            game_name: "CD".into(),
            player_name: "Bo".into(),
            spectating: true,
        };
        let effects = state
            .handle(Intent::Navigate(Some(NavEntry::Game(token))))
            .unwrap();
        assert_eq!(
            sent(&effects),
            vec![Frame::new(
                "joinRequest",
                json!({ "gameName": "CD", "playerName": "Bo", "spectate": true })
            )]
        );
    }

    #[test]
    fn directory_clicks_prefill_the_form() {
        let mut state = in_lobby();
        push(
            &mut state,
            "updateGames",
            json!([{ "name": "AB", "players": [
                { "name": "Al", "connected": true },
                { "name": "Bo", "connected": false }
            ] }]),
        );

        state.handle(Intent::ClickRoom("AB".into())).unwrap();
        assert_eq!(state.form.room, "AB");
        state.handle(Intent::ClickRoom("AB".into())).unwrap();
        assert_eq!(state.form.room, "");

        // Connected seats cannot be reclaimed.
        state
            .handle(Intent::ClickSeat { room: "AB".into(), player: "Al".into() })
            .unwrap();
        assert_eq!(state.form.name, "");

        state
            .handle(Intent::ClickSeat { room: "AB".into(), player: "Bo".into() })
            .unwrap();
        assert_eq!((state.form.room.as_str(), state.form.name.as_str()), ("AB", "Bo"));
        state
            .handle(Intent::ClickSeat { room: "AB".into(), player: "Bo".into() })
            .unwrap();
        assert_eq!((state.form.room.as_str(), state.form.name.as_str()), ("", ""));
    }

    #[test]
    fn bad_payload_is_an_error_and_leaves_state() {
        let mut state = joined(false);
        let router = session_router::<Trace>();
        let before = state.clone();
        let result = state.apply(&router, &Frame::new("removeLog", json!("many")));
        assert!(result.is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_event_is_ignored() {
        let mut state = joined(false);
        let effects = push(&mut state, "updateWeather", json!({ "rain": true }));
        assert!(effects.is_empty());
    }

    #[test]
    fn disconnect_moves_to_disconnected() {
        let mut state = joined(false);
        state.disconnect();
        assert_eq!(state.status, SessionStatus::Disconnected);
    }
}
