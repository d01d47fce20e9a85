//! Lobby directory view-model and the join form it pre-fills.

use crate::protocol::RoomSummary;

/// Maximum length of a room code.
pub const ROOM_CODE_LEN: usize = 2;

/// Normalize user input into a room code: uppercase, `A`–`Z` only, at most
/// [`ROOM_CODE_LEN`] characters.
pub fn normalize_room_code(input: &str) -> String {
    input
        .to_uppercase()
        .chars()
        .filter(char::is_ascii_uppercase)
        .take(ROOM_CODE_LEN)
        .collect()
}

/// Strip everything but word characters (`A`–`Z`, `a`–`z`, `0`–`9`, `_`).
pub fn sanitize_player_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

// ── Join form ───────────────────────────────────────────────────────

/// Values typed into the join form, kept raw until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinForm {
    pub room: String,
    pub name: String,
    pub spectate: bool,
    /// Cleared once a join is confirmed, restored by `ensureLobby`.
    pub enabled: bool,
}

impl Default for JoinForm {
    fn default() -> Self {
        Self {
            room: String::new(),
            name: String::new(),
            spectate: false,
            enabled: true,
        }
    }
}

impl JoinForm {
    /// Toggle the room field: set it to `room`, or clear it when it already
    /// holds that room.
    pub fn toggle_room(&mut self, room: &str) {
        if self.room == room {
            self.room.clear();
        } else {
            self.room = room.to_string();
        }
    }

    /// Toggle pre-filling both fields with a seat to reclaim.
    pub fn toggle_reclaim(&mut self, room: &str, player: &str) {
        if self.room == room && self.name == player {
            self.room.clear();
            self.name.clear();
        } else {
            self.room = room.to_string();
            self.name = player.to_string();
        }
    }

    /// Sanitized `(room code, player name)` as they go on the wire.
    pub fn sanitized(&self) -> (String, String) {
        (
            normalize_room_code(&self.room),
            sanitize_player_name(&self.name),
        )
    }
}

// ── Directory ───────────────────────────────────────────────────────

/// The rooms known to the lobby, as of the latest `updateGames` push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyDirectory {
    rooms: Vec<RoomSummary>,
}

impl LobbyDirectory {
    /// Replace the whole directory with a new push.
    pub fn replace(&mut self, rooms: Vec<RoomSummary>) {
        self.rooms = rooms;
    }

    pub fn rooms(&self) -> &[RoomSummary] {
        &self.rooms
    }

    /// The directory is hidden entirely when empty.
    pub fn is_visible(&self) -> bool {
        !self.rooms.is_empty()
    }

    /// Whether `player` holds a seat in `room` and is currently disconnected,
    /// i.e. whether their seat may be reclaimed.
    pub fn is_reclaimable(&self, room: &str, player: &str) -> bool {
        self.rooms
            .iter()
            .filter(|r| r.name == room)
            .flat_map(|r| r.players.iter())
            .any(|p| p.name == player && !p.connected)
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
    use crate::protocol::Participant;

    fn room(name: &str, players: &[(&str, bool)]) -> RoomSummary {
        RoomSummary {
            name: name.into(),
            players: players
                .iter()
                .map(|(n, c)| Participant {
                    name: (*n).into(),
                    connected: *c,
                })
                .collect(),
        }
    }

    #[test]
    fn room_code_is_uppercased_filtered_and_truncated() {
        assert_eq!(normalize_room_code("ab"), "AB");
        assert_eq!(normalize_room_code("a1b2c"), "AB");
        assert_eq!(normalize_room_code(" x-y "), "XY");
        assert_eq!(normalize_room_code("q"), "Q");
        assert_eq!(normalize_room_code("12"), "");
        assert_eq!(normalize_room_code("zzz"), "ZZ");
    }

    #[test]
    fn player_name_keeps_only_word_characters() {
        assert_eq!(sanitize_player_name("Al"), "Al");
        assert_eq!(sanitize_player_name("A l!"), "Al");
        assert_eq!(sanitize_player_name("snake_case_9"), "snake_case_9");
        assert_eq!(sanitize_player_name("<b>é</b>"), "bb");
    }

    #[test]
    fn clicking_a_room_toggles_the_field() {
        let mut form = JoinForm::default();
        form.toggle_room("AB");
        assert_eq!(form.room, "AB");
        form.toggle_room("CD");
        assert_eq!(form.room, "CD");
        form.toggle_room("CD");
        assert_eq!(form.room, "");
    }

    #[test]
    fn reclaim_toggles_both_fields() {
        let mut form = JoinForm::default();
        form.toggle_reclaim("AB", "Al");
        assert_eq!((form.room.as_str(), form.name.as_str()), ("AB", "Al"));
        form.toggle_reclaim("AB", "Bo");
        assert_eq!((form.room.as_str(), form.name.as_str()), ("AB", "Bo"));
        form.toggle_reclaim("AB", "Bo");
        assert_eq!((form.room.as_str(), form.name.as_str()), ("", ""));
    }

    #[test]
    fn directory_mirrors_latest_push() {
        let mut dir = LobbyDirectory::default();
        assert!(!dir.is_visible());

        dir.replace(vec![room("AB", &[("Al", true)]), room("CD", &[])]);
        assert_eq!(dir.rooms().len(), 2);

        dir.replace(vec![room("EF", &[("Cy", false)])]);
        assert_eq!(dir.rooms(), &[room("EF", &[("Cy", false)])]);

        dir.replace(vec![]);
        assert!(!dir.is_visible());
    }

    #[test]
    fn only_disconnected_seats_are_reclaimable() {
        let mut dir = LobbyDirectory::default();
        dir.replace(vec![room("AB", &[("Al", true), ("Bo", false)])]);
        assert!(dir.is_reclaimable("AB", "Bo"));
        assert!(!dir.is_reclaimable("AB", "Al"));
        assert!(!dir.is_reclaimable("CD", "Bo"));
    }
}
