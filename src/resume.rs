//! Resume tokens and the navigation store that holds them.
//!
//! The session pushes a [`ResumeToken`] when a join is first confirmed and
//! marks the lobby with a sentinel entry whenever it returns there. Moving
//! back and forth between those entries (browser history, a "back" button in a
//! native shell, ...) is reported through [`ResumeStore::on_change`] and drives
//! either a channel reset or a re-join.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Literal stored for the lobby entry.
pub const LOBBY_SENTINEL: &str = "lobby";

/// The `{room, player, spectating}` tuple that re-establishes a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeToken {
    pub game_name: String,
    pub player_name: String,
    pub spectating: bool,
}

impl ResumeToken {
    /// Title the entry is stored under, e.g. `Game AB`.
    pub fn title(&self) -> String {
        format!("Game {}", self.game_name)
    }
}

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEntry {
    /// The lobby sentinel.
    Lobby,
    /// A joined game.
    Game(ResumeToken),
}

impl NavEntry {
    pub fn title(&self) -> String {
        match self {
            Self::Lobby => LOBBY_SENTINEL.to_string(),
            Self::Game(token) => token.title(),
        }
    }
}

/// Navigation storage, abstracted away from any particular history API.
pub trait ResumeStore: Send + 'static {
    /// Push a new entry for a joined game.
    fn save(&mut self, token: ResumeToken);

    /// Replace the current entry with the lobby sentinel.
    fn mark_lobby(&mut self);

    /// The current entry; `None` before anything was stored.
    fn current(&self) -> Option<NavEntry>;

    /// Subscribe to user-driven navigation (back/forward). Entries written by
    /// [`save`](Self::save) or [`mark_lobby`](Self::mark_lobby) do not notify.
    fn on_change(&self) -> watch::Receiver<Option<NavEntry>>;
}

// ── In-memory history ───────────────────────────────────────────────

#[derive(Debug, Default)]
struct History {
    entries: Vec<NavEntry>,
    cursor: usize,
}

impl History {
    fn current(&self) -> Option<NavEntry> {
        self.entries.get(self.cursor).cloned()
    }
}

/// A browser-style history stack kept in memory.
///
/// Clones share the same history, so a UI shell can keep one clone to drive
/// [`back`](Self::back)/[`forward`](Self::forward) while the session owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryResumeStore {
    history: Arc<Mutex<History>>,
    changes: Arc<watch::Sender<Option<NavEntry>>>,
}

impl Default for MemoryResumeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            history: Arc::new(Mutex::new(History::default())),
            changes: Arc::new(changes),
        }
    }

    fn with_history<R>(&self, f: impl FnOnce(&mut History) -> R) -> R {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut history)
    }

    /// Step back one entry. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        let moved = self.with_history(|h| {
            if h.cursor == 0 || h.entries.is_empty() {
                return None;
            }
            h.cursor -= 1;
            Some(h.current())
        });
        self.notify(moved)
    }

    /// Step forward one entry. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        let moved = self.with_history(|h| {
            if h.cursor + 1 >= h.entries.len() {
                return None;
            }
            h.cursor += 1;
            Some(h.current())
        });
        self.notify(moved)
    }

    /// Every stored entry's title, oldest first.
    pub fn titles(&self) -> Vec<String> {
        self.with_history(|h| h.entries.iter().map(NavEntry::title).collect())
    }

    fn notify(&self, moved: Option<Option<NavEntry>>) -> bool {
        match moved {
            Some(entry) => {
                self.changes.send_replace(entry);
                true
            }
            None => false,
        }
    }
}

impl ResumeStore for MemoryResumeStore {
    fn save(&mut self, token: ResumeToken) {
        self.with_history(|h| {
            // Pushing drops any forward entries, as browsers do.
            if !h.entries.is_empty() {
                h.entries.truncate(h.cursor + 1);
            }
            h.entries.push(NavEntry::Game(token));
            h.cursor = h.entries.len() - 1;
        });
    }

    fn mark_lobby(&mut self) {
        self.with_history(|h| match h.entries.get_mut(h.cursor) {
            Some(entry) => *entry = NavEntry::Lobby,
            None => {
                h.entries.push(NavEntry::Lobby);
                h.cursor = h.entries.len() - 1;
            }
        });
    }

    fn current(&self) -> Option<NavEntry> {
        self.with_history(|h| h.current())
    }

    fn on_change(&self) -> watch::Receiver<Option<NavEntry>> {
        self.changes.subscribe()
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

    fn token(room: &str) -> ResumeToken {
        ResumeToken {
            game_name: room.into(),
            player_name: "Al".into(),
            spectating: false,
        }
    }

    #[test]
    fn empty_store_has_no_current_entry() {
        let store = MemoryResumeStore::new();
        assert_eq!(store.current(), None);
        assert!(!store.back());
        assert!(!store.forward());
    }

    #[test]
    fn mark_lobby_replaces_instead_of_pushing() {
        let mut store = MemoryResumeStore::new();
        store.mark_lobby();
        store.mark_lobby();
        assert_eq!(store.titles(), vec!["lobby"]);
        assert_eq!(store.current(), Some(NavEntry::Lobby));
    }

    #[test]
    fn save_pushes_titled_entry() {
        let mut store = MemoryResumeStore::new();
        store.mark_lobby();
        store.save(token("AB"));
        assert_eq!(store.titles(), vec!["lobby", "Game AB"]);
        assert_eq!(store.current(), Some(NavEntry::Game(token("AB"))));
    }

    #[test]
    fn back_and_forward_notify_subscribers() {
        let mut store = MemoryResumeStore::new();
        let mut rx = store.on_change();
        store.mark_lobby();
        store.save(token("AB"));
        assert!(!rx.has_changed().unwrap());

        assert!(store.back());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(NavEntry::Lobby));

        assert!(store.forward());
        assert_eq!(*rx.borrow_and_update(), Some(NavEntry::Game(token("AB"))));
        assert!(!store.forward());
    }

    #[test]
    fn save_after_back_discards_forward_entries() {
        let mut store = MemoryResumeStore::new();
        store.mark_lobby();
        store.save(token("AB"));
        store.back();
        store.save(token("CD"));
        assert_eq!(store.titles(), vec!["lobby", "Game CD"]);
    }
}
