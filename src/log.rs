//! Action log and undo tracker.

use crate::protocol::{CellRef, LogEntry};

/// The visible action log, plus the local-only highlight and the server's
/// undo flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
    highlighted: Option<usize>,
    undo_offered: bool,
}

impl ActionLog {
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Drop exactly the last `n` entries. The count comes from the server and
    /// is not checked beyond saturating at an empty log.
    pub fn remove_last(&mut self, n: usize) {
        let keep = self.entries.len().saturating_sub(n);
        self.entries.truncate(keep);
        if self.highlighted.is_some_and(|idx| idx >= keep) {
            self.highlighted = None;
        }
    }

    /// Toggle the highlight from a clicked entry. Only entries that reference
    /// a cell are links; clicking anything else is a no-op. Returns whether
    /// the highlight changed.
    pub fn toggle_highlight(&mut self, index: usize) -> bool {
        let links = self
            .entries
            .get(index)
            .and_then(LogEntry::position)
            .is_some();
        if !links {
            return false;
        }
        self.highlighted = if self.highlighted == Some(index) {
            None
        } else {
            Some(index)
        };
        true
    }

    /// Forget the highlight; the board it pointed into was rebuilt.
    pub fn clear_highlight(&mut self) {
        self.highlighted = None;
    }

    /// The cell currently highlighted from the log, if any.
    pub fn highlighted_cell(&self) -> Option<CellRef> {
        self.highlighted
            .and_then(|idx| self.entries.get(idx))
            .and_then(LogEntry::position)
    }

    pub fn highlighted_entry(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn set_undo_offered(&mut self, offered: bool) {
        self.undo_offered = offered;
    }

    /// Whether the undo control is visible. Spectators never see it.
    pub fn undo_visible(&self, spectating: bool) -> bool {
        self.undo_offered && !spectating
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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

    fn text(s: &str) -> LogEntry {
        LogEntry::Text(s.into())
    }

    fn linked(s: &str, i: usize, j: usize) -> LogEntry {
        LogEntry::Linked {
            msg: s.into(),
            pos: CellRef { i, j },
        }
    }

    fn log_of(n: usize) -> ActionLog {
        let mut log = ActionLog::default();
        for k in 0..n {
            log.append(text(&format!("line {k}")));
        }
        log
    }

    #[test]
    fn remove_then_append_leaves_expected_length() {
        let mut log = log_of(5);
        log.remove_last(2);
        log.append(text("after undo"));
        assert_eq!(log.len(), 5 - 2 + 1);
        assert_eq!(log.entries().last().unwrap().message(), "after undo");
    }

    #[test]
    fn removing_everything_empties_the_log() {
        let mut log = log_of(3);
        log.remove_last(3);
        assert!(log.is_empty());
    }

    #[test]
    fn oversized_removal_saturates() {
        let mut log = log_of(2);
        log.remove_last(7);
        assert!(log.is_empty());
    }

    #[test]
    fn highlight_toggles_and_moves() {
        let mut log = ActionLog::default();
        log.append(linked("a", 0, 1));
        log.append(linked("b", 2, 2));

        assert!(log.toggle_highlight(0));
        assert_eq!(log.highlighted_cell(), Some(CellRef { i: 0, j: 1 }));

        assert!(log.toggle_highlight(1));
        assert_eq!(log.highlighted_cell(), Some(CellRef { i: 2, j: 2 }));

        assert!(log.toggle_highlight(1));
        assert_eq!(log.highlighted_cell(), None);
    }

    #[test]
    fn plain_entries_are_not_links() {
        let mut log = ActionLog::default();
        log.append(text("hello"));
        assert!(!log.toggle_highlight(0));
        assert!(!log.toggle_highlight(9));
        assert_eq!(log.highlighted_entry(), None);
    }

    #[test]
    fn removing_highlighted_entry_clears_highlight() {
        let mut log = ActionLog::default();
        log.append(text("keep"));
        log.append(linked("gone", 1, 1));
        log.toggle_highlight(1);
        log.remove_last(1);
        assert_eq!(log.highlighted_entry(), None);
    }

    #[test]
    fn undo_visibility_respects_spectators() {
        let mut log = ActionLog::default();
        log.set_undo_offered(true);
        assert!(!log.undo_visible(true));
        assert!(log.undo_visible(false));
        log.set_undo_offered(false);
        assert!(!log.undo_visible(true));
        assert!(!log.undo_visible(false));
    }
}
