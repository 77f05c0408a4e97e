//! Bounded undo/redo stacks of inverse operations.

use crate::document::DocumentOp;
use crate::presence::PresenceUpdate;

/// Default number of undo entries to keep.
pub const DEFAULT_MAX_UNDO_STEPS: usize = 100;

/// One reversible change inside an undo entry.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryItem {
    Document(DocumentOp),
    Presence(PresenceUpdate),
}

/// A group of inverse items that undo together, stored in application order.
pub type HistoryEntry = Vec<HistoryItem>;

/// Undo/redo history for one connection.
///
/// While paused (pauses nest) recorded items accumulate into a single pending
/// entry that is pushed when the outermost pause is resumed.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    pending: HistoryEntry,
    pause_depth: usize,
    max_steps: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_STEPS)
    }
}

impl UndoStack {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            pending: Vec::new(),
            pause_depth: 0,
            max_steps: max_steps.max(1),
        }
    }

    /// Record the inverses of a local change. Clears the redo stack.
    pub fn record(&mut self, items: HistoryEntry) {
        if items.is_empty() {
            return;
        }
        self.redo.clear();
        if self.is_paused() {
            self.pending.extend(items);
        } else {
            self.push_undo(items);
        }
    }

    pub fn pause(&mut self) {
        self.pause_depth += 1;
    }

    pub fn resume(&mut self) {
        if self.pause_depth == 0 {
            log::warn!("History resumed without a matching pause");
            return;
        }
        self.pause_depth -= 1;
        if self.pause_depth == 0 && !self.pending.is_empty() {
            let entry = std::mem::take(&mut self.pending);
            self.push_undo(entry);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_depth > 0
    }

    /// Take the most recent undo entry. Nothing is returned while paused.
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        if self.is_paused() {
            return None;
        }
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        if self.is_paused() {
            return None;
        }
        self.redo.pop()
    }

    /// Push an entry without touching the redo stack.
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        if self.undo.len() > self.max_steps {
            self.undo.remove(0);
        }
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
        if self.redo.len() > self.max_steps {
            self.redo.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.pending.clear();
    }
}
