//! Room abstraction: the shared document, presence and history that a
//! realtime sync backend provides to one connection.

mod memory;
mod undo;

pub use memory::MemoryRoom;
pub use undo::{DEFAULT_MAX_UNDO_STEPS, HistoryEntry, HistoryItem, UndoStack};

use crate::document::{DocumentOp, DocumentSnapshot, Transaction};
use crate::layer::{Layer, LayerId};
use crate::presence::{ConnectionId, Presence, PresenceUpdate};
use thiserror::Error;

/// Room errors.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Layer already exists: {0}")]
    DuplicateLayer(LayerId),
    #[error("CRDT error: {0}")]
    Crdt(String),
}

/// Result type for room operations.
pub type RoomResult<T> = Result<T, RoomError>;

/// Connection-scoped handle onto a shared room.
///
/// Implementors provide storage access, the local and remote presence and the
/// local undo stack. Commits, presence writes and undo/redo are built on top.
pub trait Room {
    /// Id the room assigned to this connection.
    fn connection_id(&self) -> ConnectionId;

    /// Z-ordered layer ids, back to front.
    fn layer_ids(&self) -> Vec<LayerId>;

    fn layer(&self, id: &LayerId) -> Option<Layer>;

    fn layer_count(&self) -> usize;

    /// Copy of the whole document at this moment.
    fn snapshot(&self) -> DocumentSnapshot;

    /// Apply ops atomically: either all of them take effect or none do.
    /// Returns the inverse of each op that had an effect, in application order.
    fn apply_ops(&mut self, ops: &[DocumentOp]) -> RoomResult<Vec<DocumentOp>>;

    fn presence(&self) -> &Presence;

    fn presence_mut(&mut self) -> &mut Presence;

    /// Presence of every other connection in the room.
    fn others(&self) -> Vec<(ConnectionId, Presence)>;

    fn undo_stack(&self) -> &UndoStack;

    fn undo_stack_mut(&mut self) -> &mut UndoStack;

    fn contains_layer(&self, id: &LayerId) -> bool {
        self.layer(id).is_some()
    }

    /// Commit a transaction as one undo step.
    fn commit(&mut self, transaction: Transaction) -> RoomResult<()> {
        if transaction.is_empty() {
            return Ok(());
        }
        let inverses = self.apply_ops(transaction.ops())?;
        self.undo_stack_mut()
            .record(inverses.into_iter().map(HistoryItem::Document).collect());
        self.prune_selection();
        Ok(())
    }

    /// Write the local presence, optionally as an undoable step.
    fn update_presence(&mut self, update: PresenceUpdate, add_to_history: bool) {
        if update.is_empty() {
            return;
        }
        let inverse = self.presence_mut().apply(update);
        if add_to_history {
            self.undo_stack_mut().record(vec![HistoryItem::Presence(inverse)]);
        }
    }

    /// Drop ids of deleted layers from the local selection.
    fn prune_selection(&mut self) {
        let selection = &self.presence().selection;
        if selection.iter().all(|id| self.contains_layer(id)) {
            return;
        }
        let kept: Vec<LayerId> = selection
            .iter()
            .filter(|id| self.contains_layer(id))
            .cloned()
            .collect();
        self.presence_mut().selection = kept;
    }

    fn pause_history(&mut self) {
        self.undo_stack_mut().pause();
    }

    fn resume_history(&mut self) {
        self.undo_stack_mut().resume();
    }

    fn can_undo(&self) -> bool {
        self.undo_stack().can_undo()
    }

    fn can_redo(&self) -> bool {
        self.undo_stack().can_redo()
    }

    /// Revert the most recent local step. Returns false when nothing was undone.
    fn undo(&mut self) -> bool {
        let Some(entry) = self.undo_stack_mut().pop_undo() else {
            return false;
        };
        match replay_entry(self, entry.clone()) {
            Ok(redo) => {
                self.undo_stack_mut().push_redo(redo);
                true
            }
            Err(e) => {
                log::warn!("Undo failed: {e}");
                self.undo_stack_mut().push_undo(entry);
                false
            }
        }
    }

    /// Reapply the most recently undone step.
    fn redo(&mut self) -> bool {
        let Some(entry) = self.undo_stack_mut().pop_redo() else {
            return false;
        };
        match replay_entry(self, entry.clone()) {
            Ok(undo) => {
                self.undo_stack_mut().push_undo(undo);
                true
            }
            Err(e) => {
                log::warn!("Redo failed: {e}");
                self.undo_stack_mut().push_redo(entry);
                false
            }
        }
    }
}

/// Apply a history entry in reverse and return the entry that reverts it.
fn replay_entry<R: Room + ?Sized>(room: &mut R, entry: HistoryEntry) -> RoomResult<HistoryEntry> {
    let mut ops = Vec::new();
    let mut updates = Vec::new();
    for item in entry.into_iter().rev() {
        match item {
            HistoryItem::Document(op) => ops.push(op),
            HistoryItem::Presence(update) => updates.push(update),
        }
    }

    let inverses = room.apply_ops(&ops)?;
    let mut counter: HistoryEntry = inverses.into_iter().map(HistoryItem::Document).collect();
    for update in updates {
        let inverse = room.presence_mut().apply(update);
        counter.push(HistoryItem::Presence(inverse));
    }
    room.prune_selection();
    Ok(counter)
}
