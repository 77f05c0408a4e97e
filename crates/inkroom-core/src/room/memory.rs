//! In-memory room backend for tests, replays and offline use.

use super::{Room, RoomResult, UndoStack};
use crate::document::{DocumentOp, DocumentSnapshot};
use crate::layer::{Layer, LayerId};
use crate::presence::{ConnectionId, Presence, PresenceUpdate};
use std::collections::BTreeMap;

/// A room held entirely in process memory.
///
/// Remote participants are simulated with [`MemoryRoom::apply_remote`] and the
/// `*_other*` presence methods.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoom {
    connection_id: ConnectionId,
    document: DocumentSnapshot,
    presence: Presence,
    others: BTreeMap<ConnectionId, Presence>,
    undo_stack: UndoStack,
}

impl MemoryRoom {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            ..Default::default()
        }
    }

    pub fn with_max_undo_steps(connection_id: ConnectionId, max_steps: usize) -> Self {
        Self {
            connection_id,
            undo_stack: UndoStack::new(max_steps),
            ..Default::default()
        }
    }

    pub fn document(&self) -> &DocumentSnapshot {
        &self.document
    }

    /// Apply ops that another connection committed. They do not enter local history.
    pub fn apply_remote(&mut self, ops: &[DocumentOp]) -> RoomResult<()> {
        self.apply_ops(ops)?;
        self.prune_selection();
        Ok(())
    }

    /// Replace a remote connection's presence, adding it if unknown.
    pub fn set_other_presence(&mut self, connection_id: ConnectionId, presence: Presence) {
        self.others.insert(connection_id, presence);
    }

    pub fn update_other_presence(&mut self, connection_id: ConnectionId, update: PresenceUpdate) {
        self.others.entry(connection_id).or_default().apply(update);
    }

    /// A remote connection left the room.
    pub fn remove_other(&mut self, connection_id: ConnectionId) {
        self.others.remove(&connection_id);
    }
}

impl Room for MemoryRoom {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        self.document.layer_ids.clone()
    }

    fn layer(&self, id: &LayerId) -> Option<Layer> {
        self.document.get(id).cloned()
    }

    fn layer_count(&self) -> usize {
        self.document.len()
    }

    fn snapshot(&self) -> DocumentSnapshot {
        self.document.clone()
    }

    fn apply_ops(&mut self, ops: &[DocumentOp]) -> RoomResult<Vec<DocumentOp>> {
        let mut working = self.document.clone();
        let inverses = working.apply_all(ops)?;
        self.document = working;
        Ok(inverses)
    }

    fn presence(&self) -> &Presence {
        &self.presence
    }

    fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }

    fn others(&self) -> Vec<(ConnectionId, Presence)> {
        self.others
            .iter()
            .map(|(id, presence)| (*id, presence.clone()))
            .collect()
    }

    fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    fn undo_stack_mut(&mut self) -> &mut UndoStack {
        &mut self.undo_stack
    }
}
