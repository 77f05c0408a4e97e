//! Loro document schema and the room built on it.

use super::convert::{layer_from_loro, layer_to_loro};
use crate::document::{DocumentOp, DocumentSnapshot};
use crate::layer::{Layer, LayerId};
use crate::presence::{ConnectionId, Presence, PresenceUpdate};
use crate::room::{Room, RoomError, RoomResult, UndoStack};
use loro::{ExportMode, LoroDoc, LoroList, LoroMap, LoroResult, LoroValue, ValueOrContainer, VersionVector};
use std::collections::{BTreeMap, HashSet};

/// Key for the layer records map.
pub const LAYERS_KEY: &str = "layers";
/// Key for the z-order list.
pub const LAYER_IDS_KEY: &str = "layer_ids";

/// A room whose document lives in a Loro CRDT.
///
/// Presence and history are local to this connection; only the document is
/// replicated through [`CrdtRoom::export_updates`] and [`CrdtRoom::import`].
pub struct CrdtRoom {
    doc: LoroDoc,
    connection_id: ConnectionId,
    presence: Presence,
    others: BTreeMap<ConnectionId, Presence>,
    undo_stack: UndoStack,
}

impl CrdtRoom {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            doc: LoroDoc::new(),
            connection_id,
            presence: Presence::default(),
            others: BTreeMap::new(),
            undo_stack: UndoStack::default(),
        }
    }

    pub fn with_max_undo_steps(connection_id: ConnectionId, max_steps: usize) -> Self {
        Self {
            undo_stack: UndoStack::new(max_steps),
            ..Self::new(connection_id)
        }
    }

    /// Join a room from a peer's snapshot.
    pub fn from_snapshot(connection_id: ConnectionId, bytes: &[u8]) -> RoomResult<Self> {
        let mut room = Self::new(connection_id);
        room.import(bytes)?;
        Ok(room)
    }

    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    fn layers_map(&self) -> LoroMap {
        self.doc.get_map(LAYERS_KEY)
    }

    fn layer_ids_list(&self) -> LoroList {
        self.doc.get_list(LAYER_IDS_KEY)
    }

    fn raw_layer_ids(&self) -> Vec<String> {
        let list = self.layer_ids_list();
        let mut result = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(id))) = list.get(i) {
                result.push(id.to_string());
            }
        }
        result
    }

    /// Every position of `id` in the order list, ascending. Concurrent moves
    /// can leave more than one.
    fn positions_of(&self, id: &LayerId) -> Vec<usize> {
        let list = self.layer_ids_list();
        (0..list.len())
            .filter(|&i| {
                matches!(list.get(i), Some(ValueOrContainer::Value(LoroValue::String(s))) if s.as_ref() == id.as_str())
            })
            .collect()
    }

    fn has_record(&self, id: &LayerId) -> bool {
        self.layers_map().get(id.as_str()).is_some()
    }

    fn write_layer(&self, id: &LayerId, layer: &Layer) -> LoroResult<()> {
        let map = self.layers_map().insert_container(id.as_str(), LoroMap::new())?;
        layer_to_loro(layer, &map)
    }

    fn remove_from_order(&self, id: &LayerId) -> LoroResult<()> {
        let list = self.layer_ids_list();
        for i in self.positions_of(id).into_iter().rev() {
            list.delete(i, 1)?;
        }
        Ok(())
    }

    /// Mirror one op into the Loro document. `after` is the document state once
    /// the whole batch has been applied.
    ///
    /// Records and order entries are written independently, so a layer whose
    /// record survived a concurrent delete of its order entry is still editable.
    fn write_op(&self, op: &DocumentOp, after: &DocumentSnapshot) -> LoroResult<()> {
        let list = self.layer_ids_list();
        match op {
            DocumentOp::Insert { id, layer, index } => {
                self.write_layer(id, layer)?;
                let index = index.unwrap_or(list.len()).min(list.len());
                list.insert(index, LoroValue::String(id.to_string().into()))?;
            }
            DocumentOp::Patch { id, .. } => {
                let Some(layer) = after.get(id) else {
                    return Ok(());
                };
                if self.has_record(id) {
                    self.layers_map().delete(id.as_str())?;
                }
                self.write_layer(id, layer)?;
                if self.positions_of(id).is_empty() {
                    let index = after.index_of(id).unwrap_or(list.len()).min(list.len());
                    list.insert(index, LoroValue::String(id.to_string().into()))?;
                }
            }
            DocumentOp::Delete { id } => {
                if self.has_record(id) {
                    self.layers_map().delete(id.as_str())?;
                }
                self.remove_from_order(id)?;
            }
            DocumentOp::Move { id, index } => {
                if self.has_record(id) {
                    self.remove_from_order(id)?;
                    let to = (*index).min(list.len());
                    list.insert(to, LoroValue::String(id.to_string().into()))?;
                }
            }
        }
        Ok(())
    }

    /// Run `write` as one Loro commit. On failure the edits it made are
    /// reverted, so nothing from a rejected batch reaches peers.
    fn transact(&self, write: impl FnOnce(&Self) -> LoroResult<()>) -> RoomResult<()> {
        let before = self.doc.state_frontiers();
        match write(self) {
            Ok(()) => {
                self.doc.commit();
                Ok(())
            }
            Err(e) => {
                self.doc.commit();
                if let Err(revert) = self.doc.revert_to(&before) {
                    log::warn!("Failed to revert rejected batch: {revert}");
                }
                self.doc.commit();
                Err(RoomError::Crdt(e.to_string()))
            }
        }
    }

    /// Whether the order list and the record map agree: every record has
    /// exactly one order entry and every entry has a record. Concurrent edits
    /// can break this; the next local write to an affected layer repairs it.
    pub fn is_consistent(&self) -> bool {
        let raw = self.raw_layer_ids();
        let unique: HashSet<&String> = raw.iter().collect();
        unique.len() == raw.len()
            && raw.len() == self.layers_map().len()
            && raw.iter().all(|id| self.layers_map().get(id).is_some())
    }

    /// Export the full document state.
    pub fn export_snapshot(&self) -> Vec<u8> {
        self.doc.export(ExportMode::Snapshot).unwrap_or_default()
    }

    /// Export updates made since `since`.
    pub fn export_updates(&self, since: &VersionVector) -> Vec<u8> {
        self.doc.export(ExportMode::updates(since)).unwrap_or_default()
    }

    /// Merge a snapshot or update blob from another peer.
    pub fn import(&mut self, bytes: &[u8]) -> RoomResult<()> {
        self.doc
            .import(bytes)
            .map_err(|e| RoomError::Crdt(e.to_string()))?;
        self.prune_selection();
        Ok(())
    }

    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    pub fn set_other_presence(&mut self, connection_id: ConnectionId, presence: Presence) {
        self.others.insert(connection_id, presence);
    }

    pub fn update_other_presence(&mut self, connection_id: ConnectionId, update: PresenceUpdate) {
        self.others.entry(connection_id).or_default().apply(update);
    }

    pub fn remove_other(&mut self, connection_id: ConnectionId) {
        self.others.remove(&connection_id);
    }
}

impl Room for CrdtRoom {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        self.snapshot().layer_ids
    }

    fn layer(&self, id: &LayerId) -> Option<Layer> {
        let LoroValue::Map(map) = self.layers_map().get_deep_value() else {
            return None;
        };
        match map.get(id.as_str())? {
            LoroValue::Map(layer) => layer_from_loro(layer),
            _ => None,
        }
    }

    fn layer_count(&self) -> usize {
        self.layers_map().len()
    }

    /// Concurrent moves can leave an id in the order twice; the first
    /// occurrence wins. Records missing from the order are appended by id.
    fn snapshot(&self) -> DocumentSnapshot {
        let mut snapshot = DocumentSnapshot::default();
        if let LoroValue::Map(map) = self.layers_map().get_deep_value() {
            for (id, value) in map.iter() {
                if let LoroValue::Map(record) = value {
                    if let Some(layer) = layer_from_loro(record) {
                        snapshot.layers.insert(LayerId::from(id.as_str()), layer);
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for id in self.raw_layer_ids() {
            let id = LayerId::from(id);
            if snapshot.layers.contains_key(&id) && seen.insert(id.clone()) {
                snapshot.layer_ids.push(id);
            }
        }
        let mut orphans: Vec<LayerId> = snapshot
            .layers
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        orphans.sort();
        snapshot.layer_ids.extend(orphans);
        snapshot
    }

    fn apply_ops(&mut self, ops: &[DocumentOp]) -> RoomResult<Vec<DocumentOp>> {
        // Validate against a copy before touching the CRDT so a rejected batch
        // leaves no trace.
        let mut after = self.snapshot();
        let inverses = after.apply_all(ops)?;

        self.transact(|room| {
            for op in ops {
                room.write_op(op, &after)?;
            }
            Ok(())
        })?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Transaction;
    use crate::geometry::XYWH;
    use crate::layer::{Color, LayerPatch, LayerType};

    fn rect(x: f64) -> Layer {
        Layer::new(LayerType::Rectangle, XYWH::new(x, 0.0, 100.0, 100.0), Color::new(255, 0, 0))
    }

    #[test]
    fn test_commit_and_read_back() {
        let mut room = CrdtRoom::new(1);
        room.commit(Transaction::new().insert("a".into(), rect(0.0)).insert("b".into(), rect(10.0)))
            .expect("commit");

        assert_eq!(room.layer_count(), 2);
        assert_eq!(room.layer_ids(), vec![LayerId::from("a"), LayerId::from("b")]);
        assert_eq!(room.layer(&"b".into()), Some(rect(10.0)));
        assert!(room.snapshot().is_consistent());
    }

    #[test]
    fn test_duplicate_insert_leaves_document_untouched() {
        let mut room = CrdtRoom::new(1);
        room.commit(Transaction::new().insert("a".into(), rect(0.0))).unwrap();
        let before = room.version();

        let result = room.commit(Transaction::new().insert("c".into(), rect(0.0)).insert("a".into(), rect(5.0)));
        assert!(result.is_err());
        assert_eq!(room.version(), before);
        assert_eq!(room.layer_count(), 1);
    }

    #[test]
    fn test_patch_move_delete_undo() {
        let mut room = CrdtRoom::new(1);
        room.commit(Transaction::new().insert("a".into(), rect(0.0)).insert("b".into(), rect(10.0)))
            .unwrap();
        room.commit(Transaction::new().patch("a".into(), LayerPatch::position(50.0, 60.0)))
            .unwrap();
        room.commit(Transaction::new().move_to("a".into(), 1)).unwrap();
        room.commit(Transaction::new().delete("b".into())).unwrap();

        assert_eq!(room.layer_ids(), vec![LayerId::from("a")]);
        assert_eq!(room.layer(&"a".into()).unwrap().x, 50.0);

        assert!(room.undo());
        assert_eq!(room.layer_ids(), vec![LayerId::from("b"), LayerId::from("a")]);
        assert!(room.undo());
        assert_eq!(room.layer_ids(), vec![LayerId::from("a"), LayerId::from("b")]);
        assert!(room.undo());
        assert_eq!(room.layer(&"a".into()).unwrap().x, 0.0);
    }

    #[test]
    fn test_undo_depth() {
        let mut room = CrdtRoom::with_max_undo_steps(1, 2);
        for id in ["a", "b", "c"] {
            room.commit(Transaction::new().insert(id.into(), rect(0.0))).unwrap();
        }
        assert_eq!(room.undo_stack().undo_len(), 2);
        assert!(room.undo());
        assert!(room.undo());
        assert!(!room.undo());
        assert_eq!(room.layer_ids(), vec![LayerId::from("a")]);
    }

    #[test]
    fn test_peers_converge() {
        let mut alice = CrdtRoom::new(1);
        alice.commit(Transaction::new().insert("a".into(), rect(0.0))).unwrap();

        let mut bob = CrdtRoom::from_snapshot(2, &alice.export_snapshot()).unwrap();
        assert_eq!(bob.layer_ids(), vec![LayerId::from("a")]);

        let alice_version = alice.version();
        let bob_version = bob.version();
        alice.commit(Transaction::new().insert("from_alice".into(), rect(1.0))).unwrap();
        bob.commit(Transaction::new().insert("from_bob".into(), rect(2.0))).unwrap();
        bob.commit(Transaction::new().patch("a".into(), LayerPatch::fill(Color::BLACK)))
            .unwrap();

        let to_bob = alice.export_updates(&alice_version);
        let to_alice = bob.export_updates(&bob_version);
        bob.import(&to_bob).unwrap();
        alice.import(&to_alice).unwrap();

        assert_eq!(alice.snapshot(), bob.snapshot());
        assert_eq!(alice.layer_count(), 3);
        assert_eq!(alice.layer(&"a".into()).unwrap().fill, Color::BLACK);
    }

    #[test]
    fn test_import_prunes_selection() {
        let mut alice = CrdtRoom::new(1);
        alice.commit(Transaction::new().insert("a".into(), rect(0.0))).unwrap();
        let mut bob = CrdtRoom::from_snapshot(2, &alice.export_snapshot()).unwrap();
        bob.update_presence(PresenceUpdate::new().with_selection(vec!["a".into()]), false);

        let version = alice.version();
        alice.commit(Transaction::new().delete("a".into())).unwrap();
        bob.import(&alice.export_updates(&version)).unwrap();

        assert_eq!(bob.layer_count(), 0);
        assert!(bob.presence().selection.is_empty());
    }

    /// Drop `id` from the order list only, as a concurrent delete racing a
    /// record rewrite does.
    fn orphan(room: &CrdtRoom, id: &str) {
        room.remove_from_order(&id.into()).unwrap();
        room.loro_doc().commit();
    }

    #[test]
    fn test_orphan_record_stays_editable() {
        let mut room = CrdtRoom::new(1);
        room.commit(Transaction::new().insert("a".into(), rect(0.0)).insert("b".into(), rect(10.0)))
            .unwrap();
        orphan(&room, "a");
        assert!(!room.is_consistent());
        assert_eq!(room.layer_ids(), vec![LayerId::from("b"), LayerId::from("a")]);

        room.commit(Transaction::new().patch("a".into(), LayerPatch::position(99.0, 99.0)))
            .unwrap();
        assert_eq!(room.layer(&"a".into()).unwrap().x, 99.0);
        assert_eq!(room.raw_layer_ids(), vec!["b".to_string(), "a".to_string()]);
        assert!(room.is_consistent());

        orphan(&room, "a");
        room.commit(Transaction::new().delete("a".into())).unwrap();
        assert_eq!(room.layer_ids(), vec![LayerId::from("b")]);
        assert_eq!(room.layer_count(), 1);
        assert!(room.is_consistent());

        assert!(room.undo());
        assert_eq!(room.layer(&"a".into()).unwrap().x, 99.0);
        assert!(room.is_consistent());
    }

    #[test]
    fn test_orphan_can_be_moved() {
        let mut room = CrdtRoom::new(1);
        room.commit(Transaction::new().insert("a".into(), rect(0.0)).insert("b".into(), rect(10.0)))
            .unwrap();
        orphan(&room, "b");
        room.commit(Transaction::new().move_to("b".into(), 0)).unwrap();
        assert_eq!(room.raw_layer_ids(), vec!["b".to_string(), "a".to_string()]);
        assert!(room.is_consistent());
    }

    #[test]
    fn test_concurrent_delete_and_patch() {
        let mut alice = CrdtRoom::new(1);
        alice.commit(Transaction::new().insert("a".into(), rect(0.0)).insert("b".into(), rect(10.0)))
            .unwrap();
        let mut bob = CrdtRoom::from_snapshot(2, &alice.export_snapshot()).unwrap();

        let alice_version = alice.version();
        let bob_version = bob.version();
        alice.commit(Transaction::new().delete("a".into())).unwrap();
        bob.commit(Transaction::new().patch("a".into(), LayerPatch::position(5.0, 5.0)))
            .unwrap();
        let to_bob = alice.export_updates(&alice_version);
        let to_alice = bob.export_updates(&bob_version);
        bob.import(&to_bob).unwrap();
        alice.import(&to_alice).unwrap();
        assert_eq!(alice.snapshot(), bob.snapshot());

        // Whichever side won, every layer shown must respond to local edits.
        let version = alice.version();
        for id in alice.layer_ids() {
            alice.commit(Transaction::new().patch(id.clone(), LayerPatch::position(99.0, 99.0)))
                .unwrap();
            assert_eq!(alice.layer(&id).unwrap().x, 99.0);
            alice.commit(Transaction::new().delete(id)).unwrap();
        }
        assert_eq!(alice.layer_count(), 0);
        assert!(alice.raw_layer_ids().is_empty());
        assert!(alice.is_consistent());

        bob.import(&alice.export_updates(&version)).unwrap();
        assert_eq!(bob.layer_count(), 0);
        assert!(bob.is_consistent());
    }

    #[test]
    fn test_failed_batch_is_reverted() {
        let mut room = CrdtRoom::new(1);
        room.commit(Transaction::new().insert("a".into(), rect(0.0))).unwrap();
        let before = room.snapshot();

        let result = room.transact(|room| {
            room.write_layer(&"b".into(), &rect(1.0))?;
            room.layer_ids_list().delete(10, 1)
        });
        assert!(matches!(result, Err(RoomError::Crdt(_))));
        assert_eq!(room.snapshot(), before);
        assert!(room.is_consistent());

        let peer = CrdtRoom::from_snapshot(2, &room.export_snapshot()).unwrap();
        assert_eq!(peer.snapshot(), before);
    }
}
