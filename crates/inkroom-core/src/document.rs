//! The shared document: a z-ordered list of layer ids and the layer records
//! they name, plus the operations that edit it.

use crate::geometry::{Point, XYWH};
use crate::layer::{Layer, LayerId, LayerPatch};
use crate::room::{RoomError, RoomResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One edit to the shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocumentOp {
    /// Add a layer at `index` in the z-order, or on top when unset.
    Insert {
        id: LayerId,
        layer: Layer,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Patch {
        id: LayerId,
        patch: LayerPatch,
    },
    Delete {
        id: LayerId,
    },
    /// Move a layer to `index` in the z-order.
    Move {
        id: LayerId,
        index: usize,
    },
}

impl DocumentOp {
    pub fn layer_id(&self) -> &LayerId {
        match self {
            DocumentOp::Insert { id, .. }
            | DocumentOp::Patch { id, .. }
            | DocumentOp::Delete { id }
            | DocumentOp::Move { id, .. } => id,
        }
    }
}

/// An ordered batch of ops applied as one atomic, undoable step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<DocumentOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, id: LayerId, layer: Layer) -> Self {
        self.ops.push(DocumentOp::Insert { id, layer, index: None });
        self
    }

    pub fn patch(mut self, id: LayerId, patch: LayerPatch) -> Self {
        if !patch.is_empty() {
            self.ops.push(DocumentOp::Patch { id, patch });
        }
        self
    }

    pub fn delete(mut self, id: LayerId) -> Self {
        self.ops.push(DocumentOp::Delete { id });
        self
    }

    pub fn move_to(mut self, id: LayerId, index: usize) -> Self {
        self.ops.push(DocumentOp::Move { id, index });
        self
    }

    pub fn push(&mut self, op: DocumentOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[DocumentOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

impl From<Vec<DocumentOp>> for Transaction {
    fn from(ops: Vec<DocumentOp>) -> Self {
        Self { ops }
    }
}

/// A point-in-time copy of the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Z-order, back to front.
    pub layer_ids: Vec<LayerId>,
    pub layers: HashMap<LayerId, Layer>,
}

impl DocumentSnapshot {
    pub fn len(&self) -> usize {
        self.layer_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layer_ids.is_empty()
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.layers.contains_key(id)
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layer_ids.iter().position(|other| other == id)
    }

    /// Layers back to front.
    pub fn ordered(&self) -> impl Iterator<Item = (&LayerId, &Layer)> {
        self.layer_ids
            .iter()
            .filter_map(|id| self.layers.get(id).map(|layer| (id, layer)))
    }

    /// The topmost layer whose bounds contain `point`.
    pub fn layer_at(&self, point: Point) -> Option<&LayerId> {
        self.layer_ids
            .iter()
            .rev()
            .find(|id| self.layers.get(*id).is_some_and(|layer| layer.bounds().contains(point)))
    }

    /// Union of all layer bounds.
    pub fn bounds(&self) -> Option<XYWH> {
        self.ordered()
            .map(|(_, layer)| layer.bounds())
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    /// Every id appears exactly once in the order and has a record, and every
    /// record is listed in the order.
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.layer_ids.len() == self.layers.len()
            && self
                .layer_ids
                .iter()
                .all(|id| seen.insert(id) && self.layers.contains_key(id))
    }

    /// Apply one op and return its inverse.
    ///
    /// Ops naming a missing layer (other than inserts) are skipped and return
    /// `None`. Indices past the end are clamped.
    pub fn apply(&mut self, op: &DocumentOp) -> RoomResult<Option<DocumentOp>> {
        match op {
            DocumentOp::Insert { id, layer, index } => {
                if self.layers.contains_key(id) {
                    return Err(RoomError::DuplicateLayer(id.clone()));
                }
                let index = index.unwrap_or(self.layer_ids.len()).min(self.layer_ids.len());
                self.layer_ids.insert(index, id.clone());
                self.layers.insert(id.clone(), layer.clone());
                Ok(Some(DocumentOp::Delete { id: id.clone() }))
            }
            DocumentOp::Patch { id, patch } => {
                let Some(layer) = self.layers.get_mut(id) else {
                    log::debug!("Skipping patch of missing layer {id}");
                    return Ok(None);
                };
                let inverse = layer.apply_patch(patch);
                Ok(Some(DocumentOp::Patch {
                    id: id.clone(),
                    patch: inverse,
                }))
            }
            DocumentOp::Delete { id } => {
                let Some(layer) = self.layers.remove(id) else {
                    log::debug!("Skipping delete of missing layer {id}");
                    return Ok(None);
                };
                let index = self.index_of(id);
                if let Some(index) = index {
                    self.layer_ids.remove(index);
                }
                Ok(Some(DocumentOp::Insert {
                    id: id.clone(),
                    layer,
                    index,
                }))
            }
            DocumentOp::Move { id, index } => {
                let Some(from) = self.index_of(id) else {
                    log::debug!("Skipping move of missing layer {id}");
                    return Ok(None);
                };
                let moved = self.layer_ids.remove(from);
                let to = (*index).min(self.layer_ids.len());
                self.layer_ids.insert(to, moved);
                Ok(Some(DocumentOp::Move {
                    id: id.clone(),
                    index: from,
                }))
            }
        }
    }

    /// Apply ops in order, returning inverses in application order. On error
    /// the snapshot may be partially modified; callers work on a copy.
    pub fn apply_all(&mut self, ops: &[DocumentOp]) -> RoomResult<Vec<DocumentOp>> {
        let mut inverses = Vec::with_capacity(ops.len());
        for op in ops {
            if let Some(inverse) = self.apply(op)? {
                inverses.push(inverse);
            }
        }
        Ok(inverses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Color, LayerType};

    fn rect(x: f64) -> Layer {
        Layer::new(LayerType::Rectangle, XYWH::new(x, 0.0, 10.0, 10.0), Color::BLACK)
    }

    fn doc(ids: &[&str]) -> DocumentSnapshot {
        let mut doc = DocumentSnapshot::default();
        for (i, id) in ids.iter().enumerate() {
            doc.apply(&DocumentOp::Insert {
                id: LayerId::from(*id),
                layer: rect(i as f64 * 20.0),
                index: None,
            })
            .unwrap();
        }
        doc
    }

    fn order(doc: &DocumentSnapshot) -> Vec<&str> {
        doc.layer_ids.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_insert_appends_on_top() {
        let doc = doc(&["a", "b", "c"]);
        assert_eq!(order(&doc), vec!["a", "b", "c"]);
        assert!(doc.is_consistent());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut doc = doc(&["a"]);
        let result = doc.apply(&DocumentOp::Insert {
            id: LayerId::from("a"),
            layer: rect(0.0),
            index: None,
        });
        assert!(matches!(result, Err(RoomError::DuplicateLayer(_))));
    }

    #[test]
    fn test_delete_inverse_restores_index() {
        let mut doc = doc(&["a", "b", "c"]);
        let inverse = doc.apply(&DocumentOp::Delete { id: LayerId::from("b") }).unwrap().unwrap();
        assert_eq!(order(&doc), vec!["a", "c"]);

        doc.apply(&inverse).unwrap();
        assert_eq!(order(&doc), vec!["a", "b", "c"]);
        assert!(doc.is_consistent());
    }

    #[test]
    fn test_missing_layer_ops_are_skipped() {
        let mut doc = doc(&["a"]);
        let missing = LayerId::from("missing");
        assert!(doc.apply(&DocumentOp::Delete { id: missing.clone() }).unwrap().is_none());
        assert!(doc
            .apply(&DocumentOp::Patch {
                id: missing.clone(),
                patch: LayerPatch::position(1.0, 1.0),
            })
            .unwrap()
            .is_none());
        assert!(doc.apply(&DocumentOp::Move { id: missing, index: 0 }).unwrap().is_none());
        assert_eq!(order(&doc), vec!["a"]);
    }

    #[test]
    fn test_move_and_inverse() {
        let mut doc = doc(&["a", "b", "c"]);
        let inverse = doc
            .apply(&DocumentOp::Move { id: LayerId::from("a"), index: 99 })
            .unwrap()
            .unwrap();
        assert_eq!(order(&doc), vec!["b", "c", "a"]);
        doc.apply(&inverse).unwrap();
        assert_eq!(order(&doc), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_layer_at_prefers_topmost() {
        let mut doc = DocumentSnapshot::default();
        doc.apply(&DocumentOp::Insert { id: "under".into(), layer: rect(0.0), index: None }).unwrap();
        doc.apply(&DocumentOp::Insert { id: "over".into(), layer: rect(5.0), index: None }).unwrap();

        assert_eq!(doc.layer_at(Point::new(7, 5)).map(|id| id.as_str()), Some("over"));
        assert_eq!(doc.layer_at(Point::new(2, 5)).map(|id| id.as_str()), Some("under"));
        assert_eq!(doc.layer_at(Point::new(50, 50)), None);
    }

    #[test]
    fn test_bounds_union() {
        let doc = doc(&["a", "b"]);
        assert_eq!(doc.bounds(), Some(XYWH::new(0.0, 0.0, 30.0, 10.0)));
        assert_eq!(DocumentSnapshot::default().bounds(), None);
    }
}
