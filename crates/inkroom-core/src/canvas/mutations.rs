//! Room mutations driven by the canvas. Each entry point checks the mode it
//! belongs to and does nothing otherwise.

use super::{Canvas, CanvasState};
use crate::document::Transaction;
use crate::geometry::{layers_intersecting_rect, resize_bounds, Point, Side, XYWH};
use crate::layer::{Color, Layer, LayerId, LayerPatch, LayerType, PenPoint};
use crate::presence::PresenceUpdate;
use crate::room::Room;

fn commit_or_warn<R: Room + ?Sized>(room: &mut R, transaction: Transaction, what: &str) -> bool {
    match room.commit(transaction) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to {what}: {e}");
            false
        }
    }
}

impl Canvas {
    /// Create a layer of `layer_type` at `position` and select it.
    pub(super) fn insert_layer<R: Room + ?Sized>(&mut self, room: &mut R, layer_type: LayerType, position: Point) {
        if !matches!(self.state, CanvasState::Inserting { .. }) {
            return;
        }
        if room.layer_count() >= self.config.max_layers {
            log::debug!("Room is full ({} layers), not inserting", room.layer_count());
            return;
        }

        let size = self.config.default_layer_size;
        let bounds = XYWH::new(position.x as f64, position.y as f64, size, size);
        let id = LayerId::new();
        let layer = Layer::new(layer_type, bounds, self.last_used_color);

        room.pause_history();
        if commit_or_warn(room, Transaction::new().insert(id.clone(), layer), "insert layer") {
            room.update_presence(PresenceUpdate::new().with_selection(vec![id]), true);
        }
        room.resume_history();
        self.set_state(CanvasState::Idle);
    }

    /// Direct pick of a layer: select it unless already selected and start dragging.
    pub(super) fn pick_layer<R: Room + ?Sized>(&mut self, room: &mut R, id: LayerId, point: Point) {
        if matches!(self.state, CanvasState::Pencil | CanvasState::Inserting { .. }) {
            return;
        }
        self.history.begin_gesture(room);
        if !room.presence().is_selected(&id) {
            room.update_presence(PresenceUpdate::new().with_selection(vec![id]), true);
        }
        self.set_state(CanvasState::Translating { current: point });
    }

    pub(super) fn start_resizing<R: Room + ?Sized>(&mut self, room: &mut R, initial_bounds: XYWH, corner: Side) {
        self.history.begin_gesture(room);
        self.set_state(CanvasState::Resizing { initial_bounds, corner });
    }

    /// Move every selected layer by the pointer delta since the last step.
    pub(super) fn translate_selected_layers<R: Room + ?Sized>(&mut self, room: &mut R, point: Point) {
        let CanvasState::Translating { current } = self.state else {
            return;
        };
        let dx = (point.x - current.x) as f64;
        let dy = (point.y - current.y) as f64;

        let mut transaction = Transaction::new();
        for id in room.presence().selection.clone() {
            // Always offset the latest value; a remote peer may have moved it.
            if let Some(layer) = room.layer(&id) {
                transaction = transaction.patch(id, LayerPatch::position(layer.x + dx, layer.y + dy));
            }
        }
        log::trace!("Translating {} layers by ({dx}, {dy})", transaction.len());
        commit_or_warn(room, transaction, "translate layers");
        self.set_state(CanvasState::Translating { current: point });
    }

    /// Resize the first selected layer by dragging the active handle to `point`.
    pub(super) fn resize_selected_layer<R: Room + ?Sized>(&mut self, room: &mut R, point: Point) {
        let CanvasState::Resizing { initial_bounds, corner } = self.state else {
            return;
        };
        let bounds = resize_bounds(initial_bounds, corner, point);
        let Some(id) = room.presence().selection.first().cloned() else {
            return;
        };
        if room.contains_layer(&id) {
            commit_or_warn(room, Transaction::new().patch(id, LayerPatch::bounds(bounds)), "resize layer");
        }
    }

    pub(super) fn start_multi_selection(&mut self, point: Point, origin: Point) {
        if !matches!(self.state, CanvasState::Pressing { .. }) {
            return;
        }
        if point.manhattan_distance(origin) > self.config.selection_net_threshold {
            self.set_state(CanvasState::SelectionNet { origin, current: point });
        }
    }

    /// Select every layer touching the net. Not recorded in history.
    pub(super) fn update_selection_net<R: Room + ?Sized>(&mut self, room: &mut R, current: Point, origin: Point) {
        if !matches!(self.state, CanvasState::SelectionNet { .. }) {
            return;
        }
        let snapshot = room.snapshot();
        let ids = layers_intersecting_rect(&snapshot.layer_ids, &snapshot.layers, origin, current);
        self.set_state(CanvasState::SelectionNet { origin, current });
        room.update_presence(PresenceUpdate::new().with_selection(ids), false);
    }

    pub(super) fn unselect_layers<R: Room + ?Sized>(&mut self, room: &mut R) {
        if !matches!(self.state, CanvasState::Idle | CanvasState::Pressing { .. }) {
            return;
        }
        if !room.presence().selection.is_empty() {
            room.update_presence(PresenceUpdate::new().with_selection(Vec::new()), true);
        }
    }

    pub(super) fn start_drawing<R: Room + ?Sized>(&mut self, room: &mut R, point: Point, pressure: f64) {
        if self.state != CanvasState::Pencil {
            return;
        }
        room.update_presence(
            PresenceUpdate::new()
                .with_pencil_draft(Some(vec![PenPoint::at(point, pressure)]))
                .with_pen_color(Some(self.last_used_color)),
            false,
        );
    }

    pub(super) fn continue_drawing<R: Room + ?Sized>(
        &mut self,
        room: &mut R,
        point: Point,
        pressure: f64,
        primary_held: bool,
    ) {
        if self.state != CanvasState::Pencil || !primary_held {
            return;
        }
        let Some(mut draft) = room.presence().pencil_draft.clone() else {
            return;
        };
        if let [only] = draft.as_slice() {
            if only.is_at(point) {
                return;
            }
        }
        draft.push(PenPoint::at(point, pressure));
        room.update_presence(PresenceUpdate::new().with_pencil_draft(Some(draft)), false);
    }

    /// Commit the local pencil draft as a path layer. The draft is cleared either way.
    pub(super) fn insert_path<R: Room + ?Sized>(&mut self, room: &mut R) {
        if self.state != CanvasState::Pencil {
            return;
        }
        let draft = room.presence().pencil_draft.clone().unwrap_or_default();
        let at_capacity = room.layer_count() >= self.config.max_layers;

        match Layer::from_pen_points(&draft, self.last_used_color) {
            Some(layer) if !at_capacity => {
                commit_or_warn(room, Transaction::new().insert(LayerId::new(), layer), "insert path");
            }
            Some(_) => log::debug!("Room is full, discarding stroke"),
            None => log::debug!("Discarding stroke with {} samples", draft.len()),
        }
        room.update_presence(PresenceUpdate::new().with_pencil_draft(None), false);
    }

    /// Delete every selected layer and clear the selection as one step.
    pub(super) fn delete_selected_layers<R: Room + ?Sized>(&mut self, room: &mut R) {
        if matches!(self.state, CanvasState::Translating { .. } | CanvasState::Resizing { .. }) {
            return;
        }
        let selection = room.presence().selection.clone();
        if selection.is_empty() {
            return;
        }

        let mut transaction = Transaction::new();
        for id in &selection {
            transaction = transaction.delete(id.clone());
        }

        // Cleared first: commit prunes the selection without recording it.
        room.pause_history();
        room.update_presence(PresenceUpdate::new().with_selection(Vec::new()), true);
        if !commit_or_warn(room, transaction, "delete layers") {
            room.update_presence(PresenceUpdate::new().with_selection(selection), true);
        }
        room.resume_history();
    }

    /// Remember `color` for new layers and fill the selection with it.
    pub(super) fn set_selection_fill<R: Room + ?Sized>(&mut self, room: &mut R, color: Color) {
        self.last_used_color = color;
        let mut transaction = Transaction::new();
        for id in room.presence().selection.clone() {
            transaction = transaction.patch(id, LayerPatch::fill(color));
        }
        commit_or_warn(room, transaction, "fill layers");
    }

    /// Selected ids in current z-order, back to front.
    fn selection_in_z_order<R: Room + ?Sized>(room: &R) -> (Vec<LayerId>, usize) {
        let order = room.layer_ids();
        let selection = &room.presence().selection;
        let selected = order.iter().filter(|id| selection.contains(id)).cloned().collect();
        (selected, order.len())
    }

    pub(super) fn bring_selection_to_front<R: Room + ?Sized>(&mut self, room: &mut R) {
        let (selected, len) = Self::selection_in_z_order(room);
        let mut transaction = Transaction::new();
        for id in selected {
            transaction = transaction.move_to(id, len.saturating_sub(1));
        }
        commit_or_warn(room, transaction, "bring layers to front");
    }

    pub(super) fn send_selection_to_back<R: Room + ?Sized>(&mut self, room: &mut R) {
        let (selected, _) = Self::selection_in_z_order(room);
        let mut transaction = Transaction::new();
        for id in selected.into_iter().rev() {
            transaction = transaction.move_to(id, 0);
        }
        commit_or_warn(room, transaction, "send layers to back");
    }

    /// Replace the text of a Text or Note layer.
    pub(super) fn update_layer_value<R: Room + ?Sized>(&mut self, room: &mut R, id: &LayerId, value: Option<String>) {
        if matches!(self.state, CanvasState::Translating { .. } | CanvasState::Resizing { .. }) {
            return;
        }
        match room.layer(id).map(|layer| layer.layer_type()) {
            Some(LayerType::Text | LayerType::Note) => {
                commit_or_warn(room, Transaction::new().patch(id.clone(), LayerPatch::value(value)), "edit text");
            }
            Some(other) => log::debug!("Layer {id} is a {other:?}, it has no text"),
            None => log::debug!("Layer {id} no longer exists"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{CanvasEvent, MouseButton, PointerEvent, Tool};
    use crate::room::MemoryRoom;

    fn click(canvas: &mut Canvas, room: &mut MemoryRoom, x: f64, y: f64) {
        let position = kurbo::Point::new(x, y);
        canvas.handle_event(
            room,
            CanvasEvent::Pointer(PointerEvent::Down {
                position,
                button: MouseButton::Left,
                pressure: 0.5,
            }),
        );
        canvas.handle_event(
            room,
            CanvasEvent::Pointer(PointerEvent::Up {
                position,
                button: MouseButton::Left,
            }),
        );
    }

    #[test]
    fn test_mode_mismatch_is_noop() {
        let mut room = MemoryRoom::new(1);
        let mut canvas = Canvas::default();

        canvas.insert_layer(&mut room, LayerType::Rectangle, Point::new(0, 0));
        canvas.insert_path(&mut room);
        canvas.translate_selected_layers(&mut room, Point::new(5, 5));
        canvas.resize_selected_layer(&mut room, Point::new(5, 5));
        canvas.update_selection_net(&mut room, Point::new(5, 5), Point::new(0, 0));

        assert_eq!(room.layer_count(), 0);
        assert_eq!(canvas.state(), &CanvasState::Idle);
        assert!(!room.can_undo());
    }

    #[test]
    fn test_stroke_at_capacity_clears_draft() {
        let mut room = MemoryRoom::new(1);
        let mut canvas = Canvas::new(crate::config::CanvasConfig {
            max_layers: 1,
            ..Default::default()
        });
        canvas.handle_event(&mut room, CanvasEvent::ToolPicked { tool: Tool::Insert(LayerType::Ellipse) });
        click(&mut canvas, &mut room, 0.0, 0.0);

        canvas.handle_event(&mut room, CanvasEvent::ToolPicked { tool: Tool::Pencil });
        room.update_presence(
            PresenceUpdate::new().with_pencil_draft(Some(vec![
                PenPoint::new(0.0, 0.0, 0.5),
                PenPoint::new(9.0, 9.0, 0.5),
            ])),
            false,
        );
        canvas.insert_path(&mut room);

        assert_eq!(room.layer_count(), 1);
        assert!(room.presence().pencil_draft.is_none());
    }

    #[test]
    fn test_update_layer_value() {
        let mut room = MemoryRoom::new(1);
        let mut canvas = Canvas::default();
        canvas.handle_event(&mut room, CanvasEvent::ToolPicked { tool: Tool::Insert(LayerType::Note) });
        click(&mut canvas, &mut room, 0.0, 0.0);
        let note = room.layer_ids()[0].clone();

        canvas.handle_event(
            &mut room,
            CanvasEvent::EditText {
                id: note.clone(),
                value: Some("ship it".into()),
            },
        );
        assert_eq!(room.layer(&note).unwrap().value(), Some("ship it"));

        canvas.handle_event(&mut room, CanvasEvent::Undo);
        assert_eq!(room.layer(&note).unwrap().value(), None);
    }

    #[test]
    fn test_value_update_ignores_shapes() {
        let mut room = MemoryRoom::new(1);
        let mut canvas = Canvas::default();
        canvas.handle_event(&mut room, CanvasEvent::ToolPicked { tool: Tool::Insert(LayerType::Rectangle) });
        click(&mut canvas, &mut room, 0.0, 0.0);
        let rect = room.layer_ids()[0].clone();
        let depth = room.undo_stack().undo_len();

        canvas.update_layer_value(&mut room, &rect, Some("nope".into()));
        assert_eq!(room.undo_stack().undo_len(), depth);
    }

    #[test]
    fn test_undo_of_delete_restores_z_index() {
        let mut room = MemoryRoom::new(1);
        let mut canvas = Canvas::default();
        for x in [0.0, 200.0, 400.0] {
            canvas.handle_event(&mut room, CanvasEvent::ToolPicked { tool: Tool::Insert(LayerType::Rectangle) });
            click(&mut canvas, &mut room, x, 0.0);
        }
        let order = room.layer_ids();

        // Select the middle layer by clicking it, then delete.
        click(&mut canvas, &mut room, 250.0, 50.0);
        assert_eq!(room.presence().selection, vec![order[1].clone()]);
        canvas.handle_event(&mut room, CanvasEvent::DeleteSelection);
        assert_eq!(room.layer_ids(), vec![order[0].clone(), order[2].clone()]);

        canvas.handle_event(&mut room, CanvasEvent::Undo);
        assert_eq!(room.layer_ids(), order);
    }
}
