//! Canvas state machine: turns pointer, keyboard and toolbar events into
//! room mutations.

mod mutations;

use crate::camera::Camera;
use crate::config::CanvasConfig;
use crate::export::{ExportOptions, Scene};
use crate::geometry::{Point, Side, XYWH};
use crate::history::HistoryController;
use crate::input::{shortcut_action, CanvasEvent, KeyEvent, MouseButton, PointerEvent, Tool};
use crate::layer::{Color, LayerId, LayerType};
use crate::presence::{layer_selection_colors, PresenceUpdate};
use crate::room::Room;
use crate::selection::{handle_at, resize_handles, selection_bounds, Handle};
use std::collections::HashMap;

/// Interaction mode of the local user.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CanvasState {
    #[default]
    Idle,
    /// Primary button down on empty canvas, not yet dragged far enough for a net.
    Pressing { origin: Point },
    SelectionNet { origin: Point, current: Point },
    Translating { current: Point },
    Resizing { initial_bounds: XYWH, corner: Side },
    Inserting { layer_type: LayerType },
    Pencil,
}

impl CanvasState {
    /// Short name of the mode, for toolbars and logs.
    pub fn name(&self) -> &'static str {
        match self {
            CanvasState::Idle => "idle",
            CanvasState::Pressing { .. } => "pressing",
            CanvasState::SelectionNet { .. } => "selection_net",
            CanvasState::Translating { .. } => "translating",
            CanvasState::Resizing { .. } => "resizing",
            CanvasState::Inserting { .. } => "inserting",
            CanvasState::Pencil => "pencil",
        }
    }
}

/// Local canvas controller for one connection.
///
/// Holds only local state: the mode, camera, last used color and gesture
/// history grouping. Everything shared goes through the [`Room`] passed to
/// [`Canvas::handle_event`].
#[derive(Debug, Clone)]
pub struct Canvas {
    state: CanvasState,
    camera: Camera,
    last_used_color: Color,
    config: CanvasConfig,
    history: HistoryController,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            state: CanvasState::Idle,
            camera: Camera::default(),
            last_used_color: config.initial_color,
            config,
            history: HistoryController::new(),
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn last_used_color(&self) -> Color {
        self.last_used_color
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Whether a drag gesture is currently holding history paused.
    pub fn is_gesture_active(&self) -> bool {
        self.history.is_gesture_active()
    }

    fn set_state(&mut self, state: CanvasState) {
        if std::mem::discriminant(&self.state) != std::mem::discriminant(&state) {
            log::debug!("Canvas mode {} -> {}", self.state.name(), state.name());
        }
        self.state = state;
    }

    /// Process one event to completion.
    pub fn handle_event<R: Room + ?Sized>(&mut self, room: &mut R, event: CanvasEvent) {
        if let CanvasEvent::Pointer(PointerEvent::Move { position, .. }) = &event {
            let point = self.camera.screen_to_canvas(*position);
            room.update_presence(PresenceUpdate::new().with_cursor(Some(point)), false);
        }

        match (self.state.clone(), event) {
            (_, CanvasEvent::Pointer(PointerEvent::Scroll { delta })) => self.camera.pan(delta),
            (_, CanvasEvent::Pointer(PointerEvent::Leave)) => {
                room.update_presence(PresenceUpdate::new().with_cursor(None), false);
            }

            // Pointer down
            (_, CanvasEvent::Pointer(PointerEvent::Down { button, .. })) if button != MouseButton::Left => {}
            (CanvasState::Inserting { .. }, CanvasEvent::Pointer(PointerEvent::Down { .. })) => {}
            (CanvasState::Pencil, CanvasEvent::Pointer(PointerEvent::Down { position, pressure, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.start_drawing(room, point, pressure);
            }
            (_, CanvasEvent::Pointer(PointerEvent::Down { position, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.press(room, point);
            }

            // Pointer move
            (CanvasState::Pressing { origin }, CanvasEvent::Pointer(PointerEvent::Move { position, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.start_multi_selection(point, origin);
            }
            (CanvasState::SelectionNet { origin, .. }, CanvasEvent::Pointer(PointerEvent::Move { position, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.update_selection_net(room, point, origin);
            }
            (CanvasState::Translating { .. }, CanvasEvent::Pointer(PointerEvent::Move { position, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.translate_selected_layers(room, point);
            }
            (CanvasState::Resizing { .. }, CanvasEvent::Pointer(PointerEvent::Move { position, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.resize_selected_layer(room, point);
            }
            (
                CanvasState::Pencil,
                CanvasEvent::Pointer(PointerEvent::Move {
                    position,
                    primary_held,
                    pressure,
                }),
            ) => {
                let point = self.camera.screen_to_canvas(position);
                self.continue_drawing(room, point, pressure, primary_held);
            }
            (_, CanvasEvent::Pointer(PointerEvent::Move { .. })) => {}

            // Pointer up
            (_, CanvasEvent::Pointer(PointerEvent::Up { button, .. })) if button != MouseButton::Left => {}
            (CanvasState::Idle | CanvasState::Pressing { .. }, CanvasEvent::Pointer(PointerEvent::Up { .. })) => {
                self.unselect_layers(room);
                self.set_state(CanvasState::Idle);
                self.history.end_gesture(room);
            }
            (CanvasState::Pencil, CanvasEvent::Pointer(PointerEvent::Up { .. })) => {
                self.insert_path(room);
                self.history.end_gesture(room);
            }
            (CanvasState::Inserting { layer_type }, CanvasEvent::Pointer(PointerEvent::Up { position, .. })) => {
                let point = self.camera.screen_to_canvas(position);
                self.insert_layer(room, layer_type, point);
                self.history.end_gesture(room);
            }
            (
                CanvasState::Translating { .. } | CanvasState::Resizing { .. } | CanvasState::SelectionNet { .. },
                CanvasEvent::Pointer(PointerEvent::Up { .. }),
            ) => {
                self.set_state(CanvasState::Idle);
                self.history.end_gesture(room);
            }

            // Keyboard
            (_, CanvasEvent::Key(KeyEvent::Pressed { key, modifiers })) => {
                if let Some(action) = shortcut_action(&key, modifiers) {
                    self.handle_event(room, action);
                }
            }
            (_, CanvasEvent::Key(KeyEvent::Released { .. })) => {}

            // Toolbar and actions
            (_, CanvasEvent::ToolPicked { tool }) => self.pick_tool(room, tool),
            (_, CanvasEvent::Undo) => {
                self.history.undo(room);
            }
            (_, CanvasEvent::Redo) => {
                self.history.redo(room);
            }
            (_, CanvasEvent::DeleteSelection) => self.delete_selected_layers(room),
            (_, CanvasEvent::ColorPicked { color }) => self.set_selection_fill(room, color),
            (_, CanvasEvent::BringToFront) => self.bring_selection_to_front(room),
            (_, CanvasEvent::SendToBack) => self.send_selection_to_back(room),
            (_, CanvasEvent::EditText { id, value }) => self.update_layer_value(room, &id, value),
            (_, CanvasEvent::ConnectionLost) => self.abort_gesture(room),
        }
    }

    /// Primary button down outside Pencil and Inserting modes.
    ///
    /// Hit order: a resize handle of the single selected layer, then the topmost
    /// layer, then empty canvas.
    fn press<R: Room + ?Sized>(&mut self, room: &mut R, point: Point) {
        // A down without a matching up ends whatever gesture was running.
        self.history.end_gesture(room);

        let snapshot = room.snapshot();
        let selection = room.presence().selection.clone();
        if selection.len() == 1 {
            if let Some(bounds) = selection_bounds(&snapshot, &selection) {
                if let Some(corner) = handle_at(bounds, point, self.config.handle_size) {
                    self.start_resizing(room, bounds, corner);
                    return;
                }
            }
        }

        if let Some(id) = snapshot.layer_at(point).cloned() {
            self.pick_layer(room, id, point);
            return;
        }

        self.set_state(CanvasState::Pressing { origin: point });
    }

    fn pick_tool<R: Room + ?Sized>(&mut self, room: &mut R, tool: Tool) {
        self.history.end_gesture(room);
        if room.presence().pencil_draft.is_some() {
            room.update_presence(PresenceUpdate::new().with_pencil_draft(None), false);
        }
        let state = match tool {
            Tool::Select => CanvasState::Idle,
            Tool::Insert(LayerType::Path) | Tool::Pencil => CanvasState::Pencil,
            Tool::Insert(layer_type) => CanvasState::Inserting { layer_type },
        };
        self.set_state(state);
    }

    /// Leave any gesture as if the pointer had been released, without committing
    /// a pencil draft.
    fn abort_gesture<R: Room + ?Sized>(&mut self, room: &mut R) {
        self.history.end_gesture(room);
        if room.presence().pencil_draft.is_some() {
            room.update_presence(PresenceUpdate::new().with_pencil_draft(None), false);
        }
        self.set_state(CanvasState::Idle);
    }

    /// Resize handles to draw, present only when exactly one layer is selected.
    pub fn resize_handles<R: Room + ?Sized>(&self, room: &R) -> Option<[Handle; 8]> {
        let selection = &room.presence().selection;
        if selection.len() != 1 {
            return None;
        }
        selection_bounds(&room.snapshot(), selection).map(resize_handles)
    }

    /// Bounds around the local selection.
    pub fn selection_bounds<R: Room + ?Sized>(&self, room: &R) -> Option<XYWH> {
        selection_bounds(&room.snapshot(), &room.presence().selection)
    }

    /// The rectangle being dragged out, while in selection-net mode.
    pub fn selection_net(&self) -> Option<XYWH> {
        match self.state {
            CanvasState::SelectionNet { origin, current } => Some(XYWH::from_corners(origin, current)),
            _ => None,
        }
    }

    /// Colors of layers selected by other connections, restricted to layers
    /// that still exist.
    pub fn remote_selection_colors<R: Room + ?Sized>(&self, room: &R) -> HashMap<LayerId, Color> {
        let mut colors = layer_selection_colors(&room.others());
        colors.retain(|id, _| room.contains_layer(id));
        colors
    }

    /// Capture what this canvas shows, for export.
    pub fn scene<R: Room + ?Sized>(&self, room: &R, options: ExportOptions) -> Scene {
        Scene::capture(room, self.camera, self.config.stroke, options)
    }
}
