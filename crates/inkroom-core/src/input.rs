//! Input events delivered to the canvas.

use crate::layer::{Color, LayerId, LayerType};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

fn default_pressure() -> f64 {
    0.5
}

/// Pointer events in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        #[serde(default = "default_pressure")]
        pressure: f64,
    },
    Move {
        position: Point,
        /// Whether the primary button is held during the move.
        #[serde(default)]
        primary_held: bool,
        #[serde(default = "default_pressure")]
        pressure: f64,
    },
    Up {
        position: Point,
        #[serde(default)]
        button: MouseButton,
    },
    /// The pointer left the canvas surface.
    Leave,
    /// Wheel or trackpad scroll.
    Scroll { delta: Vec2 },
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyEvent {
    Pressed {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Released {
        key: String,
    },
}

/// Toolbar choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Select,
    Insert(LayerType),
    Pencil,
}

/// Everything the canvas reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
    ToolPicked { tool: Tool },
    Undo,
    Redo,
    DeleteSelection,
    ColorPicked { color: Color },
    BringToFront,
    SendToBack,
    /// Replace the text of a Text or Note layer.
    EditText { id: LayerId, value: Option<String> },
    /// The connection to the room dropped mid-gesture.
    ConnectionLost,
}

/// Map a key press to the canvas action it triggers.
pub fn shortcut_action(key: &str, modifiers: Modifiers) -> Option<CanvasEvent> {
    match key.to_ascii_lowercase().as_str() {
        "z" if modifiers.command() && modifiers.shift => Some(CanvasEvent::Redo),
        "z" if modifiers.command() => Some(CanvasEvent::Undo),
        "y" if modifiers.command() => Some(CanvasEvent::Redo),
        "delete" | "backspace" => Some(CanvasEvent::DeleteSelection),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        assert_eq!(shortcut_action("z", ctrl()), Some(CanvasEvent::Undo));
        let meta = Modifiers {
            meta: true,
            ..Default::default()
        };
        assert_eq!(shortcut_action("Z", meta), Some(CanvasEvent::Undo));

        let ctrl_shift = Modifiers {
            shift: true,
            ..ctrl()
        };
        assert_eq!(shortcut_action("Z", ctrl_shift), Some(CanvasEvent::Redo));
        assert_eq!(shortcut_action("y", ctrl()), Some(CanvasEvent::Redo));
    }

    #[test]
    fn test_plain_letters_do_nothing() {
        assert_eq!(shortcut_action("z", Modifiers::default()), None);
        assert_eq!(shortcut_action("a", ctrl()), None);
    }

    #[test]
    fn test_delete_keys() {
        assert_eq!(shortcut_action("Delete", Modifiers::default()), Some(CanvasEvent::DeleteSelection));
        assert_eq!(shortcut_action("Backspace", Modifiers::default()), Some(CanvasEvent::DeleteSelection));
    }

    #[test]
    fn test_events_parse_from_json() {
        let event: CanvasEvent = serde_json::from_str(
            r#"{"pointer": {"type": "down", "position": {"x": 10.0, "y": 20.0}}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            CanvasEvent::Pointer(PointerEvent::Down {
                position: Point::new(10.0, 20.0),
                button: MouseButton::Left,
                pressure: 0.5,
            })
        );

        let tool: CanvasEvent = serde_json::from_str(r#"{"tool_picked": {"tool": {"insert": "note"}}}"#).unwrap();
        assert_eq!(
            tool,
            CanvasEvent::ToolPicked {
                tool: Tool::Insert(LayerType::Note)
            }
        );

        let undo: CanvasEvent = serde_json::from_str(r#""undo""#).unwrap();
        assert_eq!(undo, CanvasEvent::Undo);
    }
}
