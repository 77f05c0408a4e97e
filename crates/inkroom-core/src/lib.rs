//! Inkroom Core Library
//!
//! Canvas interaction engine for the Inkroom collaborative whiteboard: layer
//! model, room storage (in-memory and Loro CRDT), undo history, the canvas
//! state machine and scene export.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod crdt;
pub mod document;
pub mod export;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layer;
pub mod presence;
pub mod room;
pub mod selection;
pub mod stroke;

pub use camera::Camera;
pub use canvas::{Canvas, CanvasState};
pub use config::{CanvasConfig, ConfigError};
pub use crdt::CrdtRoom;
pub use document::{DocumentOp, DocumentSnapshot, Transaction};
pub use export::{Artifact, ExportError, ExportFormat, ExportOptions, Scene, export};
pub use geometry::{Point, Side, XYWH};
pub use history::HistoryController;
pub use input::{CanvasEvent, KeyEvent, Modifiers, MouseButton, PointerEvent, Tool};
pub use layer::{Color, Layer, LayerId, LayerKind, LayerPatch, LayerType, PenPoint};
pub use presence::{ConnectionId, Presence, PresenceUpdate};
pub use room::{MemoryRoom, Room, RoomError, RoomResult};
pub use stroke::StrokeOptions;
