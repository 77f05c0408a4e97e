//! Script loading and replay.
//!
//! A script is a JSON document:
//! ```json
//! {
//!   "export": { "width": 640, "height": 480 },
//!   "steps": [
//!     { "event": { "tool_picked": { "tool": { "insert": "rectangle" } } } },
//!     { "event": { "pointer": { "type": "up", "position": { "x": 40, "y": 40 } } } },
//!     { "remote_presence": { "connection_id": 2, "presence": { "cursor": { "x": 5, "y": 5 } } } },
//!     { "remote": { "ops": [ { "op": "delete", "id": "abc" } ] } },
//!     { "peer_left": { "connection_id": 2 } }
//!   ]
//! }
//! ```

use inkroom_core::presence::ConnectionId;
use inkroom_core::{
    Canvas, CanvasConfig, CanvasEvent, ConfigError, DocumentOp, ExportError, ExportFormat, ExportOptions,
    MemoryRoom, Presence, Room, RoomError, export,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Step {step}: {source}")]
    Room {
        step: usize,
        #[source]
        source: RoomError,
    },
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Local input, fed to the canvas.
    Event(CanvasEvent),
    /// Ops committed by another connection.
    Remote { ops: Vec<DocumentOp> },
    RemotePresence {
        connection_id: ConnectionId,
        presence: Presence,
    },
    PeerLeft { connection_id: ConnectionId },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub export: ExportOptions,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let script = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded {} steps from {}", script.steps.len(), path.display());
        Ok(script)
    }
}

/// Room and canvas after a replay.
#[derive(Debug)]
pub struct Session {
    pub room: MemoryRoom,
    pub canvas: Canvas,
    pub export: ExportOptions,
}

pub fn replay(script: &Script, config: CanvasConfig, connection_id: ConnectionId) -> Result<Session, ReplayError> {
    let mut room = MemoryRoom::with_max_undo_steps(connection_id, config.max_undo_steps);
    let mut canvas = Canvas::new(config);

    for (index, step) in script.steps.iter().enumerate() {
        log::debug!("Step {index}: {step:?}");
        match step {
            Step::Event(event) => canvas.handle_event(&mut room, event.clone()),
            Step::Remote { ops } => room
                .apply_remote(ops)
                .map_err(|source| ReplayError::Room { step: index, source })?,
            Step::RemotePresence { connection_id, presence } => {
                room.set_other_presence(*connection_id, presence.clone())
            }
            Step::PeerLeft { connection_id } => room.remove_other(*connection_id),
        }
    }

    log::info!(
        "Replayed {} steps: {} layers, mode {}",
        script.steps.len(),
        room.layer_count(),
        canvas.state().name()
    );
    Ok(Session {
        room,
        canvas,
        export: script.export.clone(),
    })
}

impl Session {
    /// Write every export format into `out_dir`, returning the written paths.
    pub fn write_exports(&self, out_dir: &Path, name: &str) -> Result<Vec<PathBuf>, ReplayError> {
        std::fs::create_dir_all(out_dir)?;
        let scene = self.canvas.scene(&self.room, self.export.clone());

        let mut written = Vec::new();
        for format in ExportFormat::ALL {
            let artifact = export(&scene, format, name)?;
            let path = out_dir.join(&artifact.file_name);
            std::fs::write(&path, &artifact.bytes)?;
            written.push(path);
        }
        Ok(written)
    }
}
