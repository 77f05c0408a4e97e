//! Canvas configuration.

use crate::layer::Color;
use crate::room::DEFAULT_MAX_UNDO_STEPS;
use crate::stroke::StrokeOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the canvas. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Maximum number of layers in a room.
    pub max_layers: usize,
    /// Width and height of newly inserted shapes.
    pub default_layer_size: f64,
    /// L1 distance the pointer must travel before a press becomes a selection net.
    pub selection_net_threshold: i64,
    /// Side length of the square resize handles.
    pub handle_size: f64,
    /// Fill used before the user picks a color.
    pub initial_color: Color,
    pub stroke: StrokeOptions,
    /// Undo depth. History lives in the room, so this is read when the room is
    /// created (`MemoryRoom::with_max_undo_steps`, `CrdtRoom::with_max_undo_steps`),
    /// not by [`Canvas`](crate::canvas::Canvas).
    pub max_undo_steps: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            max_layers: 100,
            default_layer_size: 100.0,
            selection_net_threshold: 5,
            handle_size: 8.0,
            initial_color: Color::new(255, 0, 0),
            stroke: StrokeOptions::default(),
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded canvas config from {}", path.display());
        Ok(config)
    }
}
