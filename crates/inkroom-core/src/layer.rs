//! Layer definitions for the shared document.

use crate::geometry::{Point, XYWH};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Opaque, client-generated layer identifier. Never reused or mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for LayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as a CSS hex color (`#rrggbb`).
    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrasting_text(&self) -> Color {
        let luminance = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        if luminance > 182.0 { Color::BLACK } else { Color::WHITE }
    }
}

/// Layer variants, without their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Rectangle,
    Ellipse,
    Text,
    Note,
    Path,
}

/// One pressure-sampled pencil point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenPoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl PenPoint {
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }

    /// A sample taken at an integer canvas point.
    pub fn at(point: Point, pressure: f64) -> Self {
        Self::new(point.x as f64, point.y as f64, pressure)
    }

    /// Whether this sample sits exactly on the given canvas point.
    pub fn is_at(&self, point: Point) -> bool {
        self.x == point.x as f64 && self.y == point.y as f64
    }
}

/// Variant-specific layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Rectangle,
    Ellipse,
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Note {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Path {
        /// Points relative to the layer's origin.
        points: Vec<PenPoint>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke: Option<Color>,
    },
}

/// A shape or freehand stroke on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Color,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl Layer {
    /// Create a layer of the given type occupying `bounds`.
    ///
    /// A `Path` created this way carries no points.
    pub fn new(layer_type: LayerType, bounds: XYWH, fill: Color) -> Self {
        let kind = match layer_type {
            LayerType::Rectangle => LayerKind::Rectangle,
            LayerType::Ellipse => LayerKind::Ellipse,
            LayerType::Text => LayerKind::Text { value: None },
            LayerType::Note => LayerKind::Note { value: None },
            LayerType::Path => LayerKind::Path {
                points: Vec::new(),
                stroke: None,
            },
        };
        Self {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            fill,
            kind,
        }
    }

    /// Build a path layer from a pencil draft.
    ///
    /// The layer's bounds are the draft's bounding box and its points are stored
    /// relative to the top-left corner. Returns `None` for drafts under two points.
    pub fn from_pen_points(points: &[PenPoint], fill: Color) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let mut left = f64::MAX;
        let mut top = f64::MAX;
        let mut right = f64::MIN;
        let mut bottom = f64::MIN;
        for point in points {
            left = left.min(point.x);
            top = top.min(point.y);
            right = right.max(point.x);
            bottom = bottom.max(point.y);
        }

        let relative = points
            .iter()
            .map(|p| PenPoint::new(p.x - left, p.y - top, p.pressure))
            .collect();

        Some(Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
            fill,
            kind: LayerKind::Path {
                points: relative,
                stroke: None,
            },
        })
    }

    pub fn layer_type(&self) -> LayerType {
        match self.kind {
            LayerKind::Rectangle => LayerType::Rectangle,
            LayerKind::Ellipse => LayerType::Ellipse,
            LayerKind::Text { .. } => LayerType::Text,
            LayerKind::Note { .. } => LayerType::Note,
            LayerKind::Path { .. } => LayerType::Path,
        }
    }

    pub fn bounds(&self) -> XYWH {
        XYWH::new(self.x, self.y, self.width, self.height)
    }

    /// Text content of a Text or Note layer.
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            LayerKind::Text { value } | LayerKind::Note { value } => value.as_deref(),
            _ => None,
        }
    }

    /// Path samples (relative to the layer origin), empty for other variants.
    pub fn points(&self) -> &[PenPoint] {
        match &self.kind {
            LayerKind::Path { points, .. } => points,
            _ => &[],
        }
    }

    /// Apply a partial field update and return the patch that reverts it.
    pub fn apply_patch(&mut self, patch: &LayerPatch) -> LayerPatch {
        let mut inverse = LayerPatch::default();
        if let Some(x) = patch.x {
            inverse.x = Some(self.x);
            self.x = x;
        }
        if let Some(y) = patch.y {
            inverse.y = Some(self.y);
            self.y = y;
        }
        if let Some(width) = patch.width {
            inverse.width = Some(self.width);
            self.width = width.max(0.0);
        }
        if let Some(height) = patch.height {
            inverse.height = Some(self.height);
            self.height = height.max(0.0);
        }
        if let Some(fill) = patch.fill {
            inverse.fill = Some(self.fill);
            self.fill = fill;
        }
        if let Some(new_value) = &patch.value {
            if let LayerKind::Text { value } | LayerKind::Note { value } = &mut self.kind {
                inverse.value = Some(value.clone());
                *value = new_value.clone();
            }
        }
        inverse
    }
}

/// Partial update of a layer's fields. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    /// `Some(None)` clears the text value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Option<String>>,
}

impl LayerPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn bounds(bounds: XYWH) -> Self {
        Self {
            x: Some(bounds.x),
            y: Some(bounds.y),
            width: Some(bounds.width),
            height: Some(bounds.height),
            ..Default::default()
        }
    }

    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            ..Default::default()
        }
    }

    pub fn value(value: Option<String>) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.fill.is_none()
            && self.value.is_none()
    }
}
