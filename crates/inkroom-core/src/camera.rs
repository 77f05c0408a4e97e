//! Camera module for the pan transform between screen and canvas space.

use crate::geometry::Point;
use kurbo::{Affine, Vec2};
use serde::{Deserialize, Serialize};

/// Camera holds the view offset of the local user.
///
/// It is local state: it is never written to the room and is not shared with
/// other participants.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
}

impl Camera {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// World-to-screen transform used when rendering.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset())
    }

    /// Pan by a wheel delta. Scrolling down or right moves the view content up or left.
    pub fn pan(&mut self, delta: Vec2) {
        self.x -= delta.x;
        self.y -= delta.y;
    }

    /// Convert a screen position to a canvas point.
    pub fn screen_to_canvas(&self, screen: kurbo::Point) -> Point {
        Point::new(round_half_up(screen.x - self.x), round_half_up(screen.y - self.y))
    }

    pub fn canvas_to_screen(&self, point: Point) -> kurbo::Point {
        self.transform() * point.to_kurbo()
    }
}

/// Map a pointer position to canvas coordinates under the given camera.
pub fn pointer_to_canvas_point(position: kurbo::Point, camera: &Camera) -> Point {
    camera.screen_to_canvas(position)
}

// Halves round toward positive infinity so -2.5 maps to -2, not -3.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
