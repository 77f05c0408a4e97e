//! Canvas geometry: integer points, bounding boxes, edge-set resizing and
//! rectangle intersection.

use crate::layer::{Layer, LayerId};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};

/// A point in canvas space, rounded to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// L1 distance between two points.
    pub fn manhattan_distance(self, other: Point) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }

    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x as f64, self.y as f64)
    }
}

/// Axis-aligned box with non-negative width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYWH {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl XYWH {
    /// Negative or non-finite sizes collapse to zero.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: non_negative(width),
            height: non_negative(height),
        }
    }

    /// The box spanned by two opposite corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::from_rect(Rect::from_points(a.to_kurbo(), b.to_kurbo()))
    }

    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        let (px, py) = (point.x as f64, point.y as f64);
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Strict overlap: boxes that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &XYWH) -> bool {
        self.right() > other.x
            && self.x < other.right()
            && self.bottom() > other.y
            && self.y < other.bottom()
    }

    pub fn union(&self, other: &XYWH) -> XYWH {
        XYWH::from_rect(self.to_rect().union(other.to_rect()))
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Set of box edges, used to name the corner or edge handle being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Side(u8);

impl Side {
    pub const NONE: Side = Side(0);
    pub const TOP: Side = Side(1);
    pub const BOTTOM: Side = Side(2);
    pub const LEFT: Side = Side(4);
    pub const RIGHT: Side = Side(8);

    /// Whether every edge in `other` is part of this set.
    pub const fn contains(self, other: Side) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Side {
    type Output = Side;

    fn bitor(self, rhs: Side) -> Side {
        Side(self.0 | rhs.0)
    }
}

impl BitOrAssign for Side {
    fn bitor_assign(&mut self, rhs: Side) {
        self.0 |= rhs.0;
    }
}

/// Compute the box produced by dragging the `corner` edges of `bounds` to `point`.
///
/// Each edge in the set moves independently and crossing the opposite edge flips
/// the box instead of producing a negative size. An axis named twice (both
/// left and right, or both top and bottom) is left unchanged.
pub fn resize_bounds(bounds: XYWH, corner: Side, point: Point) -> XYWH {
    let (px, py) = (point.x as f64, point.y as f64);
    let mut result = bounds;

    if corner.contains(Side::LEFT) && corner.contains(Side::RIGHT) {
        log::warn!("Ignoring horizontal resize with both left and right edges selected");
    } else if corner.contains(Side::LEFT) {
        result.x = px.min(bounds.right());
        result.width = (bounds.right() - px).abs();
    } else if corner.contains(Side::RIGHT) {
        result.x = px.min(bounds.x);
        result.width = (px - bounds.x).abs();
    }

    if corner.contains(Side::TOP) && corner.contains(Side::BOTTOM) {
        log::warn!("Ignoring vertical resize with both top and bottom edges selected");
    } else if corner.contains(Side::TOP) {
        result.y = py.min(bounds.bottom());
        result.height = (bounds.bottom() - py).abs();
    } else if corner.contains(Side::BOTTOM) {
        result.y = py.min(bounds.y);
        result.height = (py - bounds.y).abs();
    }

    XYWH::new(result.x, result.y, result.width, result.height)
}

/// Ids (in the given order) of the layers whose bounds overlap the rectangle
/// spanned by `origin` and `current`. Ids with no layer are skipped.
pub fn layers_intersecting_rect(
    layer_ids: &[LayerId],
    layers: &HashMap<LayerId, Layer>,
    origin: Point,
    current: Point,
) -> Vec<LayerId> {
    let rect = XYWH::from_corners(origin, current);
    layer_ids
        .iter()
        .filter(|id| {
            layers
                .get(*id)
                .is_some_and(|layer| rect.intersects(&layer.bounds()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Color, LayerType};

    fn square() -> XYWH {
        XYWH::new(0.0, 0.0, 50.0, 50.0)
    }

    #[test]
    fn test_resize_right_edge() {
        let result = resize_bounds(square(), Side::RIGHT, Point::new(80, 0));
        assert_eq!(result, XYWH::new(0.0, 0.0, 80.0, 50.0));
    }

    #[test]
    fn test_resize_left_edge() {
        let result = resize_bounds(square(), Side::LEFT, Point::new(20, 0));
        assert_eq!(result, XYWH::new(20.0, 0.0, 30.0, 50.0));
    }

    #[test]
    fn test_resize_corner() {
        let result = resize_bounds(square(), Side::BOTTOM | Side::RIGHT, Point::new(70, 90));
        assert_eq!(result, XYWH::new(0.0, 0.0, 70.0, 90.0));
    }

    #[test]
    fn test_resize_flips_past_opposite_edge() {
        let result = resize_bounds(square(), Side::RIGHT, Point::new(-10, 0));
        assert_eq!(result, XYWH::new(-10.0, 0.0, 10.0, 50.0));

        let result = resize_bounds(square(), Side::TOP, Point::new(0, 70));
        assert_eq!(result, XYWH::new(0.0, 50.0, 50.0, 20.0));
    }

    #[test]
    fn test_resize_contradictory_axis_unchanged() {
        let result = resize_bounds(square(), Side::LEFT | Side::RIGHT | Side::BOTTOM, Point::new(90, 90));
        assert_eq!(result, XYWH::new(0.0, 0.0, 50.0, 90.0));
    }

    #[test]
    fn test_resize_never_negative() {
        for (x, y) in [(-100, -100), (0, 0), (25, 25), (500, -3)] {
            for corner in [Side::TOP | Side::LEFT, Side::BOTTOM | Side::RIGHT, Side::TOP, Side::LEFT] {
                let result = resize_bounds(square(), corner, Point::new(x, y));
                assert!(result.width >= 0.0 && result.height >= 0.0);
            }
        }
    }

    #[test]
    fn test_side_contains() {
        let corner = Side::TOP | Side::LEFT;
        assert!(corner.contains(Side::TOP));
        assert!(corner.contains(Side::LEFT));
        assert!(!corner.contains(Side::RIGHT));
        assert!(!corner.contains(Side::NONE));
    }

    #[test]
    fn test_intersection_is_strict() {
        let a = XYWH::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&XYWH::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&XYWH::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.intersects(&XYWH::new(20.0, 20.0, 1.0, 1.0)));
    }

    #[test]
    fn test_layers_intersecting_rect_keeps_order() {
        let ids: Vec<LayerId> = ["a", "b", "c", "missing"].into_iter().map(LayerId::from).collect();
        let mut layers = HashMap::new();
        layers.insert(
            LayerId::from("a"),
            Layer::new(LayerType::Rectangle, XYWH::new(0.0, 0.0, 10.0, 10.0), Color::BLACK),
        );
        layers.insert(
            LayerId::from("b"),
            Layer::new(LayerType::Ellipse, XYWH::new(100.0, 100.0, 10.0, 10.0), Color::BLACK),
        );
        layers.insert(
            LayerId::from("c"),
            Layer::new(LayerType::Note, XYWH::new(5.0, 5.0, 10.0, 10.0), Color::BLACK),
        );

        // Dragged up-left; corners arrive in reverse order.
        let hits = layers_intersecting_rect(&ids, &layers, Point::new(20, 20), Point::new(-5, -5));
        assert_eq!(hits, vec![LayerId::from("a"), LayerId::from("c")]);
    }

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(Point::new(0, 0).manhattan_distance(Point::new(3, -4)), 7);
    }
}
