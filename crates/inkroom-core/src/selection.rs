//! Selection bounds and resize handles.

use crate::document::DocumentSnapshot;
use crate::geometry::{Point, Side, XYWH};
use crate::layer::LayerId;

/// A resize handle: a square centred on a corner or edge midpoint of the
/// selection bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Centre in canvas coordinates.
    pub position: kurbo::Point,
    /// Edges moved when this handle is dragged.
    pub corner: Side,
}

impl Handle {
    pub fn new(position: kurbo::Point, corner: Side) -> Self {
        Self { position, corner }
    }

    /// Whether `point` lies on the handle square of side `size`.
    pub fn hit_test(&self, point: Point, size: f64) -> bool {
        let half = size / 2.0;
        (point.x as f64 - self.position.x).abs() <= half
            && (point.y as f64 - self.position.y).abs() <= half
    }
}

/// The eight handles of a box: corners first, then edge midpoints.
pub fn resize_handles(bounds: XYWH) -> [Handle; 8] {
    let (left, top, right, bottom) = (bounds.x, bounds.y, bounds.right(), bounds.bottom());
    let mid_x = left + bounds.width / 2.0;
    let mid_y = top + bounds.height / 2.0;
    let at = |x: f64, y: f64, corner: Side| Handle::new(kurbo::Point::new(x, y), corner);
    [
        at(left, top, Side::TOP | Side::LEFT),
        at(right, top, Side::TOP | Side::RIGHT),
        at(left, bottom, Side::BOTTOM | Side::LEFT),
        at(right, bottom, Side::BOTTOM | Side::RIGHT),
        at(mid_x, top, Side::TOP),
        at(mid_x, bottom, Side::BOTTOM),
        at(left, mid_y, Side::LEFT),
        at(right, mid_y, Side::RIGHT),
    ]
}

/// The handle under `point`, if any.
pub fn handle_at(bounds: XYWH, point: Point, size: f64) -> Option<Side> {
    resize_handles(bounds)
        .into_iter()
        .find(|handle| handle.hit_test(point, size))
        .map(|handle| handle.corner)
}

/// Union of the bounds of the selected layers that exist.
pub fn selection_bounds(document: &DocumentSnapshot, selection: &[LayerId]) -> Option<XYWH> {
    selection
        .iter()
        .filter_map(|id| document.get(id))
        .map(|layer| layer.bounds())
        .reduce(|acc, bounds| acc.union(&bounds))
}
