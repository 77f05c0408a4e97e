//! Pressure-sensitive stroke outlines for pencil drafts and path layers.
//!
//! A stroke is turned into a closed polygon: the centre line is streamlined,
//! each sample is offset on both sides by a pressure-dependent radius and the
//! two sides are joined with round caps.

use crate::layer::PenPoint;
use kurbo::{BezPath, Point, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Segments used to approximate a half circle cap.
const CAP_SEGMENTS: usize = 6;

/// Shape parameters for stroke outlines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeOptions {
    /// Diameter of the stroke at half pressure.
    pub size: f64,
    /// How strongly pressure changes the width, 0 to 1.
    pub thinning: f64,
    /// How far apart centre samples must be before they are kept, relative to size.
    pub smoothing: f64,
    /// How much the centre line lags behind the raw input, 0 to 1.
    pub streamline: f64,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
        }
    }
}

impl StrokeOptions {
    fn radius(&self, pressure: f64) -> f64 {
        let pressure = if pressure.is_finite() { pressure.clamp(0.0, 1.0) } else { 0.5 };
        (self.size * (0.5 - self.thinning * (0.5 - pressure))).max(0.01)
    }
}

/// Compute the outline polygon of a stroke. The polygon is not explicitly closed.
///
/// The result is a pure function of its inputs.
pub fn stroke_outline(points: &[PenPoint], options: &StrokeOptions) -> Vec<Point> {
    let centre = streamline(points, options);
    match centre.as_slice() {
        [] => Vec::new(),
        [(point, pressure)] => dot(*point, options.radius(*pressure)),
        _ => offset_outline(&centre, options),
    }
}

/// Build a closed path from an outline polygon.
pub fn path_from_outline(outline: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = outline.split_first() else {
        return path;
    };
    path.move_to(*first);
    for point in rest {
        path.line_to(*point);
    }
    path.close_path();
    path
}

/// SVG path data (`M x y L x y ... Z`) for a stroke.
pub fn stroke_svg_path(points: &[PenPoint], options: &StrokeOptions) -> String {
    path_from_outline(&stroke_outline(points, options)).to_svg()
}

fn streamline(points: &[PenPoint], options: &StrokeOptions) -> Vec<(Point, f64)> {
    let Some((first, rest)) = points.split_first() else {
        return Vec::new();
    };

    let t = 0.15 + (1.0 - options.streamline.clamp(0.0, 1.0)) * 0.85;
    let min_spacing = options.size * options.smoothing.clamp(0.0, 1.0) * 0.25;

    let mut centre = vec![(Point::new(first.x, first.y), first.pressure)];
    for (i, sample) in rest.iter().enumerate() {
        let Some(&(previous, _)) = centre.last() else {
            break;
        };
        let next = previous.lerp(Point::new(sample.x, sample.y), t);
        let distance = next.distance(previous);
        let is_last = i + 1 == rest.len();
        if distance < f64::EPSILON || (distance < min_spacing && !is_last) {
            continue;
        }
        centre.push((next, sample.pressure));
    }
    centre
}

fn offset_outline(centre: &[(Point, f64)], options: &StrokeOptions) -> Vec<Point> {
    let last = centre.len() - 1;
    let mut left = Vec::with_capacity(centre.len());
    let mut right = Vec::with_capacity(centre.len());
    let mut normals = Vec::with_capacity(centre.len());

    for (i, &(point, pressure)) in centre.iter().enumerate() {
        let before = centre[i.saturating_sub(1)].0;
        let after = centre[(i + 1).min(last)].0;
        let direction = unit(after - before);
        let normal = Vec2::new(-direction.y, direction.x) * options.radius(pressure);
        left.push(point + normal);
        right.push(point - normal);
        normals.push(normal);
    }

    let mut outline = Vec::with_capacity(left.len() * 2 + CAP_SEGMENTS * 2);
    outline.extend(left.iter().copied());
    outline.extend(cap(centre[last].0, normals[last]));
    outline.extend(right.iter().rev().copied());
    outline.extend(cap(centre[0].0, -normals[0]));
    outline
}

/// Intermediate points of a half circle swept clockwise from `centre + normal`.
fn cap(centre: Point, normal: Vec2) -> impl Iterator<Item = Point> {
    let radius = normal.hypot();
    let start = normal.atan2();
    (1..CAP_SEGMENTS).map(move |step| {
        let angle = start - PI * step as f64 / CAP_SEGMENTS as f64;
        centre + Vec2::from_angle(angle) * radius
    })
}

fn dot(centre: Point, radius: f64) -> Vec<Point> {
    let segments = CAP_SEGMENTS * 2;
    (0..segments)
        .map(|step| {
            let angle = 2.0 * PI * step as f64 / segments as f64;
            centre + Vec2::from_angle(angle) * radius
        })
        .collect()
}

fn unit(v: Vec2) -> Vec2 {
    let length = v.hypot();
    if length < f64::EPSILON { Vec2::new(1.0, 0.0) } else { v / length }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(pressure: f64) -> Vec<PenPoint> {
        (0..10).map(|i| PenPoint::new(i as f64 * 10.0, 0.0, pressure)).collect()
    }

    fn max_abs_y(outline: &[Point]) -> f64 {
        outline.iter().map(|p| p.y.abs()).fold(0.0, f64::max)
    }

    #[test]
    fn test_empty_stroke() {
        assert!(stroke_outline(&[], &StrokeOptions::default()).is_empty());
        assert!(path_from_outline(&[]).elements().is_empty());
    }

    #[test]
    fn test_single_point_is_a_dot() {
        let outline = stroke_outline(&[PenPoint::new(5.0, 5.0, 0.5)], &StrokeOptions::default());
        assert_eq!(outline.len(), CAP_SEGMENTS * 2);
        for point in outline {
            assert!((point.distance(Point::new(5.0, 5.0)) - 8.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_outline_is_deterministic() {
        let points = horizontal(0.5);
        let options = StrokeOptions::default();
        assert_eq!(stroke_outline(&points, &options), stroke_outline(&points, &options));
    }

    #[test]
    fn test_outline_width_follows_pressure() {
        let options = StrokeOptions::default();
        let light = max_abs_y(&stroke_outline(&horizontal(0.0), &options));
        let heavy = max_abs_y(&stroke_outline(&horizontal(1.0), &options));
        assert!(heavy > light);
        assert!((heavy - 12.0).abs() < 1e-6);
        assert!((light - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_thinning_ignores_pressure() {
        let options = StrokeOptions {
            thinning: 0.0,
            ..Default::default()
        };
        let light = max_abs_y(&stroke_outline(&horizontal(0.1), &options));
        let heavy = max_abs_y(&stroke_outline(&horizontal(0.9), &options));
        assert!((light - heavy).abs() < 1e-9);
    }

    #[test]
    fn test_svg_path_is_closed() {
        let svg = stroke_svg_path(&horizontal(0.5), &StrokeOptions::default());
        assert!(svg.starts_with('M'));
        assert!(svg.contains('L'));
        assert!(svg.trim_end().ends_with('Z'));
    }
}
