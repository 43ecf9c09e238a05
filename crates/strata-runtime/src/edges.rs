//! Edge geometry
//!
//! Screen-space geometry helpers for edge rendering: polyline trimming to
//! node boundaries, arrowhead triangles, and quadratic control points for
//! curved edges. Backends draw; this module only computes.

use egui::{Pos2, Rect, Vec2};

/// Arrowhead length in screen pixels.
pub const ARROW_LENGTH: f32 = 10.0;
/// Arrowhead half-width in screen pixels.
pub const ARROW_HALF_WIDTH: f32 = 4.5;
/// Bow of a curved two-point edge, as a fraction of its length.
pub const CURVE_BOW: f32 = 0.12;

/// Arrowhead triangle at the end of a polyline, pointing along its last
/// segment. `None` for degenerate segments.
pub fn arrow_head(points: &[Pos2]) -> Option<[Pos2; 3]> {
    let tip = *points.last()?;
    let back = points.iter().rev().find(|p| **p != tip)?;
    let direction = (tip - *back).normalized();
    if !direction.x.is_finite() || !direction.y.is_finite() {
        return None;
    }
    let base = tip - direction * ARROW_LENGTH;
    let normal = Vec2::new(-direction.y, direction.x) * ARROW_HALF_WIDTH;
    Some([tip, base + normal, base - normal])
}

/// Quadratic control point bowing a straight edge sideways, for backends
/// that draw curves instead of segments.
pub fn curve_control(from: Pos2, to: Pos2) -> Pos2 {
    let mid = Pos2::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
    let direction = to - from;
    let normal = Vec2::new(-direction.y, direction.x) * CURVE_BOW;
    mid + normal
}

/// Clip the first and last segment of a polyline to the boundary of the
/// endpoint rectangles, so lines meet node borders instead of centres.
pub fn trim_to_rects(points: &mut Vec<Pos2>, from_rect: Rect, to_rect: Rect) {
    if points.len() < 2 {
        return;
    }
    let exit = boundary_exit(from_rect, points[0], points[1]);
    if let Some(exit) = exit {
        points[0] = exit;
    }
    let n = points.len();
    let entry = boundary_exit(to_rect, points[n - 1], points[n - 2]);
    if let Some(entry) = entry {
        points[n - 1] = entry;
    }
}

/// Point where the ray `inside -> outside` crosses the rect boundary.
/// `None` when `inside` is not actually inside.
fn boundary_exit(rect: Rect, inside: Pos2, outside: Pos2) -> Option<Pos2> {
    if !rect.contains(inside) || rect.contains(outside) {
        return None;
    }
    let direction = outside - inside;
    let mut t_min = 1.0f32;
    if direction.x.abs() > f32::EPSILON {
        for edge_x in [rect.min.x, rect.max.x] {
            let t = (edge_x - inside.x) / direction.x;
            if (0.0..=1.0).contains(&t) {
                let y = inside.y + direction.y * t;
                if (rect.min.y..=rect.max.y).contains(&y) {
                    t_min = t_min.min(t);
                }
            }
        }
    }
    if direction.y.abs() > f32::EPSILON {
        for edge_y in [rect.min.y, rect.max.y] {
            let t = (edge_y - inside.y) / direction.y;
            if (0.0..=1.0).contains(&t) {
                let x = inside.x + direction.x * t;
                if (rect.min.x..=rect.max.x).contains(&x) {
                    t_min = t_min.min(t);
                }
            }
        }
    }
    Some(inside + direction * t_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_points_along_last_segment() {
        let points = [Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0)];
        let [tip, left, right] = arrow_head(&points).unwrap();
        assert_eq!(tip, Pos2::new(100.0, 0.0));
        assert!((left.x - 90.0).abs() < 0.001);
        assert!((right.x - 90.0).abs() < 0.001);
        assert!((left.y + right.y).abs() < 0.001);
    }

    #[test]
    fn test_arrow_none_for_degenerate_line() {
        assert!(arrow_head(&[Pos2::ZERO, Pos2::ZERO]).is_none());
        assert!(arrow_head(&[]).is_none());
    }

    #[test]
    fn test_curve_control_is_off_axis() {
        let control = curve_control(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0));
        assert_eq!(control.x, 50.0);
        assert!(control.y.abs() > 0.001);
    }

    #[test]
    fn test_trim_stops_at_borders() {
        let from_rect = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
        let to_rect = Rect::from_min_size(Pos2::new(200.0, 0.0), Vec2::new(100.0, 100.0));
        let mut points = vec![Pos2::new(50.0, 50.0), Pos2::new(250.0, 50.0)];
        trim_to_rects(&mut points, from_rect, to_rect);
        assert_eq!(points[0], Pos2::new(100.0, 50.0));
        assert_eq!(points[1], Pos2::new(200.0, 50.0));
    }

    #[test]
    fn test_trim_leaves_outside_start_alone() {
        let from_rect = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let to_rect = Rect::from_min_size(Pos2::new(200.0, 0.0), Vec2::new(10.0, 10.0));
        let mut points = vec![Pos2::new(50.0, 5.0), Pos2::new(150.0, 5.0)];
        let before = points.clone();
        trim_to_rects(&mut points, from_rect, to_rect);
        assert_eq!(points, before);
    }
}
