//! Camera - pan/zoom with smooth interpolation
//!
//! The camera is a world-space offset plus a zoom factor:
//! `screen = (world - camera) * zoom`. Targets allow smooth animation; only
//! the authoritative `(x, y, zoom)` triple is persisted.

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;

/// 2D camera with pan and zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CameraWire", into = "CameraWire")]
pub struct Camera {
    /// World offset: the world point drawn at the screen origin.
    pub x: f32,
    pub y: f32,
    /// Zoom level, strictly positive.
    pub zoom: f32,

    /// Target offset for smooth interpolation.
    pub target_x: f32,
    pub target_y: f32,
    pub target_zoom: f32,
    /// Interpolation speed (0.0-1.0, higher = faster).
    pub lerp_speed: f32,
}

/// Persisted shape: offset and zoom only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CameraWire {
    x: f32,
    y: f32,
    zoom: f32,
}

impl From<CameraWire> for Camera {
    fn from(wire: CameraWire) -> Self {
        Camera::at(wire.x, wire.y, wire.zoom)
    }
}

impl From<Camera> for CameraWire {
    fn from(camera: Camera) -> Self {
        CameraWire {
            x: camera.x,
            y: camera.y,
            zoom: camera.zoom,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::at(0.0, 0.0, 1.0)
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera snapped at the given offset and zoom.
    pub fn at(x: f32, y: f32, zoom: f32) -> Self {
        let zoom = if zoom.is_finite() && zoom > 0.0 {
            zoom
        } else {
            1.0
        };
        Self {
            x,
            y,
            zoom,
            target_x: x,
            target_y: y,
            target_zoom: zoom,
            lerp_speed: 0.15,
        }
    }

    pub fn offset(&self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    /// All authoritative components are finite and zoom is positive.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.zoom.is_finite() && self.zoom > 0.0
    }

    /// Update camera with smooth interpolation (call every frame).
    pub fn update(&mut self, dt: f32) {
        let t = (self.lerp_speed * dt * 60.0).min(1.0);
        self.x = lerp(self.x, self.target_x, t);
        self.y = lerp(self.y, self.target_y, t);
        self.zoom = lerp(self.zoom, self.target_zoom, t);
    }

    /// Snap to target immediately (no interpolation).
    pub fn snap_to_target(&mut self) {
        self.x = self.target_x;
        self.y = self.target_y;
        self.zoom = self.target_zoom;
    }

    /// Move both current and target to an exact offset.
    pub fn set_offset(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.target_x = x;
        self.target_y = y;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom = zoom;
        self.target_zoom = zoom;
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, screen_delta: Vec2) {
        self.target_x -= screen_delta.x / self.zoom;
        self.target_y -= screen_delta.y / self.zoom;
    }

    /// Zoom by factor, keeping the world point under `screen_pos` fixed.
    pub fn zoom_at(&mut self, factor: f32, screen_pos: Pos2) {
        let old_zoom = self.target_zoom;
        let new_zoom = (old_zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - old_zoom).abs() < 0.0001 {
            return;
        }
        // Keep screen_pos anchored: world = screen/zoom + offset stays equal.
        self.target_x += screen_pos.x / old_zoom - screen_pos.x / new_zoom;
        self.target_y += screen_pos.y / old_zoom - screen_pos.y / new_zoom;
        self.target_zoom = new_zoom;
    }

    /// Transform a world position to screen coordinates.
    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        Pos2::new((world.x - self.x) * self.zoom, (world.y - self.y) * self.zoom)
    }

    /// Transform a screen position to world coordinates.
    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        Pos2::new(screen.x / self.zoom + self.x, screen.y / self.zoom + self.y)
    }

    /// World-space rectangle covered by a viewport of the given size.
    pub fn visible_bounds(&self, viewport: Vec2) -> Rect {
        Rect::from_min_size(self.offset(), viewport / self.zoom)
    }

    /// Whether a world-space rect intersects the viewport.
    pub fn is_visible(&self, world_rect: Rect, viewport: Vec2) -> bool {
        self.visible_bounds(viewport).intersects(world_rect)
    }

    /// Frame a world-space bounding box inside the viewport with padding.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Vec2, padding: f32) {
        if bounds.is_negative() || bounds.width() < 1.0 || bounds.height() < 1.0 {
            return;
        }
        let usable = (viewport - Vec2::splat(padding * 2.0)).max(Vec2::splat(1.0));
        let zoom = (usable.x / bounds.width())
            .min(usable.y / bounds.height())
            .clamp(MIN_ZOOM, MAX_ZOOM);
        self.target_zoom = zoom;
        let center = bounds.center();
        self.target_x = center.x - viewport.x / (2.0 * zoom);
        self.target_y = center.y - viewport.y / (2.0 * zoom);
    }

    /// Center on a world-space bounding box at the given zoom, snapping
    /// immediately. Used by the camera bounds guard.
    pub fn center_on(&mut self, bounds: Rect, viewport: Vec2, zoom: f32) {
        let zoom = if zoom.is_finite() && zoom > 0.0 {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
        let center = bounds.center();
        self.x = center.x - viewport.x / (2.0 * zoom);
        self.y = center.y - viewport.y / (2.0 * zoom);
        self.zoom = zoom;
        self.target_x = self.x;
        self.target_y = self.y;
        self.target_zoom = zoom;
    }

    /// Reset to origin at 100% zoom.
    pub fn reset(&mut self) {
        *self = Camera::default();
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_screen_roundtrip() {
        let camera = Camera::at(100.0, 200.0, 1.25);
        let world = Pos2::new(340.0, -20.0);
        let screen = camera.world_to_screen(world);
        let back = camera.screen_to_world(screen);
        assert!((back.x - world.x).abs() < 0.001);
        assert!((back.y - world.y).abs() < 0.001);
    }

    #[test]
    fn test_screen_formula() {
        // screen = (world - camera) * zoom
        let camera = Camera::at(10.0, 20.0, 2.0);
        let screen = camera.world_to_screen(Pos2::new(15.0, 30.0));
        assert_eq!(screen, Pos2::new(10.0, 20.0));
    }

    #[test]
    fn test_zoom_at_keeps_anchor_fixed() {
        let mut camera = Camera::at(0.0, 0.0, 1.0);
        let anchor = Pos2::new(400.0, 300.0);
        let world_before = camera.screen_to_world(anchor);
        camera.zoom_at(2.0, anchor);
        camera.snap_to_target();
        let world_after = camera.screen_to_world(anchor);
        assert!((world_before.x - world_after.x).abs() < 0.01);
        assert!((world_before.y - world_after.y).abs() < 0.01);
    }

    #[test]
    fn test_fit_to_bounds_contains_content() {
        let mut camera = Camera::new();
        let bounds = Rect::from_min_size(Pos2::new(-100.0, -50.0), Vec2::new(400.0, 300.0));
        let viewport = Vec2::new(800.0, 600.0);
        camera.fit_to_bounds(bounds, viewport, 20.0);
        camera.snap_to_target();
        let visible = camera.visible_bounds(viewport);
        assert!(visible.contains_rect(bounds));
    }

    #[test]
    fn test_wire_serde_drops_targets() {
        let camera = Camera::at(5.0, 6.0, 0.75);
        let json = serde_json::to_value(&camera).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"x": 5.0, "y": 6.0, "zoom": 0.75})
        );
        let back: Camera = serde_json::from_value(json).unwrap();
        assert_eq!(back.x, 5.0);
        assert_eq!(back.target_zoom, 0.75);
    }

    #[test]
    fn test_non_positive_zoom_is_repaired() {
        let camera = Camera::at(0.0, 0.0, 0.0);
        assert_eq!(camera.zoom, 1.0);
    }
}
