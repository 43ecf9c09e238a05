//! Layout transitions
//!
//! When a layout pass moves everything at once, the view animates from the
//! old geometry to the new instead of snapping. A transition captures the
//! world-space geometry on both sides and interpolates with cubic easing;
//! sampling writes into a render clone, never the authoritative model.

use std::collections::HashMap;

use egui::{Pos2, Vec2};

use strata_model::CanvasData;

/// Default animation length in seconds.
pub const DEFAULT_TRANSITION_SECONDS: f32 = 0.25;

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// World-space geometry of one node at capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSnapshot {
    pub position: Pos2,
    pub size: Vec2,
}

impl NodeSnapshot {
    pub fn new(position: Pos2, size: Vec2) -> Self {
        Self { position, size }
    }
}

/// Geometry of every visible node at one instant.
#[derive(Debug, Clone, Default)]
pub struct LayoutSnapshot {
    nodes: HashMap<String, NodeSnapshot>,
}

impl LayoutSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, guid: impl Into<String>, snapshot: NodeSnapshot) {
        self.nodes.insert(guid.into(), snapshot);
    }

    pub fn get(&self, guid: &str) -> Option<&NodeSnapshot> {
        self.nodes.get(guid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Capture the world geometry of every visible node.
    pub fn from_canvas(data: &CanvasData) -> Self {
        let mut snapshot = Self::new();
        data.for_each_node(|node, abs, _| {
            if !node.visible {
                return;
            }
            let world = node.metadata.world_position.unwrap_or(abs);
            snapshot.add_node(node.guid.clone(), NodeSnapshot::new(world, node.size));
        });
        snapshot
    }
}

// =============================================================================
// TRANSITION
// =============================================================================

/// An in-flight animation between two layout snapshots.
#[derive(Debug, Clone)]
pub struct LayoutTransition {
    from: LayoutSnapshot,
    to: LayoutSnapshot,
    duration: f32,
    elapsed: f32,
}

impl LayoutTransition {
    pub fn new(from: LayoutSnapshot, to: LayoutSnapshot, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(f32::EPSILON),
            elapsed: 0.0,
        }
    }

    /// Advance by a frame delta. Returns true while still animating.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Eased progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        ease_in_out_cubic(self.elapsed / self.duration)
    }

    /// Interpolated geometry for one node. Nodes that only exist on one
    /// side jump straight to their target.
    pub fn sample(&self, guid: &str) -> Option<NodeSnapshot> {
        let to = self.to.get(guid)?;
        let Some(from) = self.from.get(guid) else {
            return Some(*to);
        };
        let t = self.progress();
        Some(NodeSnapshot::new(
            Pos2::new(
                lerp_f32(from.position.x, to.position.x, t),
                lerp_f32(from.position.y, to.position.y, t),
            ),
            Vec2::new(
                lerp_f32(from.size.x, to.size.x, t),
                lerp_f32(from.size.y, to.size.y, t),
            ),
        ))
    }

    /// Write interpolated world geometry into a render clone.
    pub fn sample_into(&self, data: &mut CanvasData) {
        fn walk(node: &mut strata_model::CanvasNode, transition: &LayoutTransition) {
            if let Some(sample) = transition.sample(&node.guid) {
                node.metadata.world_position = Some(sample.position);
                node.size = sample.size;
            }
            for child in &mut node.children {
                walk(child, transition);
            }
        }
        for root in &mut data.nodes {
            walk(root, self);
        }
    }
}

// =============================================================================
// EASING
// =============================================================================

pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Fast start, slow finish.
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Slow start and finish, symmetric midpoint.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
