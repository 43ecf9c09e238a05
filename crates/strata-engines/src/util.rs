//! Shared engine helpers: tree walks, coordinate conversion, camera framing.

use std::collections::{BTreeMap, HashMap};

use egui::{Pos2, Rect, Vec2};

use strata_model::{Camera, LayoutGraph};

/// Stamp the active engine label on the graph and every node.
pub fn stamp_display_mode(graph: &mut LayoutGraph, name: &str) {
    graph.display_mode = Some(name.to_string());
    for entry in graph.nodes.values_mut() {
        entry.metadata.display_mode = Some(name.to_string());
    }
}

/// Recompute the `worldPosition` mirror top-down from the roots.
pub fn compute_world_metadata(graph: &mut LayoutGraph) {
    let mut stack: Vec<(String, Pos2)> = graph
        .root_ids
        .iter()
        .map(|id| (id.clone(), Pos2::ZERO))
        .collect();
    while let Some((id, origin)) = stack.pop() {
        let Some(entry) = graph.nodes.get_mut(&id) else {
            continue;
        };
        let abs = origin + entry.geometry.position().to_vec2();
        entry.metadata.world_position = Some(abs);
        for child in entry.children.clone() {
            stack.push((child, abs));
        }
    }
}

/// Parent id for every node, derived once from the children lists.
pub fn parent_map(graph: &LayoutGraph) -> HashMap<String, String> {
    let mut parents = HashMap::new();
    for entry in graph.nodes.values() {
        for child in &entry.children {
            parents.insert(child.clone(), entry.id.clone());
        }
    }
    parents
}

/// Node ids grouped by depth from the roots, breadth-first. Child order is
/// preserved within each layer.
pub fn depth_layers(graph: &LayoutGraph) -> Vec<Vec<String>> {
    let mut layers: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = graph.root_ids.clone();
    let mut guard = 0usize;
    while !current.is_empty() && guard <= graph.nodes.len() {
        let mut next = Vec::new();
        for id in &current {
            if let Some(entry) = graph.nodes.get(id) {
                next.extend(entry.children.iter().cloned());
            }
        }
        layers.push(std::mem::take(&mut current));
        current = next;
        guard += 1;
    }
    layers
}

/// Convert a map of absolute positions into parent-relative geometry.
pub fn apply_absolute_positions(graph: &mut LayoutGraph, absolute: &BTreeMap<String, Pos2>) {
    let parents = parent_map(graph);
    let ids: Vec<String> = graph.nodes.keys().cloned().collect();
    for id in ids {
        let Some(abs) = absolute.get(&id) else {
            continue;
        };
        let parent_abs = parents
            .get(&id)
            .and_then(|parent| absolute.get(parent))
            .copied()
            .unwrap_or(Pos2::ZERO);
        if let Some(entry) = graph.nodes.get_mut(&id) {
            entry.set_position(Pos2::new(abs.x - parent_abs.x, abs.y - parent_abs.y));
            entry.metadata.world_position = Some(*abs);
        }
    }
}

/// Bounding box over a set of absolute rectangles.
pub fn bounds_of(absolute: &BTreeMap<String, Pos2>, graph: &LayoutGraph) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for (id, pos) in absolute {
        let Some(entry) = graph.nodes.get(id) else {
            continue;
        };
        let rect = Rect::from_min_size(*pos, entry.geometry.size());
        bounds = Some(match bounds {
            Some(acc) => acc.union(rect),
            None => rect,
        });
    }
    bounds
}

/// Camera framing content bounds: fixed zoom, padded, centered on the
/// viewport when one is known.
pub fn frame_camera(bounds: Rect, viewport: Option<Vec2>, padding: f32, zoom: f32) -> Camera {
    match viewport {
        Some(viewport) => {
            let center = bounds.center();
            Camera::at(
                center.x - viewport.x / (2.0 * zoom),
                center.y - viewport.y / (2.0 * zoom),
                zoom,
            )
        }
        None => Camera::at(bounds.min.x - padding, bounds.min.y - padding, zoom),
    }
}
