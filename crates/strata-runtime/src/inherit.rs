//! Edge inheritance
//!
//! When a subtree collapses, edges into it are rewired to the nearest
//! visible ancestor of each hidden endpoint. The render edge set is always
//! recomputed from `originalEdges`; inherited edges never flow back into
//! the authoritative set, so a second pass over the output is a no-op.

use std::collections::HashMap;

use egui::Color32;

use strata_model::{CanvasData, CanvasEdge, CanvasNode, INHERITED_EDGE_PREFIX};

/// Stroke width ceiling for inherited edges.
pub const INHERITED_WIDTH_CAP: f32 = 6.0;
/// Dash pattern marking inherited edges.
pub const INHERITED_DASH: [f32; 2] = [4.0, 4.0];

// =============================================================================
// VISIBILITY
// =============================================================================

/// Effective visibility per node: the node's own flag, and every ancestor
/// neither collapsed nor hidden.
pub fn effective_visibility(data: &CanvasData) -> HashMap<String, bool> {
    let mut map = HashMap::new();
    fn walk(node: &CanvasNode, ancestors_open: bool, map: &mut HashMap<String, bool>) {
        let visible = node.visible && ancestors_open;
        map.insert(node.guid.clone(), visible);
        let children_open = visible && !node.collapsed;
        for child in &node.children {
            walk(child, children_open, map);
        }
    }
    for root in &data.nodes {
        walk(root, true, &mut map);
    }
    map
}

fn parent_links(data: &CanvasData) -> HashMap<String, String> {
    let mut parents = HashMap::new();
    fn walk(node: &CanvasNode, parents: &mut HashMap<String, String>) {
        for child in &node.children {
            parents.insert(child.guid.clone(), node.guid.clone());
            walk(child, parents);
        }
    }
    for root in &data.nodes {
        walk(root, &mut parents);
    }
    parents
}

// =============================================================================
// REWIRING
// =============================================================================

/// Recompute `data.edges` from `data.original_edges` under the current
/// visibility. Hidden endpoints are walked up to their nearest visible
/// ancestor; edges with no visible stand-in, or whose stand-ins coincide,
/// are dropped.
pub fn recompute_edges(data: &mut CanvasData) {
    let visibility = effective_visibility(data);
    let parents = parent_links(data);

    let is_visible = |guid: &str| visibility.get(guid).copied().unwrap_or(false);
    let nearest_visible_ancestor = |guid: &str| -> Option<String> {
        let mut current = parents.get(guid)?;
        loop {
            if is_visible(current) {
                return Some(current.clone());
            }
            current = parents.get(current)?;
        }
    };

    let mut edges = Vec::with_capacity(data.original_edges.len());
    for edge in &data.original_edges {
        let from_visible = is_visible(&edge.from_guid);
        let to_visible = is_visible(&edge.to_guid);

        if from_visible && to_visible {
            edges.push(edge.clone());
            continue;
        }

        let from = if from_visible {
            Some(edge.from_guid.clone())
        } else {
            nearest_visible_ancestor(&edge.from_guid)
        };
        let to = if to_visible {
            Some(edge.to_guid.clone())
        } else {
            nearest_visible_ancestor(&edge.to_guid)
        };
        match (from, to) {
            (Some(from), Some(to)) if from != to => {
                edges.push(inherited_edge(edge, from, to));
            }
            _ => {}
        }
    }
    data.edges = edges;
}

/// Rewired stand-in for an edge with a hidden endpoint: darker, slightly
/// heavier, dashed.
fn inherited_edge(original: &CanvasEdge, from: String, to: String) -> CanvasEdge {
    let mut edge = original.clone();
    edge.guid = format!("{INHERITED_EDGE_PREFIX}{}", original.guid);
    edge.from_guid = from;
    edge.to_guid = to;
    edge.style.color = darken(original.style.color);
    edge.style.width = (original.style.width + 1.0).min(INHERITED_WIDTH_CAP);
    edge.style.dash = Some(INHERITED_DASH);
    edge.waypoints.clear();
    edge
}

fn darken(color: Color32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * 0.7) as u8,
        (color.g() as f32 * 0.7) as u8,
        (color.b() as f32 * 0.7) as u8,
        color.a(),
    )
}
