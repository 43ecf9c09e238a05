//! Canvas data: the authoritative mutable view model
//!
//! `CanvasData` holds the ordered root set of the containment tree, the
//! derived render edge set, the authoritative unfiltered edge set, and the
//! camera. `originalEdges` is the truth; `edges` is a projection recomputed
//! after any visibility change.

use std::collections::BTreeMap;

use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::edge::CanvasEdge;
use crate::node::CanvasNode;
use crate::Camera;

// =============================================================================
// CANVAS METADATA
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasMetadata {
    /// Root GUIDs recorded by the last conversion, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_ids: Option<Vec<String>>,

    /// Monotonic counter bumped on every layout pass.
    #[serde(default)]
    pub layout_version: u64,

    /// Label of the engine that produced the current layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// CANVAS DATA
// =============================================================================

/// The nested render tree plus edge sets and camera for one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasData {
    #[serde(default = "Uuid::nil")]
    pub canvas_id: Uuid,

    /// Ordered root set.
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,

    /// Current render set: only edges whose (rewired) endpoints are visible.
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,

    /// Authoritative unfiltered set; never filtered by visibility.
    #[serde(default)]
    pub original_edges: Vec<CanvasEdge>,

    #[serde(default)]
    pub camera: Camera,

    #[serde(default)]
    pub metadata: CanvasMetadata,
}

impl Default for CanvasData {
    fn default() -> Self {
        Self {
            canvas_id: Uuid::nil(),
            nodes: Vec::new(),
            edges: Vec::new(),
            original_edges: Vec::new(),
            camera: Camera::default(),
            metadata: CanvasMetadata::default(),
        }
    }
}

impl CanvasData {
    pub fn new() -> Self {
        Self {
            canvas_id: Uuid::new_v4(),
            ..Self::default()
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    pub fn find_node(&self, guid: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find_map(|root| root.find(guid))
    }

    pub fn find_node_mut(&mut self, guid: &str) -> Option<&mut CanvasNode> {
        self.nodes.iter_mut().find_map(|root| root.find_mut(guid))
    }

    pub fn contains_node(&self, guid: &str) -> bool {
        self.find_node(guid).is_some()
    }

    /// GUIDs of the ancestors of `guid`, root first, target excluded.
    pub fn path_to(&self, guid: &str) -> Option<Vec<String>> {
        fn search(node: &CanvasNode, guid: &str, path: &mut Vec<String>) -> bool {
            if node.guid == guid {
                return true;
            }
            path.push(node.guid.clone());
            for child in &node.children {
                if search(child, guid, path) {
                    return true;
                }
            }
            path.pop();
            false
        }

        let mut path = Vec::new();
        for root in &self.nodes {
            if search(root, guid, &mut path) {
                return Some(path);
            }
        }
        None
    }

    /// Parent GUID of a node, `None` for roots and unknown GUIDs.
    pub fn parent_of(&self, guid: &str) -> Option<String> {
        self.path_to(guid).and_then(|path| path.last().cloned())
    }

    /// Visit every node depth-first with its absolute position and depth.
    pub fn for_each_node(&self, mut f: impl FnMut(&CanvasNode, Pos2, usize)) {
        fn walk(node: &CanvasNode, origin: Pos2, depth: usize, f: &mut impl FnMut(&CanvasNode, Pos2, usize)) {
            let abs = origin + node.position.to_vec2();
            f(node, abs, depth);
            for child in &node.children {
                walk(child, abs, depth + 1, f);
            }
        }
        for root in &self.nodes {
            walk(root, Pos2::ZERO, 0, &mut f);
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.for_each_node(|_, _, _| count += 1);
        count
    }

    // =========================================================================
    // GEOMETRY MAINTENANCE
    // =========================================================================

    /// Absolute position of a node computed by summing the parent chain.
    pub fn absolute_position(&self, guid: &str) -> Option<Pos2> {
        let path = self.path_to(guid)?;
        let mut origin = Pos2::ZERO;
        let mut nodes = &self.nodes;
        for ancestor in &path {
            let node = nodes.iter().find(|n| &n.guid == ancestor)?;
            origin += node.position.to_vec2();
            nodes = &node.children;
        }
        let node = nodes.iter().find(|n| n.guid == guid)?;
        Some(origin + node.position.to_vec2())
    }

    /// Recompute the `worldPosition` mirror for the whole tree.
    pub fn refresh_world_positions(&mut self) {
        fn walk(node: &mut CanvasNode, origin: Pos2) {
            let abs = origin + node.position.to_vec2();
            node.metadata.world_position = Some(abs);
            for child in &mut node.children {
                walk(child, abs);
            }
        }
        for root in &mut self.nodes {
            walk(root, Pos2::ZERO);
        }
    }

    /// Recompute the mirror for one subtree, using the tree around it.
    pub fn refresh_world_positions_from(&mut self, guid: &str) {
        let Some(path) = self.path_to(guid) else {
            return;
        };
        let mut origin = Pos2::ZERO;
        let mut nodes = &mut self.nodes;
        for ancestor in &path {
            let Some(node) = nodes.iter_mut().find(|n| &n.guid == ancestor) else {
                return;
            };
            origin += node.position.to_vec2();
            nodes = &mut node.children;
        }
        if let Some(node) = nodes.iter_mut().find(|n| n.guid == guid) {
            fn walk(node: &mut CanvasNode, origin: Pos2) {
                let abs = origin + node.position.to_vec2();
                node.metadata.world_position = Some(abs);
                for child in &mut node.children {
                    walk(child, abs);
                }
            }
            walk(node, origin);
        }
    }

    /// Invalidate waypoints of every edge touching the given node.
    pub fn invalidate_edge_waypoints(&mut self, guid: &str) {
        for edge in self.edges.iter_mut().chain(self.original_edges.iter_mut()) {
            if edge.touches(guid) {
                edge.invalidate_waypoints();
            }
        }
    }

    // =========================================================================
    // BOUNDS
    // =========================================================================

    /// World-space bounding box over all visible nodes.
    pub fn content_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        self.for_each_node(|node, abs, _| {
            if !node.visible {
                return;
            }
            let rect = Rect::from_min_size(abs, node.size);
            bounds = Some(match bounds {
                Some(acc) => acc.union(rect),
                None => rect,
            });
        });
        bounds
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Clear `selected` on every node.
    pub fn clear_selection(&mut self) {
        fn walk(node: &mut CanvasNode) {
            node.selected = false;
            for child in &mut node.children {
                walk(child);
            }
        }
        for root in &mut self.nodes {
            walk(root);
        }
    }

    /// GUID of the first selected node, if any.
    pub fn selected_guid(&self) -> Option<String> {
        let mut found = None;
        self.for_each_node(|node, _, _| {
            if node.selected && found.is_none() {
                found = Some(node.guid.clone());
            }
        });
        found
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Structural issues: duplicate GUIDs and dangling edge endpoints.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = std::collections::HashSet::new();
        self.for_each_node(|node, _, _| {
            if !seen.insert(node.guid.clone()) {
                issues.push(format!("duplicate node GUID: {}", node.guid));
            }
        });
        for edge in &self.original_edges {
            if !seen.contains(&edge.from_guid) {
                issues.push(format!(
                    "edge {} references unknown source {}",
                    edge.guid, edge.from_guid
                ));
            }
            if !seen.contains(&edge.to_guid) {
                issues.push(format!(
                    "edge {} references unknown target {}",
                    edge.guid, edge.to_guid
                ));
            }
        }
        issues
    }
}
