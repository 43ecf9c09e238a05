//! Layout graph - the flat wire format between normalizer, engines, and
//! orchestrator
//!
//! Engines never see the nested render tree. They operate on flat maps keyed
//! by id, with children expressed as GUID lists. `BTreeMap` keeps iteration
//! deterministic, which deterministic engines rely on.

use std::collections::BTreeMap;

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::edge::EdgeStyle;
use crate::node::{NodeKind, NodeMetadata, NodeStyle};

// =============================================================================
// GEOMETRY & STATE
// =============================================================================

/// Parent-relative geometry of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for NodeGeometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 160.0,
            height: 80.0,
        }
    }
}

impl NodeGeometry {
    pub fn new(position: Pos2, size: Vec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.x,
            height: size.y,
        }
    }

    pub fn position(&self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position(), self.size())
    }
}

/// Visibility state flags of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default = "crate::node::default_true")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub dragging: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self::VISIBLE
    }
}

impl NodeState {
    pub const VISIBLE: NodeState = NodeState {
        collapsed: false,
        visible: true,
        selected: false,
        dragging: false,
    };
}

// =============================================================================
// WIRE ENTRIES
// =============================================================================

/// One node in the flat layout graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNodeEntry {
    pub id: String,
    #[serde(default)]
    pub display_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub geometry: NodeGeometry,
    #[serde(default)]
    pub state: NodeState,
    #[serde(default)]
    pub style: NodeStyle,
    #[serde(default)]
    pub metadata: NodeMetadata,
    /// Child GUIDs in sibling order.
    #[serde(default)]
    pub children: Vec<String>,
    /// Ids of edges incident to this node.
    #[serde(default)]
    pub edges: Vec<String>,
}

impl LayoutNodeEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            display_id: id.clone(),
            id,
            label: label.into(),
            kind,
            geometry: NodeGeometry {
                width: kind.default_size().x,
                height: kind.default_size().y,
                ..NodeGeometry::default()
            },
            state: NodeState::VISIBLE,
            style: NodeStyle::default(),
            metadata: NodeMetadata::default(),
            children: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn set_position(&mut self, position: Pos2) {
        self.geometry.x = position.x;
        self.geometry.y = position.y;
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.geometry.width = size.x;
        self.geometry.height = size.y;
    }
}

/// One edge in the flat layout graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdgeEntry {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: EdgeStyle,
    /// Routed points in world coordinates, emitted by routing engines.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub waypoints: SmallVec<[Pos2; 4]>,
    /// Relationship type from the query layer, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
}

impl LayoutEdgeEntry {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            label: None,
            style: EdgeStyle::default(),
            waypoints: SmallVec::new(),
            relation_type: None,
        }
    }
}

// =============================================================================
// LAYOUT GRAPH
// =============================================================================

/// Flat graph exchanged between normalizer, engines, and orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutGraph {
    pub nodes: BTreeMap<String, LayoutNodeEntry>,
    pub edges: BTreeMap<String, LayoutEdgeEntry>,
    /// Top-level GUIDs in render order.
    pub root_ids: Vec<String>,
    /// Monotonic counter bumped on every layout pass.
    #[serde(default)]
    pub layout_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,
}

impl LayoutGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNodeEntry> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut LayoutNodeEntry> {
        self.nodes.get_mut(id)
    }

    /// Insert a node, keeping `root_ids` consistent for parentless entries.
    pub fn insert_node(&mut self, entry: LayoutNodeEntry) {
        self.nodes.insert(entry.id.clone(), entry);
    }

    /// Depth of a node measured from its root (roots are depth 0).
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        let mut depth = 0;
        let mut current = id.to_string();
        loop {
            match self.parent_of(&current) {
                Some(parent) => {
                    depth += 1;
                    current = parent;
                    if depth > self.nodes.len() {
                        // Cycle guard.
                        return None;
                    }
                }
                None => {
                    return self.nodes.contains_key(id).then_some(depth);
                }
            }
        }
    }

    /// Parent id derived from children lists (O(n); callers cache).
    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.nodes
            .values()
            .find(|entry| entry.children.iter().any(|child| child == id))
            .map(|entry| entry.id.clone())
    }

    /// Recompute `root_ids` as all ids that appear in no children list,
    /// preserving map order.
    pub fn recompute_roots(&mut self) {
        let mut referenced = std::collections::HashSet::new();
        for entry in self.nodes.values() {
            for child in &entry.children {
                referenced.insert(child.clone());
            }
        }
        self.root_ids = self
            .nodes
            .keys()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect();
    }

    /// Rebuild every node's incident-edge list from the edge map.
    pub fn reindex_edges(&mut self) {
        for entry in self.nodes.values_mut() {
            entry.edges.clear();
        }
        let incidences: Vec<(String, String, String)> = self
            .edges
            .values()
            .map(|edge| (edge.id.clone(), edge.from.clone(), edge.to.clone()))
            .collect();
        for (id, from, to) in incidences {
            if let Some(entry) = self.nodes.get_mut(&from) {
                entry.edges.push(id.clone());
            }
            if to != from {
                if let Some(entry) = self.nodes.get_mut(&to) {
                    entry.edges.push(id);
                }
            }
        }
    }

    /// World-space bounding box over visible nodes, walking from roots.
    pub fn absolute_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        let mut stack: Vec<(String, Pos2)> = self
            .root_ids
            .iter()
            .map(|id| (id.clone(), Pos2::ZERO))
            .collect();
        while let Some((id, origin)) = stack.pop() {
            let Some(entry) = self.nodes.get(&id) else {
                continue;
            };
            let abs = origin + entry.geometry.position().to_vec2();
            if entry.state.visible {
                let rect = Rect::from_min_size(abs, entry.geometry.size());
                bounds = Some(match bounds {
                    Some(acc) => acc.union(rect),
                    None => rect,
                });
            }
            for child in &entry.children {
                stack.push((child.clone(), abs));
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> LayoutGraph {
        let mut g = LayoutGraph::default();
        let mut root = LayoutNodeEntry::new("r", "root", NodeKind::Root);
        root.children = vec!["a".into(), "b".into()];
        g.insert_node(root);
        g.insert_node(LayoutNodeEntry::new("a", "a", NodeKind::Container));
        g.insert_node(LayoutNodeEntry::new("b", "b", NodeKind::Node));
        g.edges
            .insert("e".into(), LayoutEdgeEntry::new("e", "a", "b"));
        g.recompute_roots();
        g.reindex_edges();
        g
    }

    #[test]
    fn test_roots_are_unreferenced_nodes() {
        let g = graph();
        assert_eq!(g.root_ids, vec!["r".to_string()]);
    }

    #[test]
    fn test_depth_of() {
        let g = graph();
        assert_eq!(g.depth_of("r"), Some(0));
        assert_eq!(g.depth_of("a"), Some(1));
        assert_eq!(g.depth_of("zzz"), None);
    }

    #[test]
    fn test_reindex_edges() {
        let g = graph();
        assert_eq!(g.node("a").unwrap().edges, vec!["e".to_string()]);
        assert_eq!(g.node("b").unwrap().edges, vec!["e".to_string()]);
        assert!(g.node("r").unwrap().edges.is_empty());
    }

    #[test]
    fn test_absolute_bounds_offsets_children() {
        let mut g = graph();
        g.nodes.get_mut("r").unwrap().geometry = NodeGeometry {
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 120.0,
        };
        g.nodes.get_mut("a").unwrap().geometry = NodeGeometry {
            x: 50.0,
            y: 50.0,
            width: 10.0,
            height: 10.0,
        };
        let bounds = g.absolute_bounds().unwrap();
        // root spans (100,100)-(300,220); both children sit inside it.
        assert_eq!(bounds.min, Pos2::new(100.0, 100.0));
        assert_eq!(bounds.max, Pos2::new(300.0, 220.0));
    }
}
