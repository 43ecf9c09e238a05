//! Containment-grid engine
//!
//! Recursively positions children in a square-ish grid inside each
//! container, then resizes each container bottom-up to fit. Deterministic.

use egui::{Pos2, Vec2};

use strata_model::LayoutGraph;

use crate::util;
use crate::{
    EngineCapabilities, EngineError, LayoutEngine, LayoutOptions, LayoutOutcome, CONTAINMENT_GRID,
};

pub const PADDING: f32 = 20.0;
pub const SPACING: f32 = 10.0;
pub const HEADER_OFFSET: f32 = 50.0;
const ROOT_SPACING: f32 = 40.0;

pub struct ContainmentGridEngine;

impl LayoutEngine for ContainmentGridEngine {
    fn name(&self) -> &'static str {
        CONTAINMENT_GRID
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_incremental: false,
            deterministic: true,
            can_handle_realtime: false,
        }
    }

    fn layout(
        &self,
        graph: &LayoutGraph,
        _options: &LayoutOptions,
    ) -> Result<LayoutOutcome, EngineError> {
        let mut graph = graph.clone();

        for root in graph.root_ids.clone() {
            layout_subtree(&mut graph, &root);
        }
        place_roots(&mut graph);

        util::compute_world_metadata(&mut graph);
        util::stamp_display_mode(&mut graph, CONTAINMENT_GRID);
        Ok(LayoutOutcome::new(graph))
    }
}

/// Lay out one subtree bottom-up: children first, then this container.
fn layout_subtree(graph: &mut LayoutGraph, id: &str) {
    let Some(children) = graph.nodes.get(id).map(|n| n.children.clone()) else {
        return;
    };
    for child in &children {
        layout_subtree(graph, child);
    }

    let placed: Vec<String> = children
        .iter()
        .filter(|child| {
            graph
                .node(child)
                .map(|entry| entry.state.visible)
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    let min_size = graph
        .node(id)
        .map(|entry| entry.kind.default_size())
        .unwrap_or_else(|| Vec2::new(160.0, 80.0));

    if placed.is_empty() {
        if let Some(entry) = graph.node_mut(id) {
            entry.geometry.width = entry.geometry.width.max(min_size.x);
            entry.geometry.height = entry.geometry.height.max(min_size.y);
        }
        return;
    }

    // Uniform cells sized by the largest child keep every child inside the
    // parent interior.
    let mut cell = Vec2::ZERO;
    for child in &placed {
        let size = graph.node(child).map(|e| e.geometry.size()).unwrap_or(Vec2::ZERO);
        cell.x = cell.x.max(size.x);
        cell.y = cell.y.max(size.y);
    }
    let count = placed.len();
    let cols = (count as f32).sqrt().ceil().max(1.0) as usize;
    let rows = count.div_ceil(cols);

    for (i, child) in placed.iter().enumerate() {
        let col = (i % cols) as f32;
        let row = (i / cols) as f32;
        if let Some(entry) = graph.node_mut(child) {
            entry.set_position(Pos2::new(
                PADDING + col * (cell.x + SPACING),
                HEADER_OFFSET + row * (cell.y + SPACING),
            ));
        }
    }

    let collapsed = graph.node(id).map(|e| e.state.collapsed).unwrap_or(false);
    if let Some(entry) = graph.node_mut(id) {
        if !collapsed {
            let width = 2.0 * PADDING + cols as f32 * cell.x + (cols - 1) as f32 * SPACING;
            let height = HEADER_OFFSET
                + rows as f32 * cell.y
                + (rows - 1) as f32 * SPACING
                + PADDING;
            entry.geometry.width = width.max(min_size.x);
            entry.geometry.height = height.max(min_size.y);
        }
    }
}

/// Arrange the root set in a square-ish grid at the world origin.
fn place_roots(graph: &mut LayoutGraph) {
    let roots = graph.root_ids.clone();
    if roots.is_empty() {
        return;
    }
    let mut cell = Vec2::ZERO;
    for root in &roots {
        let size = graph.node(root).map(|e| e.geometry.size()).unwrap_or(Vec2::ZERO);
        cell.x = cell.x.max(size.x);
        cell.y = cell.y.max(size.y);
    }
    let cols = (roots.len() as f32).sqrt().ceil().max(1.0) as usize;
    for (i, root) in roots.iter().enumerate() {
        let col = (i % cols) as f32;
        let row = (i / cols) as f32;
        if let Some(entry) = graph.node_mut(root) {
            entry.set_position(Pos2::new(
                col * (cell.x + ROOT_SPACING),
                row * (cell.y + ROOT_SPACING),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_model::{LayoutNodeEntry, NodeKind};

    fn graph(children: usize) -> LayoutGraph {
        let mut g = LayoutGraph::default();
        let mut root = LayoutNodeEntry::new("r", "root", NodeKind::Container);
        for i in 0..children {
            let id = format!("c{i}");
            root.children.push(id.clone());
            g.insert_node(LayoutNodeEntry::new(id, format!("child {i}"), NodeKind::Node));
        }
        g.insert_node(root);
        g.recompute_roots();
        g
    }

    #[test]
    fn test_children_stay_inside_parent_interior() {
        let engine = ContainmentGridEngine;
        let out = engine
            .layout(&graph(7), &LayoutOptions::default())
            .unwrap();
        let parent = out.graph.node("r").unwrap().geometry;
        for i in 0..7 {
            let child = out.graph.node(&format!("c{i}")).unwrap().geometry;
            assert!(child.x >= PADDING, "child {i} left of padding");
            assert!(child.y >= HEADER_OFFSET, "child {i} above header");
            assert!(
                child.x + child.width <= parent.width - PADDING + 0.001,
                "child {i} exceeds right interior"
            );
            assert!(
                child.y + child.height <= parent.height - PADDING + 0.001,
                "child {i} exceeds bottom interior"
            );
        }
    }

    #[test]
    fn test_container_grows_to_fit() {
        let engine = ContainmentGridEngine;
        let out = engine
            .layout(&graph(9), &LayoutOptions::default())
            .unwrap();
        let parent = out.graph.node("r").unwrap().geometry;
        // 3x3 grid of 160x80 cells.
        assert_eq!(parent.width, 2.0 * PADDING + 3.0 * 160.0 + 2.0 * SPACING);
        assert_eq!(
            parent.height,
            HEADER_OFFSET + 3.0 * 80.0 + 2.0 * SPACING + PADDING
        );
    }

    #[test]
    fn test_nested_containers_resize_bottom_up() {
        let mut g = LayoutGraph::default();
        let mut outer = LayoutNodeEntry::new("outer", "outer", NodeKind::Container);
        outer.children = vec!["inner".into()];
        g.insert_node(outer);
        let mut inner = LayoutNodeEntry::new("inner", "inner", NodeKind::Container);
        inner.children = vec!["leaf".into()];
        g.insert_node(inner);
        g.insert_node(LayoutNodeEntry::new("leaf", "leaf", NodeKind::Node));
        g.recompute_roots();

        let out = ContainmentGridEngine
            .layout(&g, &LayoutOptions::default())
            .unwrap();
        let inner = out.graph.node("inner").unwrap().geometry;
        let outer = out.graph.node("outer").unwrap().geometry;
        // inner grew around the leaf, outer grew around the grown inner.
        assert_eq!(inner.width, 2.0 * PADDING + 160.0);
        assert_eq!(inner.height, HEADER_OFFSET + 80.0 + PADDING);
        assert_eq!(outer.width, 2.0 * PADDING + inner.width);
        assert_eq!(outer.height, HEADER_OFFSET + inner.height + PADDING);
    }

    #[test]
    fn test_collapsed_container_keeps_size() {
        let mut g = graph(4);
        g.nodes.get_mut("r").unwrap().state.collapsed = true;
        let before = g.node("r").unwrap().geometry.size();
        let out = ContainmentGridEngine
            .layout(&g, &LayoutOptions::default())
            .unwrap();
        assert_eq!(out.graph.node("r").unwrap().geometry.size(), before);
    }

    #[test]
    fn test_hidden_children_are_not_packed() {
        let mut g = graph(3);
        g.nodes.get_mut("c1").unwrap().state.visible = false;
        let out = ContainmentGridEngine
            .layout(&g, &LayoutOptions::default())
            .unwrap();
        // Two visible children pack into a 2x1 grid.
        let parent = out.graph.node("r").unwrap().geometry;
        assert_eq!(parent.width, 2.0 * PADDING + 2.0 * 160.0 + SPACING);
    }

    #[test]
    fn test_deterministic() {
        let engine = ContainmentGridEngine;
        let input = graph(5);
        let a = engine.layout(&input, &LayoutOptions::default()).unwrap();
        let b = engine.layout(&input, &LayoutOptions::default()).unwrap();
        assert_eq!(a.graph, b.graph);
    }

    #[test]
    fn test_stamps_display_mode() {
        let engine = ContainmentGridEngine;
        let out = engine.layout(&graph(2), &LayoutOptions::default()).unwrap();
        assert_eq!(out.graph.display_mode.as_deref(), Some(CONTAINMENT_GRID));
        assert_eq!(
            out.graph.node("c0").unwrap().metadata.display_mode.as_deref(),
            Some(CONTAINMENT_GRID)
        );
    }
}
