//! Layout graph ⇄ canvas data conversion
//!
//! Two pure transforms decouple engines from the nested render tree. They
//! are inverses up to field ordering: `to_layout_graph(to_hierarchical(g))`
//! reproduces `g`.

use std::collections::HashSet;

use crate::canvas::CanvasData;
use crate::edge::CanvasEdge;
use crate::graph::{LayoutEdgeEntry, LayoutGraph, LayoutNodeEntry, NodeGeometry, NodeState};
use crate::node::CanvasNode;

// =============================================================================
// TO LAYOUT GRAPH
// =============================================================================

/// Flatten the nested node tree into the wire form.
///
/// The authoritative `original_edges` set is used when present so that
/// engines always see the unfiltered graph; inherited edges never cross
/// into the wire form.
pub fn to_layout_graph(data: &CanvasData) -> LayoutGraph {
    let mut graph = LayoutGraph {
        layout_version: data.metadata.layout_version,
        display_mode: data.metadata.display_mode.clone(),
        ..LayoutGraph::default()
    };

    fn flatten(node: &CanvasNode, graph: &mut LayoutGraph) {
        let entry = LayoutNodeEntry {
            id: node.guid.clone(),
            display_id: node.display_id.clone(),
            label: node.label.clone(),
            kind: node.kind,
            geometry: NodeGeometry::new(node.position, node.size),
            state: NodeState {
                collapsed: node.collapsed,
                visible: node.visible,
                selected: node.selected,
                dragging: node.dragging,
            },
            style: node.style.clone(),
            metadata: node.metadata.clone(),
            children: node.children.iter().map(|c| c.guid.clone()).collect(),
            edges: Vec::new(),
        };
        graph.insert_node(entry);
        for child in &node.children {
            flatten(child, graph);
        }
    }

    for root in &data.nodes {
        flatten(root, &mut graph);
        graph.root_ids.push(root.guid.clone());
    }

    let source = if data.original_edges.is_empty() {
        &data.edges
    } else {
        &data.original_edges
    };
    for edge in source {
        if edge.is_inherited() {
            continue;
        }
        graph.edges.insert(
            edge.guid.clone(),
            LayoutEdgeEntry {
                id: edge.guid.clone(),
                from: edge.from_guid.clone(),
                to: edge.to_guid.clone(),
                label: edge.label.clone(),
                style: edge.style.clone(),
                waypoints: edge.waypoints.clone(),
                relation_type: edge.relation_type.clone(),
            },
        );
    }
    graph.reindex_edges();
    graph
}

// =============================================================================
// TO HIERARCHICAL
// =============================================================================

/// Rebuild the nested tree from the flat map, preserving child order.
///
/// Root ids come from the wire metadata when present, otherwise from the
/// set of nodes that appear in no children list. A visited set guards
/// against malformed inputs where a node is claimed by two parents.
pub fn to_hierarchical(graph: &LayoutGraph) -> CanvasData {
    let mut data = CanvasData {
        metadata: crate::canvas::CanvasMetadata {
            root_ids: Some(graph.root_ids.clone()),
            layout_version: graph.layout_version,
            display_mode: graph.display_mode.clone(),
            ..Default::default()
        },
        ..CanvasData::default()
    };

    let root_ids: Vec<String> = if graph.root_ids.is_empty() {
        let mut g = graph.clone();
        g.recompute_roots();
        g.root_ids
    } else {
        graph.root_ids.clone()
    };

    fn build(id: &str, graph: &LayoutGraph, visited: &mut HashSet<String>) -> Option<CanvasNode> {
        if !visited.insert(id.to_string()) {
            tracing::warn!(node = id, "node claimed by multiple parents; keeping first");
            return None;
        }
        let entry = graph.nodes.get(id)?;
        let mut node = CanvasNode {
            guid: entry.id.clone(),
            display_id: entry.display_id.clone(),
            label: entry.label.clone(),
            kind: entry.kind,
            position: entry.geometry.position(),
            size: entry.geometry.size(),
            collapsed: entry.state.collapsed,
            visible: entry.state.visible,
            selected: entry.state.selected,
            dragging: entry.state.dragging,
            style: entry.style.clone(),
            children: Vec::new(),
            metadata: entry.metadata.clone(),
        };
        for child_id in &entry.children {
            if let Some(child) = build(child_id, graph, visited) {
                node.children.push(child);
            }
        }
        Some(node)
    }

    let mut visited = HashSet::new();
    for id in &root_ids {
        if let Some(root) = build(id, graph, &mut visited) {
            data.nodes.push(root);
        }
    }

    for edge in graph.edges.values() {
        let canvas_edge = CanvasEdge {
            guid: edge.id.clone(),
            from_guid: edge.from.clone(),
            to_guid: edge.to.clone(),
            label: edge.label.clone(),
            style: edge.style.clone(),
            waypoints: edge.waypoints.clone(),
            relation_type: edge.relation_type.clone(),
        };
        data.original_edges.push(canvas_edge.clone());
        data.edges.push(canvas_edge);
    }

    data.refresh_world_positions();
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use egui::Pos2;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sample() -> CanvasData {
        let mut data = CanvasData::default();
        let mut root = CanvasNode::new("r", "root", NodeKind::Root);
        root.position = Pos2::new(10.0, 20.0);
        let mut a = CanvasNode::new("a", "Alpha", NodeKind::Container);
        a.position = Pos2::new(30.0, 40.0);
        a.collapsed = true;
        a.children.push(CanvasNode::new("a1", "A1", NodeKind::Node));
        a.children.push(CanvasNode::new("a2", "A2", NodeKind::Component));
        root.children.push(a);
        root.children.push(CanvasNode::new("b", "Beta", NodeKind::Node));
        data.nodes.push(root);
        data.original_edges.push(CanvasEdge::new("e1", "a1", "b"));
        data.edges = data.original_edges.clone();
        data
    }

    #[test]
    fn test_flatten_preserves_child_order() {
        let graph = to_layout_graph(&sample());
        assert_eq!(graph.root_ids, vec!["r".to_string()]);
        assert_eq!(
            graph.node("a").unwrap().children,
            vec!["a1".to_string(), "a2".to_string()]
        );
        assert_eq!(graph.node("r").unwrap().children.len(), 2);
    }

    #[test]
    fn test_flatten_uses_original_edges_and_skips_inherited() {
        let mut data = sample();
        data.edges = vec![CanvasEdge::new("inherited-e1", "a", "b")];
        let graph = to_layout_graph(&data);
        assert!(graph.edges.contains_key("e1"));
        assert!(!graph.edges.contains_key("inherited-e1"));
    }

    #[test]
    fn test_roundtrip_is_idempotent() {
        let data = sample();
        let graph = to_layout_graph(&data);
        let rebuilt = to_hierarchical(&graph);
        let graph2 = to_layout_graph(&rebuilt);
        // Field ordering aside, the wire forms must be identical — except
        // worldPosition mirrors that to_hierarchical refreshes.
        assert_eq!(graph.root_ids, graph2.root_ids);
        assert_eq!(graph.edges, graph2.edges);
        assert_eq!(
            graph.nodes.keys().collect::<Vec<_>>(),
            graph2.nodes.keys().collect::<Vec<_>>()
        );
        for (id, entry) in &graph.nodes {
            let entry2 = &graph2.nodes[id];
            assert_eq!(entry.geometry, entry2.geometry, "geometry of {id}");
            assert_eq!(entry.state, entry2.state, "state of {id}");
            assert_eq!(entry.children, entry2.children, "children of {id}");
        }
    }

    #[test]
    fn test_rebuild_computes_roots_when_missing() {
        let mut graph = to_layout_graph(&sample());
        graph.root_ids.clear();
        let rebuilt = to_hierarchical(&graph);
        assert_eq!(rebuilt.nodes.len(), 1);
        assert_eq!(rebuilt.nodes[0].guid, "r");
    }

    #[test]
    fn test_rebuild_refreshes_world_positions() {
        let rebuilt = to_hierarchical(&to_layout_graph(&sample()));
        let a1 = rebuilt.find_node("a1").unwrap();
        assert_eq!(a1.metadata.world_position.unwrap(), Pos2::new(40.0, 60.0));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_node_set(xs in proptest::collection::vec(0f32..500.0, 1..20)) {
            let mut data = CanvasData::default();
            let mut root = CanvasNode::new("root", "root", NodeKind::Root);
            for (i, x) in xs.iter().enumerate() {
                let mut child = CanvasNode::new(format!("n{i}"), format!("node {i}"), NodeKind::Node);
                child.position = Pos2::new(*x, *x * 0.5);
                root.children.push(child);
            }
            data.nodes.push(root);

            let graph = to_layout_graph(&data);
            let rebuilt = to_hierarchical(&graph);
            let graph2 = to_layout_graph(&rebuilt);
            prop_assert_eq!(graph.nodes.len(), graph2.nodes.len());
            for (id, entry) in &graph.nodes {
                prop_assert_eq!(&entry.geometry, &graph2.nodes[id].geometry);
            }
        }
    }
}
