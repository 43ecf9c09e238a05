//! Graph lenses
//!
//! A lens filters visibility before rendering. Lenses mutate a cloned
//! snapshot, never the authoritative view model; after application, edges
//! are trimmed to endpoints within the visible set.

use serde::{Deserialize, Serialize};

use strata_model::{CanvasData, CanvasNode};

use crate::inherit::effective_visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphLens {
    /// Identity: everything stays as the view model says.
    #[default]
    FullGraph,
    /// Only the selection, its direct children collapsed, and its parent
    /// with siblings collapsed.
    SelectedRootNeighborhood,
    /// The ancestor chain of the first container holding the selection.
    ActiveContainment,
}

impl GraphLens {
    pub fn id(&self) -> &'static str {
        match self {
            Self::FullGraph => "full-graph",
            Self::SelectedRootNeighborhood => "selected-root-neighborhood",
            Self::ActiveContainment => "active-containment",
        }
    }
}

impl std::str::FromStr for GraphLens {
    type Err = UnknownLens;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-graph" => Ok(Self::FullGraph),
            "selected-root-neighborhood" => Ok(Self::SelectedRootNeighborhood),
            "active-containment" => Ok(Self::ActiveContainment),
            other => Err(UnknownLens(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown lens: {0}")]
pub struct UnknownLens(pub String);

// =============================================================================
// APPLICATION
// =============================================================================

/// Apply a lens to a snapshot, then trim edges to the visible set.
pub fn apply_lens(data: &mut CanvasData, lens: GraphLens) {
    match lens {
        GraphLens::FullGraph => {}
        GraphLens::SelectedRootNeighborhood => selected_neighborhood(data),
        GraphLens::ActiveContainment => active_containment(data),
    }
    trim_edges(data);
}

/// Drop edges whose endpoints left the visible set. Lenses narrow the
/// view; they do not rewire.
fn trim_edges(data: &mut CanvasData) {
    let visibility = effective_visibility(data);
    let visible = |guid: &str| visibility.get(guid).copied().unwrap_or(false);
    data.edges
        .retain(|edge| visible(&edge.from_guid) && visible(&edge.to_guid));
}

fn selected_neighborhood(data: &mut CanvasData) {
    let Some(selected) = data.selected_guid() else {
        return;
    };
    let Some(path) = data.path_to(&selected) else {
        return;
    };
    let parent = path.last().cloned();

    hide_all(data);

    // Ancestor chain stays open so the neighborhood itself is reachable.
    for ancestor in &path {
        if let Some(node) = data.find_node_mut(ancestor) {
            node.visible = true;
            node.collapsed = false;
        }
    }

    // Siblings appear collapsed next to the selection.
    if let Some(parent) = parent {
        let sibling_guids: Vec<String> = data
            .find_node(&parent)
            .map(|p| p.children.iter().map(|c| c.guid.clone()).collect())
            .unwrap_or_default();
        for sibling in sibling_guids {
            if let Some(node) = data.find_node_mut(&sibling) {
                node.visible = true;
                node.collapsed = true;
            }
        }
    }

    // The selection opens one level: direct children visible but collapsed.
    if let Some(node) = data.find_node_mut(&selected) {
        node.visible = true;
        node.collapsed = false;
        for child in &mut node.children {
            child.visible = true;
            child.collapsed = true;
        }
    }
}

fn active_containment(data: &mut CanvasData) {
    let Some(selected) = data.selected_guid() else {
        return;
    };
    let Some(path) = data.path_to(&selected) else {
        return;
    };

    // First container on the ancestor chain, nearest the selection.
    let container = path
        .iter()
        .rev()
        .find(|guid| {
            data.find_node(guid)
                .map(|node| node.kind.is_container())
                .unwrap_or(false)
        })
        .cloned();
    let Some(container) = container else {
        return;
    };

    hide_all(data);
    for ancestor in &path {
        if let Some(node) = data.find_node_mut(ancestor) {
            node.visible = true;
            node.collapsed = false;
        }
        if *ancestor == container {
            break;
        }
    }
    // The containing subtree stays visible as-is.
    if let Some(node) = data.find_node_mut(&container) {
        show_subtree(node);
    }
}

fn hide_all(data: &mut CanvasData) {
    fn walk(node: &mut CanvasNode) {
        node.visible = false;
        for child in &mut node.children {
            walk(child);
        }
    }
    for root in &mut data.nodes {
        walk(root);
    }
}

fn show_subtree(node: &mut CanvasNode) {
    node.visible = true;
    node.collapsed = false;
    for child in &mut node.children {
        show_subtree(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_model::{CanvasEdge, NodeKind};

    /// R(container) -> { A(container) -> { a1, a2 }, B }
    fn data() -> CanvasData {
        let mut data = CanvasData::default();
        let mut root = CanvasNode::new("R", "root", NodeKind::Root);
        let mut a = CanvasNode::new("A", "A", NodeKind::Container);
        a.children.push(CanvasNode::new("a1", "a1", NodeKind::Node));
        a.children.push(CanvasNode::new("a2", "a2", NodeKind::Node));
        root.children.push(a);
        root.children.push(CanvasNode::new("B", "B", NodeKind::Node));
        data.nodes.push(root);
        data.original_edges.push(CanvasEdge::new("e", "a1", "B"));
        data.edges = data.original_edges.clone();
        data
    }

    #[test]
    fn test_full_graph_is_identity_for_nodes() {
        let mut d = data();
        apply_lens(&mut d, GraphLens::FullGraph);
        assert!(d.find_node("a1").unwrap().visible);
        assert_eq!(d.edges.len(), 1);
    }

    #[test]
    fn test_selected_neighborhood_collapses_siblings() {
        let mut d = data();
        d.find_node_mut("A").unwrap().selected = true;
        apply_lens(&mut d, GraphLens::SelectedRootNeighborhood);

        assert!(d.find_node("A").unwrap().visible);
        assert!(!d.find_node("A").unwrap().collapsed);
        // Direct children visible but collapsed.
        assert!(d.find_node("a1").unwrap().visible);
        assert!(d.find_node("a1").unwrap().collapsed);
        // Sibling B collapsed; parent R open.
        assert!(d.find_node("B").unwrap().visible);
        assert!(d.find_node("B").unwrap().collapsed);
        assert!(d.find_node("R").unwrap().visible);
    }

    #[test]
    fn test_lens_trims_edges_to_visible() {
        let mut d = data();
        d.find_node_mut("B").unwrap().selected = true;
        apply_lens(&mut d, GraphLens::SelectedRootNeighborhood);
        // a1 is hidden under collapsed A, so the a1 -> B edge is trimmed.
        assert!(d.edges.is_empty());
    }

    #[test]
    fn test_active_containment_shows_chain() {
        let mut d = data();
        d.find_node_mut("a2").unwrap().selected = true;
        apply_lens(&mut d, GraphLens::ActiveContainment);
        assert!(d.find_node("R").unwrap().visible);
        assert!(d.find_node("A").unwrap().visible);
        assert!(d.find_node("a2").unwrap().visible);
        // Outside the containment chain.
        assert!(!d.find_node("B").unwrap().visible);
    }

    #[test]
    fn test_lens_ids_roundtrip() {
        for lens in [
            GraphLens::FullGraph,
            GraphLens::SelectedRootNeighborhood,
            GraphLens::ActiveContainment,
        ] {
            assert_eq!(lens.id().parse::<GraphLens>().unwrap(), lens);
        }
        assert!("x-ray".parse::<GraphLens>().is_err());
    }
}
