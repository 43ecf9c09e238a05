//! Containment-runtime engine
//!
//! Live parametric engine driven by `ViewConfig`:
//!
//! - `containers` mode nests children in an adaptive vertical stack, resizes
//!   parents to fit, computes world metadata top-down, and hides containment
//!   edges.
//! - `flat` mode keeps every node independent and renders containment as
//!   visible lines synthesized from the hierarchy.
//! - Edge routing emits 4-point orthogonal or 2-point straight waypoints in
//!   world coordinates.

use std::collections::BTreeMap;

use egui::{Pos2, Vec2};
use smallvec::SmallVec;

use strata_model::{is_containment_type, LayoutEdgeEntry, LayoutGraph};

use crate::config::{ContainmentMode, EdgeRouting, LayoutMode};
use crate::util;
use crate::{
    EngineCapabilities, EngineError, LayoutEngine, LayoutOptions, LayoutOutcome,
    CONTAINMENT_RUNTIME,
};

const PADDING: f32 = 20.0;
const SPACING: f32 = 10.0;
const HEADER_OFFSET: f32 = 50.0;
const FLAT_SPACING: f32 = 40.0;
const FLAT_RADIUS: f32 = 350.0;
const ROUTE_CLEARANCE: f32 = 40.0;

pub struct ContainmentRuntimeEngine;

impl LayoutEngine for ContainmentRuntimeEngine {
    fn name(&self) -> &'static str {
        CONTAINMENT_RUNTIME
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_incremental: true,
            deterministic: true,
            can_handle_realtime: true,
        }
    }

    fn layout(
        &self,
        graph: &LayoutGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutOutcome, EngineError> {
        let config = options.engine_options;
        let mut graph = graph.clone();
        let mut notes = Vec::new();

        match config.containment_mode {
            ContainmentMode::Containers => {
                for root in graph.root_ids.clone() {
                    stack_subtree(&mut graph, &root);
                }
                place_top_level(&mut graph, config.layout_mode);
                util::compute_world_metadata(&mut graph);
                let before = graph.edges.len();
                graph
                    .edges
                    .retain(|_, edge| !is_containment_edge(edge));
                let hidden = before - graph.edges.len();
                if hidden > 0 {
                    notes.push(format!("hid {hidden} containment edges"));
                }
            }
            ContainmentMode::Flat => {
                let synthesized = flatten(&mut graph);
                if synthesized > 0 {
                    notes.push(format!("rendered {synthesized} containment edges"));
                }
                place_top_level(&mut graph, config.layout_mode);
                util::compute_world_metadata(&mut graph);
            }
        }

        route_edges(&mut graph, config.edge_routing);
        graph.reindex_edges();
        util::stamp_display_mode(&mut graph, CONTAINMENT_RUNTIME);
        let mut outcome = LayoutOutcome::new(graph);
        outcome.diagnostics.notes = notes;
        Ok(outcome)
    }
}

fn is_containment_edge(edge: &LayoutEdgeEntry) -> bool {
    edge.relation_type
        .as_deref()
        .map(is_containment_type)
        .unwrap_or(false)
}

// =============================================================================
// CONTAINERS MODE
// =============================================================================

/// Adaptive vertical stack: children under the header, parent resized to
/// the stack, bottom-up.
fn stack_subtree(graph: &mut LayoutGraph, id: &str) {
    let Some(children) = graph.nodes.get(id).map(|n| n.children.clone()) else {
        return;
    };
    for child in &children {
        stack_subtree(graph, child);
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
    if placed.is_empty() {
        return;
    }

    let mut y = HEADER_OFFSET;
    let mut max_width = 0.0f32;
    for child in &placed {
        if let Some(entry) = graph.node_mut(child) {
            entry.set_position(Pos2::new(PADDING, y));
            y += entry.geometry.height + SPACING;
            max_width = max_width.max(entry.geometry.width);
        }
    }

    let collapsed = graph.node(id).map(|e| e.state.collapsed).unwrap_or(false);
    if let Some(entry) = graph.node_mut(id) {
        if !collapsed {
            let min = entry.kind.default_size();
            entry.geometry.width = (max_width + 2.0 * PADDING).max(min.x);
            entry.geometry.height = (y - SPACING + PADDING).max(min.y);
        }
    }
}

/// Arrange the top level according to the packing mode.
fn place_top_level(graph: &mut LayoutGraph, mode: LayoutMode) {
    let ids = graph.root_ids.clone();
    if ids.is_empty() {
        return;
    }
    match mode {
        LayoutMode::Grid => {
            let mut cell = Vec2::ZERO;
            for id in &ids {
                let size = graph.node(id).map(|e| e.geometry.size()).unwrap_or(Vec2::ZERO);
                cell.x = cell.x.max(size.x);
                cell.y = cell.y.max(size.y);
            }
            let cols = (ids.len() as f32).sqrt().ceil().max(1.0) as usize;
            for (i, id) in ids.iter().enumerate() {
                let col = (i % cols) as f32;
                let row = (i / cols) as f32;
                if let Some(entry) = graph.node_mut(id) {
                    entry.set_position(Pos2::new(
                        col * (cell.x + FLAT_SPACING),
                        row * (cell.y + FLAT_SPACING),
                    ));
                }
            }
        }
        LayoutMode::Force => {
            let count = ids.len().max(1) as f32;
            for (i, id) in ids.iter().enumerate() {
                let angle = std::f32::consts::TAU * i as f32 / count;
                if let Some(entry) = graph.node_mut(id) {
                    entry.set_position(Pos2::new(
                        FLAT_RADIUS * angle.cos(),
                        FLAT_RADIUS * angle.sin(),
                    ));
                }
            }
        }
    }
}

// =============================================================================
// FLAT MODE
// =============================================================================

/// Dissolve the hierarchy: every node becomes top-level and each
/// parent→child pair is re-emitted as a visible containment edge.
/// Returns the number of containment edges synthesized.
fn flatten(graph: &mut LayoutGraph) -> usize {
    let mut containment: Vec<(String, String)> = Vec::new();
    for entry in graph.nodes.values_mut() {
        for child in entry.children.drain(..) {
            containment.push((entry.id.clone(), child));
        }
        // Everything participates at the top level.
        entry.state.visible = true;
        entry.state.collapsed = false;
    }
    let synthesized = containment.len();
    for (parent, child) in containment {
        let id = format!("contains-{parent}-{child}");
        let mut edge = LayoutEdgeEntry::new(id.clone(), parent, child);
        edge.relation_type = Some("CONTAINS".to_string());
        graph.edges.insert(id, edge);
    }
    graph.recompute_roots();
    synthesized
}

// =============================================================================
// EDGE ROUTING
// =============================================================================

/// Emit waypoints for every edge between node centres, in world
/// coordinates.
fn route_edges(graph: &mut LayoutGraph, routing: EdgeRouting) {
    let centers: BTreeMap<String, (Pos2, f32)> = graph
        .nodes
        .values()
        .filter_map(|entry| {
            let world = entry.metadata.world_position?;
            let size = entry.geometry.size();
            Some((
                entry.id.clone(),
                (Pos2::new(world.x + size.x / 2.0, world.y + size.y / 2.0), world.y),
            ))
        })
        .collect();

    for edge in graph.edges.values_mut() {
        let (Some((from_center, from_top)), Some((to_center, to_top))) =
            (centers.get(&edge.from), centers.get(&edge.to))
        else {
            edge.waypoints = SmallVec::new();
            continue;
        };
        edge.waypoints = match routing {
            EdgeRouting::Straight => SmallVec::from_slice(&[*from_center, *to_center]),
            EdgeRouting::Orthogonal => {
                // Up, out over the lower of the two tops, across, then in.
                let clearance_y = from_top.min(*to_top) - ROUTE_CLEARANCE;
                SmallVec::from_slice(&[
                    *from_center,
                    Pos2::new(from_center.x, clearance_y),
                    Pos2::new(to_center.x, clearance_y),
                    *to_center,
                ])
            }
        };
    }
}
