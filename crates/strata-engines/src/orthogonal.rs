//! Orthogonal engine
//!
//! Layered layout by depth from the roots: one column per layer, rows
//! stacked inside each column. Parents are re-centred on their children
//! after layering.

use std::collections::BTreeMap;

use egui::Pos2;

use strata_model::LayoutGraph;

use crate::util;
use crate::{
    EngineCapabilities, EngineError, LayoutEngine, LayoutOptions, LayoutOutcome, ORTHOGONAL,
};

const COLUMN_SPACING: f32 = 360.0;
const ROW_GAP: f32 = 40.0;
const LAYER_PADDING: f32 = 140.0;
const CAMERA_PADDING: f32 = 200.0;
const CAMERA_ZOOM: f32 = 0.65;

pub struct OrthogonalEngine;

impl LayoutEngine for OrthogonalEngine {
    fn name(&self) -> &'static str {
        ORTHOGONAL
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
        options: &LayoutOptions,
    ) -> Result<LayoutOutcome, EngineError> {
        let mut graph = graph.clone();
        let layers = util::depth_layers(&graph);

        // First pass: absolute stacking per column.
        let mut absolute: BTreeMap<String, Pos2> = BTreeMap::new();
        for (depth, layer) in layers.iter().enumerate() {
            let x = depth as f32 * COLUMN_SPACING;
            let mut y = LAYER_PADDING;
            for id in layer {
                let Some(entry) = graph.nodes.get(id) else {
                    continue;
                };
                absolute.insert(id.clone(), Pos2::new(x, y));
                y += entry.geometry.height + ROW_GAP;
            }
        }

        // Second pass, deepest parents first: re-centre each parent on the
        // midpoint of its first and last child.
        for layer in layers.iter().rev() {
            for id in layer {
                let Some(entry) = graph.nodes.get(id) else {
                    continue;
                };
                let (Some(first), Some(last)) = (entry.children.first(), entry.children.last())
                else {
                    continue;
                };
                let centers = |child: &String| {
                    let pos = absolute.get(child)?;
                    let size = graph.nodes.get(child)?.geometry.size();
                    Some(pos.y + size.y / 2.0)
                };
                let (Some(first_c), Some(last_c)) = (centers(first), centers(last)) else {
                    continue;
                };
                let mid = (first_c + last_c) / 2.0;
                let height = entry.geometry.height;
                if let Some(pos) = absolute.get_mut(id) {
                    pos.y = mid - height / 2.0;
                }
            }
        }

        let bounds = util::bounds_of(&absolute, &graph);
        util::apply_absolute_positions(&mut graph, &absolute);
        util::stamp_display_mode(&mut graph, ORTHOGONAL);

        let mut outcome = LayoutOutcome::new(graph);
        if options.reason.frames_camera() {
            if let Some(bounds) = bounds {
                outcome.camera = Some(util::frame_camera(
                    bounds,
                    options.viewport,
                    CAMERA_PADDING,
                    CAMERA_ZOOM,
                ));
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayoutReason;
    use strata_model::{LayoutNodeEntry, NodeKind};

    fn graph() -> LayoutGraph {
        let mut g = LayoutGraph::default();
        let mut root = LayoutNodeEntry::new("r", "root", NodeKind::Root);
        root.children = vec!["a".into(), "b".into()];
        g.insert_node(root);
        g.insert_node(LayoutNodeEntry::new("a", "a", NodeKind::Node));
        g.insert_node(LayoutNodeEntry::new("b", "b", NodeKind::Node));
        g.recompute_roots();
        g
    }

    #[test]
    fn test_layers_are_columns_360_apart() {
        let out = OrthogonalEngine
            .layout(&graph(), &LayoutOptions::default())
            .unwrap();
        let r = out.graph.node("r").unwrap().metadata.world_position.unwrap();
        let a = out.graph.node("a").unwrap().metadata.world_position.unwrap();
        assert_eq!(r.x, 0.0);
        assert_eq!(a.x, 360.0);
    }

    #[test]
    fn test_parent_centred_between_first_and_last_child() {
        let out = OrthogonalEngine
            .layout(&graph(), &LayoutOptions::default())
            .unwrap();
        let center = |id: &str| {
            let entry = out.graph.node(id).unwrap();
            entry.metadata.world_position.unwrap().y + entry.geometry.height / 2.0
        };
        let expected = (center("a") + center("b")) / 2.0;
        assert!((center("r") - expected).abs() < 0.001);
    }

    #[test]
    fn test_rows_stack_with_gap_below_layer_padding() {
        let out = OrthogonalEngine
            .layout(&graph(), &LayoutOptions::default())
            .unwrap();
        let a = out.graph.node("a").unwrap();
        let b = out.graph.node("b").unwrap();
        let a_pos = a.metadata.world_position.unwrap();
        let b_pos = b.metadata.world_position.unwrap();
        assert_eq!(a_pos.y, LAYER_PADDING);
        assert_eq!(b_pos.y, LAYER_PADDING + a.geometry.height + ROW_GAP);
        assert_eq!(a_pos.x, b_pos.x);
    }

    #[test]
    fn test_camera_only_on_initial_or_switch() {
        let engine = OrthogonalEngine;
        let initial = engine
            .layout(&graph(), &LayoutOptions::with_reason(LayoutReason::Initial))
            .unwrap();
        assert!(initial.camera.is_some());
        assert_eq!(initial.camera.unwrap().zoom, CAMERA_ZOOM);

        let update = engine
            .layout(&graph(), &LayoutOptions::with_reason(LayoutReason::DataUpdate))
            .unwrap();
        assert!(update.camera.is_none());
    }
}
