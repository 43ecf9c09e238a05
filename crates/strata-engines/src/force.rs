//! Force-directed engine
//!
//! Deterministic placement on a circle around the origin. True force
//! relaxation is out of scope; identical input yields identical output.

use std::collections::BTreeMap;

use egui::Pos2;

use strata_model::{Camera, LayoutGraph};

use crate::util;
use crate::{
    EngineCapabilities, EngineError, LayoutEngine, LayoutOptions, LayoutOutcome, FORCE_DIRECTED,
};

const RADIUS: f32 = 350.0;

pub struct ForceDirectedEngine;

impl LayoutEngine for ForceDirectedEngine {
    fn name(&self) -> &'static str {
        FORCE_DIRECTED
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_incremental: false,
            deterministic: true,
            can_handle_realtime: true,
        }
    }

    fn layout(
        &self,
        graph: &LayoutGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutOutcome, EngineError> {
        let mut graph = graph.clone();

        // Map order is the placement order, so output is stable.
        let ids: Vec<String> = graph.nodes.keys().cloned().collect();
        let count = ids.len().max(1) as f32;
        let mut absolute: BTreeMap<String, Pos2> = BTreeMap::new();
        for (i, id) in ids.iter().enumerate() {
            let angle = std::f32::consts::TAU * i as f32 / count;
            absolute.insert(
                id.clone(),
                Pos2::new(RADIUS * angle.cos(), RADIUS * angle.sin()),
            );
        }

        util::apply_absolute_positions(&mut graph, &absolute);
        util::stamp_display_mode(&mut graph, FORCE_DIRECTED);

        let mut outcome = LayoutOutcome::new(graph);
        if options.reason.frames_camera() {
            outcome.camera = Some(Camera::at(-400.0, -300.0, 0.6));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayoutReason;
    use strata_model::{LayoutNodeEntry, NodeKind};

    fn graph(n: usize) -> LayoutGraph {
        let mut g = LayoutGraph::default();
        for i in 0..n {
            g.insert_node(LayoutNodeEntry::new(format!("n{i}"), format!("{i}"), NodeKind::Node));
        }
        g.recompute_roots();
        g
    }

    #[test]
    fn test_nodes_sit_on_circle() {
        let out = ForceDirectedEngine
            .layout(&graph(4), &LayoutOptions::default())
            .unwrap();
        for entry in out.graph.nodes.values() {
            let pos = entry.metadata.world_position.unwrap();
            let radius = (pos.x * pos.x + pos.y * pos.y).sqrt();
            assert!((radius - RADIUS).abs() < 0.01);
        }
    }

    #[test]
    fn test_deterministic() {
        let input = graph(6);
        let a = ForceDirectedEngine.layout(&input, &LayoutOptions::default()).unwrap();
        let b = ForceDirectedEngine.layout(&input, &LayoutOptions::default()).unwrap();
        assert_eq!(a.graph, b.graph);
    }

    #[test]
    fn test_initial_camera() {
        let out = ForceDirectedEngine
            .layout(&graph(3), &LayoutOptions::with_reason(LayoutReason::Initial))
            .unwrap();
        let camera = out.camera.unwrap();
        assert_eq!((camera.x, camera.y, camera.zoom), (-400.0, -300.0, 0.6));
    }
}
