//! Tree engine
//!
//! Vertical indent layout. Every non-root node starts collapsed, so the
//! initial view is a shallow outline; rows use a fixed width and collapsed
//! height. Positions are computed absolute, then converted to
//! parent-relative.

use std::collections::BTreeMap;

use egui::{Pos2, Vec2};

use strata_model::{Camera, LayoutGraph};

use crate::util;
use crate::{EngineCapabilities, EngineError, LayoutEngine, LayoutOptions, LayoutOutcome, TREE};

const NODE_WIDTH: f32 = 220.0;
const COLLAPSED_HEIGHT: f32 = 64.0;
const INDENT_STEP: f32 = 32.0;
const ROW_GAP: f32 = 8.0;

pub struct TreeEngine;

impl LayoutEngine for TreeEngine {
    fn name(&self) -> &'static str {
        TREE
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

        // Uniform row geometry; all non-root nodes begin collapsed.
        let root_set: std::collections::HashSet<String> =
            graph.root_ids.iter().cloned().collect();
        for entry in graph.nodes.values_mut() {
            entry.set_size(Vec2::new(NODE_WIDTH, COLLAPSED_HEIGHT));
            if !root_set.contains(&entry.id) {
                entry.state.collapsed = true;
            }
        }

        // Visible rows: roots and their immediate children (everything
        // deeper sits under a collapsed ancestor).
        let mut absolute: BTreeMap<String, Pos2> = BTreeMap::new();
        let mut y = 0.0f32;
        fn place(
            graph: &mut LayoutGraph,
            id: &str,
            depth: usize,
            parent_visible: bool,
            parent_collapsed: bool,
            y: &mut f32,
            absolute: &mut BTreeMap<String, Pos2>,
        ) {
            let visible = parent_visible && !parent_collapsed;
            let (children, collapsed) = match graph.nodes.get_mut(id) {
                Some(entry) => {
                    entry.state.visible = visible;
                    if visible {
                        absolute.insert(id.to_string(), Pos2::new(depth as f32 * INDENT_STEP, *y));
                        *y += COLLAPSED_HEIGHT + ROW_GAP;
                    }
                    (entry.children.clone(), entry.state.collapsed)
                }
                None => return,
            };
            for child in children {
                place(graph, &child, depth + 1, visible, collapsed, y, absolute);
            }
        }
        for root in graph.root_ids.clone() {
            place(&mut graph, &root, 0, true, false, &mut y, &mut absolute);
        }

        // Hidden rows track their parent so later expansion starts sane.
        let parents = util::parent_map(&graph);
        let ids: Vec<String> = graph.nodes.keys().cloned().collect();
        for id in &ids {
            if !absolute.contains_key(id) {
                let base = parents
                    .get(id)
                    .and_then(|p| absolute.get(p))
                    .copied()
                    .unwrap_or(Pos2::ZERO);
                absolute.insert(id.clone(), base + Vec2::new(INDENT_STEP, COLLAPSED_HEIGHT));
            }
        }

        util::apply_absolute_positions(&mut graph, &absolute);
        util::stamp_display_mode(&mut graph, TREE);

        let mut outcome = LayoutOutcome::new(graph);
        if options.reason.frames_camera() {
            outcome.camera = Some(Camera::at(0.0, 0.0, 0.75));
        }
        Ok(outcome)
    }
}
