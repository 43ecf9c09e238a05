//! Canvas view - the engine facade
//!
//! Owns the camera and the current view graph, mediates interaction, and
//! keeps the render edge set consistent through collapse/expand,
//! collapse-to-level, and lens changes.

use std::collections::HashMap;

use bitflags::bitflags;
use egui::Vec2;

use strata_model::{Camera, CanvasData, CanvasNode};
use strata_state::CollapseBehavior;

use crate::cache::RenderCache;
use crate::inherit::recompute_edges;
use crate::interaction::{InteractionHandler, InteractionResponse, PointerEvent};
use crate::lens::{apply_lens, GraphLens};
use crate::lod::LodConfig;
use crate::render::{render_canvas_cached, CanvasRenderer};

/// Fixed footprint of a collapsed container.
pub const COLLAPSED_SIZE: Vec2 = Vec2::new(220.0, 64.0);
/// Padding around the child bounding box when a node grows on expand.
const EXPAND_PADDING: f32 = 40.0;
/// Fraction of the viewport used as slack by the camera bounds guard.
const CAMERA_GUARD_PADDING: f32 = 0.25;

bitflags! {
    /// What must be refreshed before the next frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderDirty: u32 {
        const NODES = 1 << 0;
        const EDGES = 1 << 1;
        const CAMERA = 1 << 2;
        const PATHS = 1 << 3;
    }
}

/// Per-descendant `(visible, collapsed)` flags captured at collapse time.
type SavedSubtree = HashMap<String, (bool, bool)>;

// =============================================================================
// VIEW
// =============================================================================

pub struct CanvasView {
    surface_id: String,
    pub camera: Camera,
    viewport: Vec2,
    data: CanvasData,
    pub interaction: InteractionHandler,
    pub lod: LodConfig,
    render_cache: RenderCache,
    saved_visibility: HashMap<String, SavedSubtree>,
    dirty: RenderDirty,
}

impl CanvasView {
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
            camera: Camera::default(),
            viewport: Vec2::new(1280.0, 800.0),
            data: CanvasData::default(),
            interaction: InteractionHandler::new(),
            lod: LodConfig::default(),
            render_cache: RenderCache::new(),
            saved_visibility: HashMap::new(),
            dirty: RenderDirty::all(),
        }
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn data(&self) -> &CanvasData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut CanvasData {
        self.dirty = RenderDirty::all();
        &mut self.data
    }

    /// Flags accumulated since the last `take_dirty`.
    pub fn take_dirty(&mut self) -> RenderDirty {
        std::mem::replace(&mut self.dirty, RenderDirty::empty())
    }

    // =========================================================================
    // DATA SWAPS
    // =========================================================================

    /// Replace the view graph. Adopts the snapshot's camera, re-derives the
    /// render edge set, and runs the camera bounds guard.
    pub fn set_data(&mut self, data: CanvasData) {
        self.adopt_snapshot(data, true);
        self.saved_visibility.clear();
        self.ensure_camera_visible();
    }

    /// Take over a snapshot published elsewhere (reflow corrections,
    /// external replays) without discarding saved collapse states.
    pub fn adopt_snapshot(&mut self, mut data: CanvasData, adopt_camera: bool) {
        data.refresh_world_positions();
        strata_model::resolve_tree_presentation(&mut data.nodes);
        if adopt_camera {
            self.camera = data.camera.clone();
        }
        self.data = data;
        recompute_edges(&mut self.data);
        self.interaction.invalidate();
        self.render_cache.invalidate_all();
        self.dirty = RenderDirty::all();
    }

    /// Snapshot of the current view graph with the live camera folded in.
    pub fn snapshot(&self) -> CanvasData {
        let mut data = self.data.clone();
        data.camera = self.camera.clone();
        data
    }

    // =========================================================================
    // COLLAPSE / EXPAND
    // =========================================================================

    pub fn set_node_collapsed(
        &mut self,
        guid: &str,
        collapsed: bool,
        behavior: CollapseBehavior,
    ) -> bool {
        if collapsed {
            self.collapse_node(guid, behavior)
        } else {
            self.expand_node(guid)
        }
    }

    /// Collapse: save the subtree's visibility state, hide every
    /// descendant, and pin the node where the user collapsed it.
    pub fn collapse_node(&mut self, guid: &str, behavior: CollapseBehavior) -> bool {
        let Some(node) = self.data.find_node_mut(guid) else {
            return false;
        };
        let mut saved = SavedSubtree::new();
        record_subtree(node, &mut saved);
        self.saved_visibility.insert(guid.to_string(), saved);

        node.collapsed = true;
        node.metadata.locked_position = Some(node.position);
        if behavior == CollapseBehavior::Shrink && !node.children.is_empty() {
            if node.metadata.default_size().is_none() {
                node.metadata.set_default_size(node.size);
            }
            node.size = COLLAPSED_SIZE;
        }
        node.hide_descendants();

        self.after_visibility_change();
        true
    }

    /// Expand: restore the saved subtree state when one exists, otherwise
    /// show only the immediate children, collapsed. Grows the node when the
    /// children no longer fit.
    pub fn expand_node(&mut self, guid: &str) -> bool {
        let saved = self.saved_visibility.remove(guid);
        let Some(node) = self.data.find_node_mut(guid) else {
            return false;
        };
        node.collapsed = false;
        if let Some(default) = node.metadata.default_size() {
            node.size = node.size.max(default);
        }

        match saved {
            Some(saved) => restore_subtree(node, &saved),
            None => {
                for child in &mut node.children {
                    child.visible = true;
                    child.collapsed = true;
                }
            }
        }

        if let Some(bounds) = node.child_bounds() {
            node.size.x = node.size.x.max(bounds.max.x + EXPAND_PADDING);
            node.size.y = node.size.y.max(bounds.max.y + EXPAND_PADDING);
        }

        self.after_visibility_change();
        true
    }

    /// Collapse the whole tree to a uniform depth.
    pub fn collapse_to_level(&mut self, level: usize) {
        let tree_mode = self.data.metadata.display_mode.as_deref() == Some("tree");

        fn walk(node: &mut CanvasNode, depth: usize, level: usize) {
            if depth < level {
                node.visible = true;
                node.collapsed = false;
            } else if depth == level {
                node.visible = true;
                node.collapsed = true;
            } else {
                node.visible = false;
                node.collapsed = true;
            }
            for child in &mut node.children {
                walk(child, depth + 1, level);
            }
        }
        for root in &mut self.data.nodes {
            walk(root, 0, level);
        }

        // Collapsed containers shrink to a predictable footprint.
        fn clamp(node: &mut CanvasNode, tree_mode: bool) {
            if node.collapsed && !node.children.is_empty() {
                if node.metadata.default_size().is_none() {
                    node.metadata.set_default_size(node.size);
                }
                node.size = if tree_mode {
                    node.metadata.default_size().unwrap_or(COLLAPSED_SIZE)
                } else {
                    COLLAPSED_SIZE
                };
            }
            for child in &mut node.children {
                clamp(child, tree_mode);
            }
        }
        for root in &mut self.data.nodes {
            clamp(root, tree_mode);
        }

        self.after_visibility_change();
    }

    fn after_visibility_change(&mut self) {
        recompute_edges(&mut self.data);
        self.data.refresh_world_positions();
        self.interaction.invalidate();
        self.render_cache.invalidate_all();
        self.dirty |= RenderDirty::NODES | RenderDirty::EDGES | RenderDirty::PATHS;
    }

    // =========================================================================
    // CAMERA GUARD
    // =========================================================================

    /// Re-centre on content when the camera is non-finite or the content
    /// sits entirely outside a 25%-padded viewport.
    pub fn ensure_camera_visible(&mut self) {
        let Some(bounds) = self.data.content_bounds() else {
            return;
        };
        if self.camera.is_finite() {
            let visible = self.camera.visible_bounds(self.viewport);
            let padded = visible.expand2(visible.size() * CAMERA_GUARD_PADDING);
            if padded.intersects(bounds) {
                return;
            }
        }
        let zoom = if self.camera.is_finite() {
            self.camera.zoom
        } else {
            1.0
        };
        self.camera.center_on(bounds, self.viewport, zoom);
        self.dirty |= RenderDirty::CAMERA;
    }

    // =========================================================================
    // INTERACTION
    // =========================================================================

    /// Feed one pointer event through the interaction handler and apply the
    /// structural follow-ups the handler cannot do itself.
    pub fn pointer(
        &mut self,
        event: PointerEvent,
        collapse_behavior: CollapseBehavior,
    ) -> InteractionResponse {
        let response = self.interaction.process(&mut self.data, &self.camera, event);
        match &response {
            InteractionResponse::DragFinished { guid }
            | InteractionResponse::ResizeFinished { guid } => {
                let guid = guid.clone();
                self.data.refresh_world_positions_from(&guid);
                self.data.invalidate_edge_waypoints(&guid);
                self.interaction.invalidate();
                self.render_cache.invalidate_node(&guid);
                self.dirty |= RenderDirty::NODES | RenderDirty::EDGES | RenderDirty::PATHS;
            }
            InteractionResponse::NodeMoved { .. } | InteractionResponse::NodeResized { .. } => {
                self.dirty |= RenderDirty::NODES | RenderDirty::EDGES;
            }
            InteractionResponse::CollapseToggled { guid, collapsed } => {
                let guid = guid.clone();
                let was_selection = self.interaction.selected() == Some(guid.as_str());
                self.set_node_collapsed(&guid, *collapsed, collapse_behavior);
                if was_selection {
                    self.interaction.refresh_selected_world(&self.data);
                }
            }
            _ => {}
        }
        response
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    /// Render through a lens: the authoritative model is untouched.
    pub fn render(&mut self, lens: GraphLens, renderer: &mut dyn CanvasRenderer) {
        let mut view = self.data.clone();
        apply_lens(&mut view, lens);
        render_canvas_cached(
            &view,
            &self.camera,
            self.data.metadata.layout_version,
            &self.lod,
            &mut self.render_cache,
            renderer,
        );
    }

    /// Render mid-transition: the lensed clone shows interpolated world
    /// geometry while the model already holds the final layout.
    pub fn render_animated(
        &mut self,
        lens: GraphLens,
        transition: &crate::transition::LayoutTransition,
        renderer: &mut dyn CanvasRenderer,
    ) {
        let mut view = self.data.clone();
        apply_lens(&mut view, lens);
        transition.sample_into(&mut view);
        render_canvas_cached(
            &view,
            &self.camera,
            self.data.metadata.layout_version,
            &self.lod,
            &mut self.render_cache,
            renderer,
        );
    }

    /// Renderer-cache hit/miss counters.
    pub fn render_cache_stats(&self) -> (u64, u64) {
        self.render_cache.stats()
    }
}

// =============================================================================
// SUBTREE STATE CAPTURE
// =============================================================================

fn record_subtree(node: &CanvasNode, saved: &mut SavedSubtree) {
    for child in &node.children {
        saved.insert(child.guid.clone(), (child.visible, child.collapsed));
        record_subtree(child, saved);
    }
}

fn restore_subtree(node: &mut CanvasNode, saved: &SavedSubtree) {
    for child in &mut node.children {
        if let Some(&(visible, collapsed)) = saved.get(&child.guid) {
            child.visible = visible;
            child.collapsed = collapsed;
        }
        restore_subtree(child, saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Pos2;
    use strata_model::{CanvasEdge, NodeKind};

    /// R -> { A -> { a1 -> { a1x }, a2 }, B }
    fn view() -> CanvasView {
        let mut data = CanvasData::default();
        let mut root = CanvasNode::new("R", "root", NodeKind::Root);
        root.size = Vec2::new(800.0, 600.0);
        let mut a = CanvasNode::new("A", "A", NodeKind::Container);
        let mut a1 = CanvasNode::new("a1", "a1", NodeKind::Container);
        a1.children.push(CanvasNode::new("a1x", "a1x", NodeKind::Node));
        a.children.push(a1);
        a.children.push(CanvasNode::new("a2", "a2", NodeKind::Node));
        root.children.push(a);
        root.children.push(CanvasNode::new("B", "B", NodeKind::Node));
        data.nodes.push(root);
        data.original_edges.push(CanvasEdge::new("e", "a1x", "B"));
        data.edges = data.original_edges.clone();

        let mut view = CanvasView::new("test-surface");
        view.set_data(data);
        view
    }

    #[test]
    fn test_collapse_saves_and_expand_restores_state() {
        let mut view = view();
        // a1 is collapsed within A before A itself collapses.
        view.collapse_node("a1", CollapseBehavior::FullSize);
        view.collapse_node("A", CollapseBehavior::FullSize);
        assert!(!view.data().find_node("a1").unwrap().visible);

        view.expand_node("A");
        let a1 = view.data().find_node("a1").unwrap();
        // Restored exactly: visible again, still collapsed.
        assert!(a1.visible);
        assert!(a1.collapsed);
        assert!(!view.data().find_node("a1x").unwrap().visible);
    }

    #[test]
    fn test_expand_without_saved_state_shows_children_collapsed() {
        let mut view = view();
        // Simulate a collapse that arrived from outside (no saved state).
        {
            let data = view.data_mut();
            let a = data.find_node_mut("A").unwrap();
            a.collapsed = true;
            a.hide_descendants();
        }
        view.expand_node("A");
        let a1 = view.data().find_node("a1").unwrap();
        assert!(a1.visible);
        assert!(a1.collapsed);
        assert!(!view.data().find_node("a1x").unwrap().visible);
    }

    #[test]
    fn test_collapse_pins_locked_position_and_keeps_it_on_expand() {
        let mut view = view();
        {
            let data = view.data_mut();
            let a = data.find_node_mut("A").unwrap();
            a.position = Pos2::new(77.0, 88.0);
            a.metadata.user_locked = true;
        }
        view.collapse_node("A", CollapseBehavior::FullSize);
        view.expand_node("A");
        let a = view.data().find_node("A").unwrap();
        assert_eq!(a.metadata.locked_position, Some(Pos2::new(77.0, 88.0)));
        assert!(a.metadata.user_locked);
    }

    #[test]
    fn test_shrink_behavior_restores_size_on_expand() {
        let mut view = view();
        {
            let data = view.data_mut();
            data.find_node_mut("A").unwrap().size = Vec2::new(500.0, 400.0);
        }
        view.collapse_node("A", CollapseBehavior::Shrink);
        assert_eq!(view.data().find_node("A").unwrap().size, COLLAPSED_SIZE);
        view.expand_node("A");
        let size = view.data().find_node("A").unwrap().size;
        assert!(size.x >= 500.0);
        assert!(size.y >= 400.0);
    }

    #[test]
    fn test_collapse_rewires_edges() {
        let mut view = view();
        view.collapse_node("A", CollapseBehavior::FullSize);
        let edges = &view.data().edges;
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].guid, "inherited-e");
        assert_eq!(edges[0].from_guid, "A");
        assert_eq!(edges[0].to_guid, "B");
    }

    #[test]
    fn test_collapse_to_level_one() {
        let mut view = view();
        view.collapse_to_level(1);

        let data = view.data();
        assert!(data.find_node("R").unwrap().visible);
        assert!(!data.find_node("R").unwrap().collapsed);
        for guid in ["A", "B"] {
            let node = data.find_node(guid).unwrap();
            assert!(node.visible, "{guid} should be visible");
            assert!(node.collapsed, "{guid} should be collapsed");
        }
        for guid in ["a1", "a2", "a1x"] {
            assert!(!data.find_node(guid).unwrap().visible, "{guid} should be hidden");
        }
        // A is a collapsed container: clamped footprint.
        assert_eq!(data.find_node("A").unwrap().size, COLLAPSED_SIZE);
        // Edge from hidden a1x rewired to nearest visible ancestor A.
        assert_eq!(data.edges[0].guid, "inherited-e");
        assert_eq!(data.edges[0].from_guid, "A");
    }

    #[test]
    fn test_camera_guard_recenters_lost_camera() {
        let mut view = view();
        view.camera = Camera::at(100_000.0, 100_000.0, 1.0);
        view.ensure_camera_visible();
        let bounds = view.data().content_bounds().unwrap();
        let visible = view.camera.visible_bounds(view.viewport());
        assert!(visible.intersects(bounds));
    }

    #[test]
    fn test_camera_guard_repairs_non_finite() {
        let mut view = view();
        view.camera.x = f32::NAN;
        view.ensure_camera_visible();
        assert!(view.camera.is_finite());
    }

    #[test]
    fn test_camera_guard_leaves_good_camera_alone() {
        let mut view = view();
        view.camera = Camera::at(10.0, 10.0, 1.0);
        let before = view.camera.clone();
        view.ensure_camera_visible();
        assert_eq!(view.camera, before);
    }
}
