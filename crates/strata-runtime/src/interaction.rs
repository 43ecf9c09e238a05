//! Interaction handling
//!
//! Pointer events against the view model: selection, drag with
//! parent-interior clamping, corner resize with a minimum size, and
//! double-click collapse. Follows the actions-out pattern: events come in,
//! `InteractionResponse` values come out, and the facade decides what to
//! publish.

use std::collections::HashMap;

use egui::{Pos2, Rect, Vec2};

use strata_model::{Camera, CanvasData};

use crate::spatial::SpatialIndex;

/// Interior padding a dragged node must keep from its parent's edges.
pub const DRAG_PADDING: f32 = 10.0;
/// Height of a container's header band.
pub const HEADER_OFFSET: f32 = 50.0;
/// Gap below the header before child content may start.
pub const HEADER_GAP: f32 = 10.0;
/// Side length of a corner resize hit box, in screen pixels.
pub const RESIZE_HANDLE_SIZE: f32 = 12.0;
/// Distance of a handle's centre outside the node corner, in screen pixels.
pub const RESIZE_HANDLE_OUTSET: f32 = 6.0;
/// Minimum node extent enforced while resizing.
pub const MIN_NODE_SIZE: f32 = 50.0;

// =============================================================================
// EVENTS & RESPONSES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    Nw,
    Ne,
    Se,
    Sw,
}

impl ResizeHandle {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Nw => "nw",
            Self::Ne => "ne",
            Self::Se => "se",
            Self::Sw => "sw",
        }
    }
}

/// Pointer intents, already translated to world coordinates by the caller
/// (except resize hit tests, which are screen-space by nature).
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Hover { world: Pos2 },
    Select { world: Pos2 },
    DragStart { world: Pos2 },
    DragUpdate { world: Pos2 },
    DragStop,
    HitTestResize { screen: Pos2 },
    ResizeStart { world: Pos2, handle: ResizeHandle },
    ResizeUpdate { world: Pos2 },
    ResizeStop,
    DoubleClick { world: Pos2 },
}

/// What happened; the facade turns these into mutations and events.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResponse {
    None,
    HoverChanged { guid: Option<String> },
    SelectionChanged { guid: Option<String> },
    DragStarted { guid: String },
    NodeMoved { guid: String },
    DragFinished { guid: String },
    ResizeHandleHit { handle: Option<ResizeHandle> },
    ResizeStarted { guid: String, handle: ResizeHandle },
    NodeResized { guid: String },
    ResizeFinished { guid: String },
    CollapseToggled { guid: String, collapsed: bool },
}

// =============================================================================
// HANDLER
// =============================================================================

#[derive(Debug, Default)]
pub struct InteractionHandler {
    hovered: Option<String>,
    selected: Option<String>,
    selected_world: Option<Pos2>,
    dragging: Option<String>,
    drag_offset: Vec2,
    resizing: Option<(String, ResizeHandle)>,
    /// GUID → ancestor GUIDs, accelerating absolute-position lookups.
    path_cache: HashMap<String, Vec<String>>,
    spatial: Option<SpatialIndex>,
}

impl InteractionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_world(&self) -> Option<Pos2> {
        self.selected_world
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Drop the path cache and spatial index after any structural change.
    pub fn invalidate(&mut self) {
        self.path_cache.clear();
        self.spatial = None;
    }

    /// Dispatch one pointer event.
    pub fn process(
        &mut self,
        data: &mut CanvasData,
        camera: &Camera,
        event: PointerEvent,
    ) -> InteractionResponse {
        match event {
            PointerEvent::Hover { world } => self.hover(data, world),
            PointerEvent::Select { world } => self.select(data, world),
            PointerEvent::DragStart { world } => self.drag_start(data, world),
            PointerEvent::DragUpdate { world } => self.drag_update(data, world),
            PointerEvent::DragStop => self.drag_stop(data),
            PointerEvent::HitTestResize { screen } => InteractionResponse::ResizeHandleHit {
                handle: self.hit_test_resize(data, camera, screen),
            },
            PointerEvent::ResizeStart { world, handle } => self.resize_start(data, world, handle),
            PointerEvent::ResizeUpdate { world } => self.resize_update(data, world),
            PointerEvent::ResizeStop => self.resize_stop(),
            PointerEvent::DoubleClick { world } => self.double_click(data, world),
        }
    }

    // =========================================================================
    // HOVER & SELECTION
    // =========================================================================

    fn hover(&mut self, data: &mut CanvasData, world: Pos2) -> InteractionResponse {
        let hit = self.hit_test(data, world);
        if hit == self.hovered {
            return InteractionResponse::None;
        }
        self.hovered = hit.clone();
        InteractionResponse::HoverChanged { guid: hit }
    }

    fn select(&mut self, data: &mut CanvasData, world: Pos2) -> InteractionResponse {
        let hit = self.hit_test(data, world);
        data.clear_selection();
        self.selected = hit.clone();
        self.selected_world = None;
        if let Some(guid) = &hit {
            if let Some(node) = data.find_node_mut(guid) {
                node.selected = true;
            }
            self.selected_world = self.absolute_position(data, guid);
        }
        InteractionResponse::SelectionChanged { guid: hit }
    }

    // =========================================================================
    // DRAG
    // =========================================================================

    fn drag_start(&mut self, data: &mut CanvasData, world: Pos2) -> InteractionResponse {
        let Some(guid) = self.hit_test(data, world) else {
            data.clear_selection();
            self.selected = None;
            self.selected_world = None;
            return InteractionResponse::SelectionChanged { guid: None };
        };
        data.clear_selection();
        let Some(abs) = self.absolute_position(data, &guid) else {
            return InteractionResponse::None;
        };
        self.drag_offset = world - abs;
        self.dragging = Some(guid.clone());
        self.selected = Some(guid.clone());
        self.selected_world = Some(abs);
        if let Some(node) = data.find_node_mut(&guid) {
            node.selected = true;
            node.dragging = true;
        }
        InteractionResponse::DragStarted { guid }
    }

    fn drag_update(&mut self, data: &mut CanvasData, world: Pos2) -> InteractionResponse {
        let Some(guid) = self.dragging.clone() else {
            return InteractionResponse::None;
        };
        let parent_guid = data.parent_of(&guid);
        let parent_abs = parent_guid
            .as_ref()
            .and_then(|p| self.absolute_position(data, p))
            .unwrap_or(Pos2::ZERO);
        let parent_size = parent_guid
            .as_ref()
            .and_then(|p| data.find_node(p))
            .map(|p| p.size);

        let target = world - self.drag_offset - parent_abs.to_vec2();
        let mut relative = Pos2::new(target.x, target.y);
        if let Some(parent_size) = parent_size {
            let node_size = data.find_node(&guid).map(|n| n.size).unwrap_or(Vec2::ZERO);
            let min = Pos2::new(DRAG_PADDING, HEADER_OFFSET + HEADER_GAP);
            let max = Pos2::new(
                (parent_size.x - node_size.x - DRAG_PADDING).max(min.x),
                (parent_size.y - node_size.y - DRAG_PADDING).max(min.y),
            );
            relative = relative.clamp(min, max);
        }

        if let Some(node) = data.find_node_mut(&guid) {
            node.position = relative;
            node.metadata.locked_position = Some(relative);
            node.metadata.user_locked = true;
        }
        data.refresh_world_positions_from(&guid);
        self.selected_world = self.absolute_position(data, &guid);
        InteractionResponse::NodeMoved { guid }
    }

    fn drag_stop(&mut self, data: &mut CanvasData) -> InteractionResponse {
        let Some(guid) = self.dragging.take() else {
            return InteractionResponse::None;
        };
        if let Some(node) = data.find_node_mut(&guid) {
            node.dragging = false;
        }
        // Positions changed underneath the index.
        self.spatial = None;
        InteractionResponse::DragFinished { guid }
    }

    // =========================================================================
    // RESIZE
    // =========================================================================

    /// Corner hit boxes: squares centred just outside each corner of the
    /// selected node, in screen coordinates.
    fn hit_test_resize(
        &mut self,
        data: &CanvasData,
        camera: &Camera,
        screen: Pos2,
    ) -> Option<ResizeHandle> {
        let guid = self.selected.clone()?;
        let abs = data.absolute_position(&guid)?;
        let size = data.find_node(&guid)?.size;
        let min = camera.world_to_screen(abs);
        let max = camera.world_to_screen(abs + size);

        let corners = [
            (ResizeHandle::Nw, Pos2::new(min.x, min.y), Vec2::new(-1.0, -1.0)),
            (ResizeHandle::Ne, Pos2::new(max.x, min.y), Vec2::new(1.0, -1.0)),
            (ResizeHandle::Se, Pos2::new(max.x, max.y), Vec2::new(1.0, 1.0)),
            (ResizeHandle::Sw, Pos2::new(min.x, max.y), Vec2::new(-1.0, 1.0)),
        ];
        for (handle, corner, outward) in corners {
            let center = corner + outward * RESIZE_HANDLE_OUTSET;
            let hit_box = Rect::from_center_size(center, Vec2::splat(RESIZE_HANDLE_SIZE));
            if hit_box.contains(screen) {
                return Some(handle);
            }
        }
        None
    }

    fn resize_start(
        &mut self,
        data: &CanvasData,
        _world: Pos2,
        handle: ResizeHandle,
    ) -> InteractionResponse {
        let Some(guid) = self.selected.clone() else {
            return InteractionResponse::None;
        };
        if data.find_node(&guid).is_none() {
            return InteractionResponse::None;
        }
        self.resizing = Some((guid.clone(), handle));
        InteractionResponse::ResizeStarted { guid, handle }
    }

    fn resize_update(&mut self, data: &mut CanvasData, world: Pos2) -> InteractionResponse {
        let Some((guid, handle)) = self.resizing.clone() else {
            return InteractionResponse::None;
        };
        let Some(abs) = self.absolute_position(data, &guid) else {
            return InteractionResponse::None;
        };
        let Some(size) = data.find_node(&guid).map(|n| n.size) else {
            return InteractionResponse::None;
        };
        let right = abs.x + size.x;
        let bottom = abs.y + size.y;

        // Opposite corner stays anchored; the minimum wins over the cursor.
        let (new_min, new_size) = match handle {
            ResizeHandle::Se => {
                let w = (world.x - abs.x).max(MIN_NODE_SIZE);
                let h = (world.y - abs.y).max(MIN_NODE_SIZE);
                (abs, Vec2::new(w, h))
            }
            ResizeHandle::Ne => {
                let w = (world.x - abs.x).max(MIN_NODE_SIZE);
                let h = (bottom - world.y).max(MIN_NODE_SIZE);
                (Pos2::new(abs.x, bottom - h), Vec2::new(w, h))
            }
            ResizeHandle::Nw => {
                let w = (right - world.x).max(MIN_NODE_SIZE);
                let h = (bottom - world.y).max(MIN_NODE_SIZE);
                (Pos2::new(right - w, bottom - h), Vec2::new(w, h))
            }
            ResizeHandle::Sw => {
                let w = (right - world.x).max(MIN_NODE_SIZE);
                let h = (world.y - abs.y).max(MIN_NODE_SIZE);
                (Pos2::new(right - w, abs.y), Vec2::new(w, h))
            }
        };

        let parent_guid = data.parent_of(&guid);
        let parent_abs = parent_guid
            .as_ref()
            .and_then(|p| self.absolute_position(data, p))
            .unwrap_or(Pos2::ZERO);
        let mut relative = new_min - parent_abs.to_vec2();
        let mut final_size = new_size;
        if let Some(parent) = parent_guid.as_ref().and_then(|p| data.find_node(p)) {
            // Containment: stay inside the parent interior.
            let min = Pos2::new(DRAG_PADDING, HEADER_OFFSET + HEADER_GAP);
            relative = relative.clamp(
                min,
                Pos2::new(
                    (parent.size.x - final_size.x - DRAG_PADDING).max(min.x),
                    (parent.size.y - final_size.y - DRAG_PADDING).max(min.y),
                ),
            );
            final_size.x = final_size
                .x
                .min(parent.size.x - relative.x - DRAG_PADDING)
                .max(MIN_NODE_SIZE);
            final_size.y = final_size
                .y
                .min(parent.size.y - relative.y - DRAG_PADDING)
                .max(MIN_NODE_SIZE);
        }

        if let Some(node) = data.find_node_mut(&guid) {
            node.position = relative;
            node.size = final_size;
            // Children re-pack within the new bounds; user-locked children
            // hold their place.
            if !node.children.is_empty() {
                let bounds = node.size;
                crate::reflow::pack_grid(
                    &mut node.children,
                    bounds,
                    crate::reflow::header_for(bounds.y),
                );
            }
        }
        data.refresh_world_positions_from(&guid);
        self.selected_world = self.absolute_position(data, &guid);
        InteractionResponse::NodeResized { guid }
    }

    fn resize_stop(&mut self) -> InteractionResponse {
        let Some((guid, _)) = self.resizing.take() else {
            return InteractionResponse::None;
        };
        self.spatial = None;
        InteractionResponse::ResizeFinished { guid }
    }

    // =========================================================================
    // DOUBLE-CLICK
    // =========================================================================

    fn double_click(&mut self, data: &mut CanvasData, world: Pos2) -> InteractionResponse {
        let Some(guid) = self.hit_test(data, world) else {
            return InteractionResponse::None;
        };
        let Some(node) = data.find_node(&guid) else {
            return InteractionResponse::None;
        };
        InteractionResponse::CollapseToggled {
            collapsed: !node.collapsed,
            guid,
        }
    }

    /// Refresh the remembered world position of the selection; called by
    /// the facade after a collapse toggle on the selected node.
    pub fn refresh_selected_world(&mut self, data: &CanvasData) {
        if let Some(guid) = self.selected.clone() {
            self.selected_world = self.absolute_position(data, &guid);
        }
    }

    // =========================================================================
    // HIT TESTING & PATH CACHE
    // =========================================================================

    /// Topmost visible node under a world point.
    pub fn hit_test(&mut self, data: &CanvasData, world: Pos2) -> Option<String> {
        if self.spatial.is_none() {
            self.spatial = Some(SpatialIndex::from_canvas(data));
        }
        self.spatial
            .as_ref()
            .and_then(|index| index.topmost_at(world))
            .map(|node| node.guid.clone())
    }

    /// Absolute position through the path cache; a stale entry is dropped
    /// and recomputed with a fresh traversal.
    pub fn absolute_position(&mut self, data: &CanvasData, guid: &str) -> Option<Pos2> {
        if let Some(path) = self.path_cache.get(guid) {
            if let Some(abs) = sum_along_path(data, path, guid) {
                return Some(abs);
            }
            self.path_cache.remove(guid);
        }
        let path = data.path_to(guid)?;
        let abs = sum_along_path(data, &path, guid);
        self.path_cache.insert(guid.to_string(), path);
        abs
    }
}

/// Walk a known ancestor path summing relative positions. `None` when the
/// path no longer matches the tree.
fn sum_along_path(data: &CanvasData, path: &[String], guid: &str) -> Option<Pos2> {
    let mut origin = Pos2::ZERO;
    let mut nodes = &data.nodes;
    for ancestor in path {
        let node = nodes.iter().find(|n| &n.guid == ancestor)?;
        origin += node.position.to_vec2();
        nodes = &node.children;
    }
    let node = nodes.iter().find(|n| n.guid == guid)?;
    Some(origin + node.position.to_vec2())
}
