//! Renderer contract
//!
//! The runtime never draws pixels. It resolves the view model and camera
//! into screen-space draw ops and hands them to a `CanvasRenderer`
//! implementation. Missing metadata is defaulted, never an error.

use egui::{Pos2, Rect};

use strata_model::{Camera, CanvasData, EdgeStyle, LayoutGraph, NodeKind, NodeStyle};

use crate::cache::RenderCache;
use crate::inherit::effective_visibility;
use crate::lod::LodConfig;

// =============================================================================
// PRESENTATION FRAME
// =============================================================================

/// Versioned output of a layout pass.
#[derive(Debug, Clone)]
pub struct PresentationFrame {
    pub layout_version: u64,
    pub display_mode: Option<String>,
    pub graph: LayoutGraph,
    /// Camera the engine emitted, when it did.
    pub camera: Option<Camera>,
}

// =============================================================================
// DRAW OPS
// =============================================================================

/// One node resolved to screen space.
#[derive(Debug, Clone)]
pub struct NodeDrawOp {
    pub guid: String,
    pub label: String,
    pub kind: NodeKind,
    pub screen_rect: Rect,
    pub style: NodeStyle,
    pub selected: bool,
    pub collapsed: bool,
    /// Whether corner resize handles should be drawn.
    pub show_handles: bool,
}

/// One edge resolved to screen space.
#[derive(Debug, Clone)]
pub struct EdgeDrawOp {
    pub guid: String,
    pub points: Vec<Pos2>,
    pub style: EdgeStyle,
    pub label: Option<String>,
    /// Arrowhead triangle at the target end, when the geometry allows one.
    pub arrow: Option<[Pos2; 3]>,
}

/// Draw target implemented by actual backends.
pub trait CanvasRenderer {
    fn begin_frame(&mut self, camera: &Camera, layout_version: u64);
    fn draw_edge(&mut self, op: &EdgeDrawOp);
    fn draw_node(&mut self, op: &NodeDrawOp);
    fn end_frame(&mut self);
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve with the default level-of-detail thresholds, uncached.
pub fn render_canvas(
    data: &CanvasData,
    camera: &Camera,
    layout_version: u64,
    renderer: &mut dyn CanvasRenderer,
) {
    render_canvas_with(data, camera, layout_version, &LodConfig::default(), renderer);
}

/// Resolve without a cache.
pub fn render_canvas_with(
    data: &CanvasData,
    camera: &Camera,
    layout_version: u64,
    lod: &LodConfig,
    renderer: &mut dyn CanvasRenderer,
) {
    render_inner(data, camera, layout_version, lod, None, renderer);
}

/// Resolve through a renderer cache keyed by the layout version.
pub fn render_canvas_cached(
    data: &CanvasData,
    camera: &Camera,
    layout_version: u64,
    lod: &LodConfig,
    cache: &mut RenderCache,
    renderer: &mut dyn CanvasRenderer,
) {
    cache.begin_frame(layout_version);
    render_inner(data, camera, layout_version, lod, Some(cache), renderer);
}

/// Resolve the visible canvas into draw ops: edges below nodes, nodes in
/// document order so children paint above their containers. Detail is
/// degraded by zoom before any op is emitted.
fn render_inner(
    data: &CanvasData,
    camera: &Camera,
    layout_version: u64,
    lod: &LodConfig,
    mut cache: Option<&mut RenderCache>,
    renderer: &mut dyn CanvasRenderer,
) {
    let detail = lod.level(camera.zoom);
    renderer.begin_frame(camera, layout_version);

    let visibility = effective_visibility(data);
    let visible = |guid: &str| visibility.get(guid).copied().unwrap_or(false);

    // World rects for edge endpoints without routed waypoints.
    let mut rects: std::collections::HashMap<String, Rect> = std::collections::HashMap::new();
    data.for_each_node(|node, abs, _| {
        // Prefer the maintained mirror; fall back to the computed sum.
        let world = node.metadata.world_position.unwrap_or(abs);
        rects.insert(node.guid.clone(), Rect::from_min_size(world, node.size));
    });

    for edge in &data.edges {
        if !visible(&edge.from_guid) || !visible(&edge.to_guid) {
            continue;
        }
        let world_points: Vec<Pos2> = if edge.waypoints.is_empty() {
            let (Some(from), Some(to)) = (rects.get(&edge.from_guid), rects.get(&edge.to_guid))
            else {
                continue;
            };
            let mut points = vec![from.center(), to.center()];
            crate::edges::trim_to_rects(&mut points, *from, *to);
            points
        } else {
            edge.waypoints.to_vec()
        };
        let points: Vec<Pos2> = world_points
            .into_iter()
            .map(|p| camera.world_to_screen(p))
            .collect();
        renderer.draw_edge(&EdgeDrawOp {
            guid: edge.guid.clone(),
            arrow: crate::edges::arrow_head(&points),
            points,
            style: edge.style.clone(),
            label: if detail.shows_edge_labels() {
                edge.label.clone()
            } else {
                None
            },
        });
    }

    data.for_each_node(|node, abs, _| {
        if !visible(&node.guid) {
            return;
        }
        let world = node.metadata.world_position.unwrap_or(abs);
        let screen_rect = Rect::from_min_max(
            camera.world_to_screen(world),
            camera.world_to_screen(world + node.size),
        );
        let (mut style, label) = match cache.as_deref_mut() {
            Some(cache) => {
                let cached = cache.presentation(node);
                (cached.style, cached.label)
            }
            None => (node.style.clone(), node.display_label().to_string()),
        };
        style.show_label &= detail.shows_labels();
        if !detail.shows_icons() {
            style.icon = None;
        }
        if !detail.shows_badges() {
            style.badges.clear();
        }
        renderer.draw_node(&NodeDrawOp {
            guid: node.guid.clone(),
            label,
            kind: node.kind,
            screen_rect,
            style,
            selected: node.selected,
            collapsed: node.collapsed,
            show_handles: node.selected && !node.dragging,
        });
    });

    renderer.end_frame();
}

// =============================================================================
// RECORDING RENDERER
// =============================================================================

/// Test/diagnostic backend that records every draw op.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub nodes: Vec<NodeDrawOp>,
    pub edges: Vec<EdgeDrawOp>,
    pub frames: usize,
    pub last_layout_version: u64,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, guid: &str) -> Option<&NodeDrawOp> {
        self.nodes.iter().find(|op| op.guid == guid)
    }
}

impl CanvasRenderer for RecordingRenderer {
    fn begin_frame(&mut self, _camera: &Camera, layout_version: u64) {
        self.nodes.clear();
        self.edges.clear();
        self.last_layout_version = layout_version;
    }

    fn draw_edge(&mut self, op: &EdgeDrawOp) {
        self.edges.push(op.clone());
    }

    fn draw_node(&mut self, op: &NodeDrawOp) {
        self.nodes.push(op.clone());
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Vec2;
    use strata_model::{CanvasEdge, CanvasNode};

    fn data() -> CanvasData {
        let mut data = CanvasData::default();
        let mut root = CanvasNode::new("r", "root", NodeKind::Container);
        root.size = Vec2::new(300.0, 200.0);
        let mut child = CanvasNode::new("c", "child", NodeKind::Node);
        child.position = Pos2::new(20.0, 60.0);
        root.children.push(child);
        data.nodes.push(root);
        data.original_edges.push(CanvasEdge::new("e", "r", "c"));
        data.edges = data.original_edges.clone();
        data.refresh_world_positions();
        data
    }

    #[test]
    fn test_renders_nodes_in_document_order() {
        let mut renderer = RecordingRenderer::new();
        render_canvas(&data(), &Camera::default(), 3, &mut renderer);
        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.last_layout_version, 3);
        let order: Vec<&str> = renderer.nodes.iter().map(|op| op.guid.as_str()).collect();
        assert_eq!(order, vec!["r", "c"]);
    }

    #[test]
    fn test_camera_transform_applied() {
        let mut renderer = RecordingRenderer::new();
        let camera = Camera::at(10.0, 10.0, 2.0);
        render_canvas(&data(), &camera, 0, &mut renderer);
        let child = renderer.node("c").unwrap();
        // World (20,60) -> screen ((20-10)*2, (60-10)*2).
        assert_eq!(child.screen_rect.min, Pos2::new(20.0, 100.0));
    }

    #[test]
    fn test_hidden_nodes_and_their_edges_skipped() {
        let mut d = data();
        {
            let root = d.find_node_mut("r").unwrap();
            root.collapsed = true;
            root.hide_descendants();
        }
        let mut renderer = RecordingRenderer::new();
        render_canvas(&d, &Camera::default(), 0, &mut renderer);
        assert!(renderer.node("c").is_none());
        assert!(renderer.edges.is_empty());
    }

    #[test]
    fn test_missing_world_metadata_is_defaulted() {
        let mut d = data();
        // Strip the mirrors; rendering must fall back to computed sums.
        d.find_node_mut("c").unwrap().metadata.world_position = None;
        let mut renderer = RecordingRenderer::new();
        render_canvas(&d, &Camera::default(), 0, &mut renderer);
        assert_eq!(renderer.node("c").unwrap().screen_rect.min, Pos2::new(20.0, 60.0));
    }

    #[test]
    fn test_zoomed_out_drops_labels_and_badges() {
        let mut d = data();
        d.find_node_mut("r").unwrap().style.badges.push("badge".into());
        d.edges[0].label = Some("calls".into());

        let mut renderer = RecordingRenderer::new();
        render_canvas(&d, &Camera::at(0.0, 0.0, 0.2), 0, &mut renderer);
        let root = renderer.node("r").unwrap();
        assert!(!root.style.show_label);
        assert!(root.style.badges.is_empty());
        assert!(renderer.edges[0].label.is_none());

        render_canvas(&d, &Camera::at(0.0, 0.0, 1.0), 0, &mut renderer);
        let root = renderer.node("r").unwrap();
        assert!(root.style.show_label);
        assert_eq!(root.style.badges, vec!["badge".to_string()]);
        assert_eq!(renderer.edges[0].label.as_deref(), Some("calls"));
    }

    #[test]
    fn test_edges_use_waypoints_when_present() {
        let mut d = data();
        d.edges[0].waypoints.push(Pos2::new(0.0, 0.0));
        d.edges[0].waypoints.push(Pos2::new(50.0, 50.0));
        d.edges[0].waypoints.push(Pos2::new(100.0, 0.0));
        let mut renderer = RecordingRenderer::new();
        render_canvas(&d, &Camera::default(), 0, &mut renderer);
        assert_eq!(renderer.edges[0].points.len(), 3);
    }
}
