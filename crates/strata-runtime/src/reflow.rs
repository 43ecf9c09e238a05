//! Dynamic reflow
//!
//! Reacts to collapse/expand mutations by recomputing sibling positions
//! and container bounds. The responder listens to the view-state stream,
//! ignores mutations published by the layout side, and republishes its
//! correction as a `layout` mutation so it never triggers itself.
//!
//! User-locked nodes are never moved; the collapsed node itself keeps the
//! position the user collapsed it at.

use egui::{Pos2, Vec2};

use strata_model::{CanvasData, CanvasNode};
use strata_state::{
    AutoLayoutSettings, CanvasMutation, MutationKind, MutationSource, ReflowBehavior,
    SubscriberId, Subscription, ViewStateService,
};

/// Horizontal spacing between packed siblings.
const GRID_H_SPACING: f32 = 30.0;
/// Vertical spacing between packed rows.
const GRID_V_SPACING: f32 = 20.0;
/// Side padding inside the container.
const GRID_PADDING: f32 = 20.0;
/// Padding added around children when fitting container bounds.
const FIT_PADDING: f32 = 40.0;
/// Effective packing size of a collapsed node that still has children.
const COLLAPSED_PACK_SIZE: Vec2 = Vec2::new(180.0, 60.0);
/// Vertical gap used by the stack fallback.
const STACK_SPACING: f32 = 20.0;

// =============================================================================
// RESPONDER
// =============================================================================

/// Subscriber that turns collapse mutations into corrective layout
/// mutations.
pub struct DynamicReflowResponder {
    subscription: Subscription,
    origin: SubscriberId,
}

impl DynamicReflowResponder {
    pub fn attach(service: &mut ViewStateService) -> Self {
        let subscription = service.subscribe();
        Self {
            origin: subscription.id(),
            subscription,
        }
    }

    /// Drain pending mutations and run reflow for each qualifying
    /// collapse. Returns the number of corrections published.
    pub fn process(
        &mut self,
        service: &mut ViewStateService,
        settings: &AutoLayoutSettings,
    ) -> usize {
        let mut corrections = 0;
        for mutation in self.subscription.drain() {
            if !self.should_respond(&mutation, settings) {
                continue;
            }
            let Some(guid) = mutation.node_guid.clone() else {
                continue;
            };
            let mut draft = service.snapshot();
            let original_position = draft.find_node(&guid).map(|n| n.position);

            reflow_after_collapse(&mut draft, &guid);

            // The user collapsed this node where it stands; reflow moves
            // its siblings, not the node itself.
            if let (Some(position), Some(node)) = (original_position, draft.find_node_mut(&guid)) {
                node.position = position;
            }
            fit_containers(&mut draft);
            draft.refresh_world_positions();

            service.publish(
                &draft,
                MutationKind::Layout,
                MutationSource::Layout,
                Some(guid),
                None,
                Some(self.origin),
            );
            corrections += 1;
        }
        corrections
    }

    fn should_respond(&self, mutation: &CanvasMutation, settings: &AutoLayoutSettings) -> bool {
        mutation.kind == MutationKind::Collapse
            && mutation.source != MutationSource::Layout
            && settings.reflow_behavior == ReflowBehavior::Dynamic
    }
}

// =============================================================================
// REFLOW ALGORITHM
// =============================================================================

/// Reflow around one changed node: its own children if it is user-locked
/// and expanded, its sibling list otherwise.
pub fn reflow_after_collapse(data: &mut CanvasData, guid: &str) {
    let Some(node) = data.find_node(guid) else {
        return;
    };
    let user_locked = node.metadata.user_locked;
    let collapsed = node.collapsed;

    if user_locked && !collapsed {
        // The user pinned this container; rearrange only inside it.
        if let Some(node) = data.find_node_mut(guid) {
            let bounds = node.size;
            pack_grid(&mut node.children, bounds, header_for(bounds.y));
        }
        return;
    }

    match data.parent_of(guid) {
        Some(parent_guid) => {
            if let Some(parent) = data.find_node_mut(&parent_guid) {
                let bounds = parent.size;
                pack_grid(&mut parent.children, bounds, header_for(bounds.y));
            }
        }
        None => stack_roots(data),
    }
}

/// Header offset proportional to the container height.
pub(crate) fn header_for(container_height: f32) -> f32 {
    (container_height * 0.1).clamp(40.0, 80.0)
}

/// Packing size: collapsed containers pack as a fixed compact footprint.
fn pack_size(node: &CanvasNode) -> Vec2 {
    if node.collapsed && !node.children.is_empty() {
        COLLAPSED_PACK_SIZE
    } else {
        node.size
    }
}

/// Optimal-grid packing inside known container bounds: area-descending,
/// left to right, wrapping when the next node would cross the right edge.
/// User-locked nodes hold their position and are skipped.
pub(crate) fn pack_grid(children: &mut [CanvasNode], bounds: Vec2, header: f32) {
    let mut order: Vec<usize> = (0..children.len())
        .filter(|&i| children[i].visible && !children[i].metadata.user_locked)
        .collect();
    order.sort_by(|&a, &b| {
        let area = |n: &CanvasNode| {
            let s = pack_size(n);
            s.x * s.y
        };
        area(&children[b])
            .partial_cmp(&area(&children[a]))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(children[a].guid.cmp(&children[b].guid))
    });

    let right_limit = bounds.x - GRID_PADDING;
    let mut cursor = Pos2::new(GRID_PADDING, header);
    let mut row_height = 0.0f32;
    for index in order {
        let size = pack_size(&children[index]);
        if cursor.x > GRID_PADDING && cursor.x + size.x > right_limit {
            cursor.x = GRID_PADDING;
            cursor.y += row_height + GRID_V_SPACING;
            row_height = 0.0;
        }
        let mut position = cursor;
        // Clamp so the right edge never crosses the interior.
        position.x = position.x.min((right_limit - size.x).max(GRID_PADDING));
        children[index].position = position;
        cursor.x += size.x + GRID_H_SPACING;
        row_height = row_height.max(size.y);
    }
}

/// Root nodes have no container bounds; stack them vertically.
fn stack_roots(data: &mut CanvasData) {
    let mut y = 0.0f32;
    for root in &mut data.nodes {
        if !root.visible || root.metadata.user_locked {
            continue;
        }
        root.position.y = y;
        y += pack_size(root).y + STACK_SPACING;
    }
}

/// Grow every container to hold the bounding box of its visible children
/// plus padding, bottom-up.
pub fn fit_containers(data: &mut CanvasData) {
    fn walk(node: &mut CanvasNode) {
        for child in &mut node.children {
            walk(child);
        }
        if node.collapsed {
            return;
        }
        let mut bounds: Option<egui::Rect> = None;
        for child in &node.children {
            if !child.visible {
                continue;
            }
            let rect = child.rect();
            bounds = Some(match bounds {
                Some(acc) => acc.union(rect),
                None => rect,
            });
        }
        if let Some(bounds) = bounds {
            node.size.x = node.size.x.max(bounds.max.x + FIT_PADDING);
            node.size.y = node.size.y.max(bounds.max.y + FIT_PADDING);
        }
    }
    for root in &mut data.nodes {
        walk(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_model::NodeKind;

    fn child(guid: &str, size: Vec2) -> CanvasNode {
        let mut node = CanvasNode::new(guid, guid, NodeKind::Node);
        node.size = size;
        node
    }

    fn data() -> CanvasData {
        let mut data = CanvasData::default();
        let mut parent = CanvasNode::new("P", "parent", NodeKind::Container);
        parent.size = Vec2::new(500.0, 400.0);
        parent.children.push(child("a", Vec2::new(100.0, 80.0)));
        parent.children.push(child("b", Vec2::new(200.0, 100.0)));
        parent.children.push(child("c", Vec2::new(100.0, 60.0)));
        data.nodes.push(parent);
        data.refresh_world_positions();
        data
    }

    #[test]
    fn test_grid_packs_by_area_descending() {
        let mut d = data();
        reflow_after_collapse(&mut d, "a");
        // b (largest) leads the first row at the padding origin.
        let b = d.find_node("b").unwrap();
        assert_eq!(b.position, Pos2::new(GRID_PADDING, header_for(400.0)));
    }

    #[test]
    fn test_rows_wrap_at_right_edge() {
        let mut d = data();
        d.find_node_mut("P").unwrap().size = Vec2::new(450.0, 400.0);
        reflow_after_collapse(&mut d, "a");
        let header = header_for(400.0);
        // b then a fill the first row; c would end at x=480 > 430 and wraps.
        let a = d.find_node("a").unwrap();
        let c = d.find_node("c").unwrap();
        assert_eq!(a.position.y, header);
        assert!(c.position.y > header);
        for guid in ["a", "b", "c"] {
            let node = d.find_node(guid).unwrap();
            assert!(node.position.x + node.size.x <= 450.0 - GRID_PADDING + 0.001);
        }
    }

    #[test]
    fn test_user_locked_sibling_never_moves() {
        let mut d = data();
        {
            let b = d.find_node_mut("b").unwrap();
            b.metadata.user_locked = true;
            b.position = Pos2::new(321.0, 222.0);
        }
        reflow_after_collapse(&mut d, "a");
        assert_eq!(d.find_node("b").unwrap().position, Pos2::new(321.0, 222.0));
    }

    #[test]
    fn test_collapsed_with_children_packs_at_fixed_size() {
        let mut d = data();
        {
            let b = d.find_node_mut("b").unwrap();
            b.children.push(child("b1", Vec2::new(50.0, 50.0)));
            b.collapsed = true;
            b.size = Vec2::new(600.0, 500.0);
        }
        reflow_after_collapse(&mut d, "b");
        // Packing treats b as 180x60; a (8000 area) sorts ahead of it.
        let a = d.find_node("a").unwrap();
        assert_eq!(a.position, Pos2::new(GRID_PADDING, header_for(400.0)));
    }

    #[test]
    fn test_fit_containers_grows_parent() {
        let mut d = data();
        d.find_node_mut("a").unwrap().position = Pos2::new(450.0, 380.0);
        fit_containers(&mut d);
        let parent = d.find_node("P").unwrap();
        assert!(parent.size.x >= 450.0 + 100.0 + FIT_PADDING);
        assert!(parent.size.y >= 380.0 + 80.0 + FIT_PADDING);
    }

    #[test]
    fn test_roots_fall_back_to_vertical_stack() {
        let mut data = CanvasData::default();
        for (i, guid) in ["x", "y", "z"].iter().enumerate() {
            let mut root = CanvasNode::new(*guid, *guid, NodeKind::Container);
            root.position = Pos2::new(i as f32 * 10.0, 500.0);
            root.size = Vec2::new(100.0, 80.0);
            data.nodes.push(root);
        }
        data.refresh_world_positions();

        reflow_after_collapse(&mut data, "x");
        let ys: Vec<f32> = ["x", "y", "z"]
            .iter()
            .map(|g| data.find_node(g).unwrap().position.y)
            .collect();
        assert_eq!(ys[0], 0.0);
        assert_eq!(ys[1], 80.0 + STACK_SPACING);
        assert_eq!(ys[2], 2.0 * (80.0 + STACK_SPACING));
    }

    #[test]
    fn test_locked_expanded_node_reflows_only_its_children() {
        let mut d = data();
        {
            let parent = d.find_node_mut("P").unwrap();
            parent.metadata.user_locked = true;
            parent.position = Pos2::new(400.0, 400.0);
        }
        let sibling_before = d.find_node("b").unwrap().position;
        reflow_after_collapse(&mut d, "P");
        // P itself holds still; its children were repacked.
        assert_eq!(d.find_node("P").unwrap().position, Pos2::new(400.0, 400.0));
        let b = d.find_node("b").unwrap();
        assert_ne!(b.position, sibling_before);
        assert_eq!(b.position.x, GRID_PADDING);
    }

    #[test]
    fn test_responder_restores_collapsed_node_position() {
        let mut service = ViewStateService::new(data());
        let mut responder = DynamicReflowResponder::attach(&mut service);
        let settings = AutoLayoutSettings {
            reflow_behavior: ReflowBehavior::Dynamic,
            ..Default::default()
        };

        // Simulate an engine-side collapse of "b" at a known position.
        let mut snapshot = service.snapshot();
        {
            let b = snapshot.find_node_mut("b").unwrap();
            b.collapsed = true;
            b.position = Pos2::new(123.0, 45.0);
        }
        service.publish(
            &snapshot,
            MutationKind::Collapse,
            MutationSource::Engine,
            Some("b".into()),
            None,
            None,
        );

        assert_eq!(responder.process(&mut service, &settings), 1);
        assert_eq!(
            service.peek().find_node("b").unwrap().position,
            Pos2::new(123.0, 45.0)
        );
    }

    #[test]
    fn test_responder_ignores_layout_mutations_and_static_mode() {
        let mut service = ViewStateService::new(data());
        let mut responder = DynamicReflowResponder::attach(&mut service);
        let snapshot = service.snapshot();

        // Layout-sourced collapse: never re-triggered.
        service.publish(
            &snapshot,
            MutationKind::Collapse,
            MutationSource::Layout,
            Some("b".into()),
            None,
            None,
        );
        let dynamic = AutoLayoutSettings {
            reflow_behavior: ReflowBehavior::Dynamic,
            ..Default::default()
        };
        assert_eq!(responder.process(&mut service, &dynamic), 0);

        // Static behavior: collapse passes through untouched.
        service.publish(
            &snapshot,
            MutationKind::Collapse,
            MutationSource::Engine,
            Some("b".into()),
            None,
            None,
        );
        assert_eq!(responder.process(&mut service, &AutoLayoutSettings::default()), 0);
    }
}
