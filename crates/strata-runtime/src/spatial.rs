//! Spatial index for interaction hit testing
//!
//! R-tree over the world-space rectangles of visible nodes. Containment
//! hit testing wants the topmost node under the cursor, which in a nested
//! canvas means the deepest match, with later siblings drawn on top.

use egui::{Pos2, Rect};
use rstar::{Envelope, Point, PointDistance, RTree, RTreeObject, AABB};

use strata_model::CanvasData;

/// One visible node's footprint.
#[derive(Debug, Clone)]
pub struct SpatialNode {
    pub guid: String,
    /// Containment depth; deeper nodes draw above their ancestors.
    pub depth: usize,
    /// Paint order among equals (document order).
    pub order: usize,
    bounds: AABB<[f32; 2]>,
}

impl SpatialNode {
    fn new(guid: String, depth: usize, order: usize, rect: Rect) -> Self {
        Self {
            guid,
            depth,
            order,
            bounds: AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]),
        }
    }
}

impl RTreeObject for SpatialNode {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

impl PointDistance for SpatialNode {
    fn distance_2(
        &self,
        point: &<Self::Envelope as Envelope>::Point,
    ) -> <<Self::Envelope as Envelope>::Point as Point>::Scalar {
        let nearest = self.bounds.min_point(point);
        let dx = nearest.nth(0) - point.nth(0);
        let dy = nearest.nth(1) - point.nth(1);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &<Self::Envelope as Envelope>::Point) -> bool {
        self.bounds.contains_point(point)
    }

    fn distance_2_if_less_or_equal(
        &self,
        point: &<Self::Envelope as Envelope>::Point,
        max_distance_2: <<Self::Envelope as Envelope>::Point as Point>::Scalar,
    ) -> Option<<<Self::Envelope as Envelope>::Point as Point>::Scalar> {
        let distance_2 = self.distance_2(point);
        if distance_2 <= max_distance_2 {
            Some(distance_2)
        } else {
            None
        }
    }
}

/// R-tree over visible node rectangles.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<SpatialNode>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the visible nodes of a canvas. Hidden subtrees do not
    /// participate in hit testing.
    pub fn from_canvas(data: &CanvasData) -> Self {
        let mut entries = Vec::new();
        let mut order = 0usize;
        data.for_each_node(|node, abs, depth| {
            order += 1;
            if !node.visible {
                return;
            }
            entries.push(SpatialNode::new(
                node.guid.clone(),
                depth,
                order,
                Rect::from_min_size(abs, node.size),
            ));
        });
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Topmost node under a world point: deepest containment wins, then
    /// document order.
    pub fn topmost_at(&self, world: Pos2) -> Option<&SpatialNode> {
        self.tree
            .locate_all_at_point(&[world.x, world.y])
            .max_by_key(|node| (node.depth, node.order))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
