//! Canvas node types
//!
//! Nodes form a containment tree: each node owns its children and positions
//! them relative to its own origin. Absolute coordinates are mirrored into
//! `metadata.world_position` after every geometry mutation.

use std::collections::BTreeMap;

use egui::{Color32, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

// =============================================================================
// NODE KIND
// =============================================================================

/// Semantic tag that drives default sizing and layout treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Container,
    #[default]
    Node,
    Component,
}

impl std::str::FromStr for NodeKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Ok(if lower == "root" {
            Self::Root
        } else if lower.contains("container") || lower.contains("folder") {
            Self::Container
        } else if lower.contains("component") {
            Self::Component
        } else {
            Self::Node
        })
    }
}

impl NodeKind {
    /// Default uncollapsed size for this kind.
    pub fn default_size(&self) -> Vec2 {
        match self {
            Self::Root | Self::Container => Vec2::new(200.0, 120.0),
            Self::Node => Vec2::new(160.0, 80.0),
            Self::Component => Vec2::new(120.0, 60.0),
        }
    }

    /// Containers (and roots) can hold children and draw a header band.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Root | Self::Container)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Container => "container",
            Self::Node => "node",
            Self::Component => "component",
        }
    }
}

// =============================================================================
// NODE STYLE
// =============================================================================

/// Visual style resolved for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    pub fill: Color32,
    pub stroke: Color32,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
    /// Icon token resolved by the renderer.
    #[serde(default)]
    pub icon: Option<String>,
    /// Badge tokens drawn along the header.
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default = "default_true")]
    pub show_label: bool,
}

fn default_stroke_width() -> f32 {
    2.0
}

pub(crate) fn default_true() -> bool {
    true
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill: Color32::from_rgb(55, 65, 81),
            stroke: Color32::from_rgb(107, 114, 128),
            stroke_width: 2.0,
            icon: None,
            badges: Vec::new(),
            show_label: true,
        }
    }
}

// =============================================================================
// NODE METADATA
// =============================================================================

/// Reserved metadata keys plus free-form extras.
///
/// Field names keep the upstream camelCase spelling so persisted payloads
/// stay interchangeable with the query layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Mirror of the node's absolute coordinates; maintained after any
    /// geometry mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_position: Option<Pos2>,

    /// Label of the engine that produced the current positions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,

    /// Uncollapsed size, restored on expand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_height: Option<f32>,

    /// Last user-drag position.
    #[serde(
        rename = "_lockedPosition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub locked_position: Option<Pos2>,

    /// Once set, dynamic reflow must not move this node.
    #[serde(rename = "_userLocked", default, skip_serializing_if = "is_false")]
    pub user_locked: bool,

    /// Cached style resolution from the last presentation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<serde_json::Value>,

    /// User style overrides, preserved across layout rebuilds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_overrides: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl NodeMetadata {
    /// Default size recorded for this node, if any.
    pub fn default_size(&self) -> Option<Vec2> {
        match (self.default_width, self.default_height) {
            (Some(w), Some(h)) => Some(Vec2::new(w, h)),
            _ => None,
        }
    }

    pub fn set_default_size(&mut self, size: Vec2) {
        self.default_width = Some(size.x);
        self.default_height = Some(size.y);
    }
}

// =============================================================================
// CANVAS NODE
// =============================================================================

/// A node in the hierarchical canvas tree.
///
/// `position` is relative to the parent node (world origin for roots);
/// child order is sibling order for layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    /// Stable globally unique identifier.
    pub guid: String,
    /// Secondary human id used for display fallbacks.
    #[serde(default)]
    pub display_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: NodeKind,

    pub position: Pos2,
    pub size: Vec2,

    #[serde(default)]
    pub collapsed: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub dragging: bool,

    #[serde(default)]
    pub style: NodeStyle,
    #[serde(default)]
    pub children: Vec<CanvasNode>,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl CanvasNode {
    pub fn new(guid: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        let guid = guid.into();
        Self {
            display_id: guid.clone(),
            guid,
            label: label.into(),
            kind,
            position: Pos2::ZERO,
            size: kind.default_size(),
            collapsed: false,
            visible: true,
            selected: false,
            dragging: false,
            style: NodeStyle::default(),
            children: Vec::new(),
            metadata: NodeMetadata::default(),
        }
    }

    /// Rectangle in parent-relative coordinates.
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }

    /// Rectangle in world coordinates, from the maintained mirror.
    pub fn world_rect(&self) -> Rect {
        Rect::from_min_size(self.world_position(), self.size)
    }

    /// Absolute position mirror; falls back to the relative position for
    /// roots that have not been refreshed yet.
    pub fn world_position(&self) -> Pos2 {
        self.metadata.world_position.unwrap_or(self.position)
    }

    /// Label shown to the user, falling back to the human id.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.display_id
        } else {
            &self.label
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first search in this subtree, self included.
    pub fn find(&self, guid: &str) -> Option<&CanvasNode> {
        if self.guid == guid {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(guid))
    }

    pub fn find_mut(&mut self, guid: &str) -> Option<&mut CanvasNode> {
        if self.guid == guid {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(guid))
    }

    /// Bounding box of the direct children in this node's coordinate space.
    pub fn child_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        for child in &self.children {
            let rect = child.rect();
            bounds = Some(match bounds {
                Some(acc) => acc.union(rect),
                None => rect,
            });
        }
        bounds
    }

    /// Mark every descendant hidden (used when this node collapses).
    pub fn hide_descendants(&mut self) {
        for child in &mut self.children {
            child.visible = false;
            child.hide_descendants();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes_by_kind() {
        assert_eq!(NodeKind::Container.default_size(), Vec2::new(200.0, 120.0));
        assert_eq!(NodeKind::Node.default_size(), Vec2::new(160.0, 80.0));
        assert_eq!(NodeKind::Component.default_size(), Vec2::new(120.0, 60.0));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Container".parse::<NodeKind>().unwrap(), NodeKind::Container);
        assert_eq!("COMPONENT".parse::<NodeKind>().unwrap(), NodeKind::Component);
        assert_eq!("class".parse::<NodeKind>().unwrap(), NodeKind::Node);
    }

    #[test]
    fn test_find_mut_in_subtree() {
        let mut root = CanvasNode::new("r", "root", NodeKind::Root);
        let mut a = CanvasNode::new("a", "a", NodeKind::Container);
        a.children.push(CanvasNode::new("a1", "a1", NodeKind::Node));
        root.children.push(a);

        root.find_mut("a1").unwrap().selected = true;
        assert!(root.find("a1").unwrap().selected);
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn test_metadata_serde_uses_reserved_keys() {
        let mut meta = NodeMetadata::default();
        meta.user_locked = true;
        meta.locked_position = Some(Pos2::new(3.0, 4.0));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["_userLocked"], serde_json::json!(true));
        assert!(json.get("_lockedPosition").is_some());
    }

    #[test]
    fn test_hide_descendants() {
        let mut root = CanvasNode::new("r", "root", NodeKind::Root);
        let mut a = CanvasNode::new("a", "a", NodeKind::Container);
        a.children.push(CanvasNode::new("a1", "a1", NodeKind::Node));
        root.children.push(a);

        root.hide_descendants();
        assert!(!root.children[0].visible);
        assert!(!root.children[0].children[0].visible);
    }
}
