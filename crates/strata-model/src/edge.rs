//! Canvas edge types
//!
//! Edges reference nodes by GUID and carry optional routed waypoints in
//! world coordinates. Waypoints are invalidated whenever either endpoint's
//! geometry changes.

use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Id prefix of edges produced by ancestor inheritance rewiring.
pub const INHERITED_EDGE_PREFIX: &str = "inherited-";

// =============================================================================
// EDGE STYLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub color: Color32,
    pub width: f32,
    /// Dash pattern `[on, off]` in screen pixels; `None` draws solid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<[f32; 2]>,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(107, 114, 128),
            width: 1.5,
            dash: None,
        }
    }
}

// =============================================================================
// CANVAS EDGE
// =============================================================================

/// A drawable relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub guid: String,
    #[serde(rename = "fromGUID")]
    pub from_guid: String,
    #[serde(rename = "toGUID")]
    pub to_guid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: EdgeStyle,

    /// Ordered routed points in world coordinates.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub waypoints: SmallVec<[Pos2; 4]>,

    /// Relationship type from the query layer, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
}

impl CanvasEdge {
    pub fn new(
        guid: impl Into<String>,
        from_guid: impl Into<String>,
        to_guid: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            from_guid: from_guid.into(),
            to_guid: to_guid.into(),
            label: None,
            style: EdgeStyle::default(),
            waypoints: SmallVec::new(),
            relation_type: None,
        }
    }

    /// Synthesized id for relationships that arrive without one.
    pub fn synthesized_id(from_guid: &str, to_guid: &str) -> String {
        format!("edge-{from_guid}-{to_guid}")
    }

    /// Whether this edge was produced by inheritance rewiring.
    pub fn is_inherited(&self) -> bool {
        self.guid.starts_with(INHERITED_EDGE_PREFIX)
    }

    /// Id of the original edge this one was rewired from (self for
    /// non-inherited edges).
    pub fn source_id(&self) -> &str {
        self.guid
            .strip_prefix(INHERITED_EDGE_PREFIX)
            .unwrap_or(&self.guid)
    }

    /// Drop routed waypoints; called when either endpoint moves or resizes.
    pub fn invalidate_waypoints(&mut self) {
        self.waypoints.clear();
    }

    /// Whether the edge touches the given node.
    pub fn touches(&self, guid: &str) -> bool {
        self.from_guid == guid || self.to_guid == guid
    }
}
