//! Runtime view configuration consumed by the containment-runtime engine.

use serde::{Deserialize, Serialize};

/// Whether containment is expressed by nesting or by visible edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainmentMode {
    /// Hide containment edges; children nest inside parents and parents
    /// resize to fit.
    #[default]
    Containers,
    /// Children stay independent; containment renders as visible lines.
    Flat,
}

/// Packing algorithm for node placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Grid,
    Force,
}

/// Shape of emitted edge waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRouting {
    /// 4-point up/out/over/in routing.
    #[default]
    Orthogonal,
    /// 2-point line between node centres.
    Straight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    #[serde(default)]
    pub containment_mode: ContainmentMode,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default)]
    pub edge_routing: EdgeRouting,
}

impl ViewConfig {
    /// Apply a partial update; `None` fields keep their current value.
    pub fn apply(&mut self, patch: ViewConfigPatch) -> bool {
        let mut containment_changed = false;
        if let Some(mode) = patch.containment_mode {
            containment_changed = mode != self.containment_mode;
            self.containment_mode = mode;
        }
        if let Some(mode) = patch.layout_mode {
            self.layout_mode = mode;
        }
        if let Some(routing) = patch.edge_routing {
            self.edge_routing = routing;
        }
        containment_changed
    }
}

/// Partial view-config update.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containment_mode: Option<ContainmentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_mode: Option<LayoutMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_routing: Option<EdgeRouting>,
}
