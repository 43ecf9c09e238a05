//! Persistence payloads
//!
//! The layout of a view is persisted as one JSON string: the full canvas
//! snapshot including `nodes`, `edges`, `originalEdges`, and `camera`.
//! Auto-layout settings travel separately. Invalid persisted JSON is
//! treated as absence of a saved layout, never an error.

use serde::{Deserialize, Serialize};

use strata_model::CanvasData;

use crate::StateError;

// =============================================================================
// LAYOUT SNAPSHOT
// =============================================================================

/// Serialize a canvas snapshot for storage.
pub fn save_layout(data: &CanvasData) -> Result<String, StateError> {
    Ok(serde_json::to_string(data)?)
}

/// Parse a persisted snapshot. Malformed payloads yield `None` so the
/// caller falls back to default data.
pub fn load_layout(payload: &str) -> Option<CanvasData> {
    match serde_json::from_str::<CanvasData>(payload) {
        Ok(mut data) => {
            data.refresh_world_positions();
            Some(data)
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid persisted layout");
            None
        }
    }
}

// =============================================================================
// AUTO-LAYOUT SETTINGS
// =============================================================================

/// What happens to a container's size when it collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollapseBehavior {
    /// Keep the expanded footprint.
    #[default]
    FullSize,
    /// Clamp to the collapsed size.
    Shrink,
}

/// Whether siblings reflow automatically after collapse/expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflowBehavior {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLayoutSettings {
    #[serde(default)]
    pub collapse_behavior: CollapseBehavior,
    #[serde(default)]
    pub reflow_behavior: ReflowBehavior,
}

pub fn save_settings(settings: &AutoLayoutSettings) -> Result<String, StateError> {
    Ok(serde_json::to_string(settings)?)
}

pub fn load_settings(payload: &str) -> Option<AutoLayoutSettings> {
    match serde_json::from_str(payload) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid auto-layout settings");
            None
        }
    }
}
