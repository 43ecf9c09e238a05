//! Level of detail
//!
//! Zoomed-out canvases drop expensive detail before the renderer ever
//! sees it: first badges and edge labels, then node labels and icons.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DetailLevel {
    /// Shapes only.
    Minimal,
    /// Shapes, labels, icons.
    Medium,
    /// Everything, including badges and edge labels.
    Full,
}

impl DetailLevel {
    pub fn shows_labels(&self) -> bool {
        *self >= DetailLevel::Medium
    }

    pub fn shows_icons(&self) -> bool {
        *self >= DetailLevel::Medium
    }

    pub fn shows_badges(&self) -> bool {
        *self == DetailLevel::Full
    }

    pub fn shows_edge_labels(&self) -> bool {
        *self == DetailLevel::Full
    }
}

/// Zoom thresholds separating the detail levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LodConfig {
    /// Below this zoom, badges and edge labels disappear.
    pub medium_zoom: f32,
    /// Below this zoom, only shapes remain.
    pub minimal_zoom: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            medium_zoom: 0.6,
            minimal_zoom: 0.3,
        }
    }
}

impl LodConfig {
    pub fn level(&self, zoom: f32) -> DetailLevel {
        if zoom < self.minimal_zoom {
            DetailLevel::Minimal
        } else if zoom < self.medium_zoom {
            DetailLevel::Medium
        } else {
            DetailLevel::Full
        }
    }
}
