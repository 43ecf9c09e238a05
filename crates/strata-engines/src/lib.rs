//! Layout engines
//!
//! Every engine is a pure function from a layout graph to a laid-out graph:
//! no state is retained between calls, and deterministic engines produce
//! identical output for identical input.
//!
//! ```text
//! LayoutGraph ──► LayoutEngine::layout(graph, options) ──► LayoutOutcome
//!                                                            ├─ graph
//!                                                            ├─ camera?
//!                                                            └─ diagnostics
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use egui::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use strata_model::{LayoutGraph, ModelError, RawGraphInput};

pub mod config;
pub mod force;
pub mod grid;
pub mod orthogonal;
pub mod runtime;
pub mod tree;
mod util;

pub use config::{ContainmentMode, EdgeRouting, LayoutMode, ViewConfig, ViewConfigPatch};

// =============================================================================
// ENGINE CONTRACT
// =============================================================================

/// Static description of what an engine can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCapabilities {
    pub supports_incremental: bool,
    pub deterministic: bool,
    pub can_handle_realtime: bool,
}

/// Why a layout pass was requested; drives priority and camera handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutReason {
    Initial,
    EngineSwitch,
    #[default]
    DataUpdate,
    Reflow,
    UserCommand,
}

impl LayoutReason {
    /// Engines frame their own camera only on first presentation.
    pub fn frames_camera(&self) -> bool {
        matches!(self, Self::Initial | Self::EngineSwitch)
    }
}

/// Options accompanying every layout call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub reason: LayoutReason,
    /// Viewport size in screen pixels, when the caller has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Vec2>,
    /// Previous laid-out graph for incremental engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_graph: Option<LayoutGraph>,
    /// Engine-specific configuration (consumed by containment-runtime).
    #[serde(default)]
    pub engine_options: ViewConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LayoutOptions {
    pub fn with_reason(reason: LayoutReason) -> Self {
        Self {
            reason,
            ..Self::default()
        }
    }
}

/// Timing attached to a layout result by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    pub duration_ms: f64,
    pub queue_wait_ms: f64,
    pub queue_depth: usize,
    pub priority_weight: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<LayoutMetrics>,
}

/// Result of one layout pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOutcome {
    pub graph: LayoutGraph,
    /// Camera the engine wants on first presentation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<strata_model::Camera>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl LayoutOutcome {
    pub fn new(graph: LayoutGraph) -> Self {
        Self {
            graph,
            camera: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_camera(mut self, camera: strata_model::Camera) -> Self {
        self.camera = Some(camera);
        self
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("layout failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A pluggable layout algorithm. Engines are pure over their inputs and
/// must not retain state between calls.
pub trait LayoutEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> EngineCapabilities;

    fn layout(&self, graph: &LayoutGraph, options: &LayoutOptions)
        -> Result<LayoutOutcome, EngineError>;

    /// Engine-specific ingestion; the default delegates to the normalizer.
    fn process_raw_data(&self, input: &RawGraphInput) -> Result<LayoutGraph, EngineError> {
        Ok(strata_model::normalize(input)?)
    }
}

pub type EngineRef = Arc<dyn LayoutEngine>;

// =============================================================================
// ENGINE NAMES
// =============================================================================

pub const CONTAINMENT_GRID: &str = "containment-grid";
pub const ORTHOGONAL: &str = "orthogonal";
pub const TREE: &str = "tree";
pub const FORCE_DIRECTED: &str = "force-directed";
pub const CONTAINMENT_RUNTIME: &str = "containment-runtime";

/// Map legacy aliases onto canonical engine names. Unrecognized names fall
/// back to containment-grid with a warning; this never fails.
pub fn canonical_engine_name(name: &str) -> &'static str {
    match name {
        "grid" | "hierarchical" | "codebase-hierarchical" | "containment"
        | "containment-grid" => CONTAINMENT_GRID,
        "orthogonal" | "containment-orthogonal" => ORTHOGONAL,
        "tree" | "tree-table" | "code-model-tree" => TREE,
        "force" | "force-directed" | "flat-graph" => FORCE_DIRECTED,
        "containment-runtime" | "containment-live" => CONTAINMENT_RUNTIME,
        other => {
            tracing::warn!(engine = other, "unknown engine name; using containment-grid");
            CONTAINMENT_GRID
        }
    }
}

/// One instance of every built-in engine, ready for registration.
pub fn builtin_engines() -> Vec<EngineRef> {
    vec![
        Arc::new(grid::ContainmentGridEngine),
        Arc::new(orthogonal::OrthogonalEngine),
        Arc::new(tree::TreeEngine),
        Arc::new(force::ForceDirectedEngine),
        Arc::new(runtime::ContainmentRuntimeEngine),
    ]
}
