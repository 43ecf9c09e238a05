//! Canvas layout runtime
//!
//! Interactive graph-visualization runtime for hierarchical node/edge
//! graphs: pan, zoom, select, drag, resize, collapse/expand, and
//! re-layout in real time.
//!
//! # Architecture
//!
//! ```text
//! RawGraphInput
//!       │
//!       ▼
//! CanvasRuntime (facade: config, lens, history, persistence)
//!       │
//!       ├──► LayoutOrchestrator ──► WorkerBridge ──► engines
//!       ├──► ViewStateService ◄──── DynamicReflowResponder
//!       └──► CanvasView
//!                 ├──► InteractionHandler (hit test, drag, resize)
//!                 ├──► edge inheritance (collapse-aware rewiring)
//!                 └──► renderer contract (draw ops out)
//! ```

use thiserror::Error;

pub mod cache;
pub mod edges;
pub mod inherit;
pub mod interaction;
pub mod lens;
pub mod lod;
pub mod logging;
pub mod reflow;
pub mod render;
pub mod runtime;
pub mod spatial;
pub mod transition;
pub mod view;
pub mod workspace;

pub use cache::{CachedPresentation, RenderCache};
pub use edges::{arrow_head, curve_control, trim_to_rects};
pub use inherit::{effective_visibility, recompute_edges, INHERITED_DASH, INHERITED_WIDTH_CAP};
pub use interaction::{
    InteractionHandler, InteractionResponse, PointerEvent, ResizeHandle, MIN_NODE_SIZE,
};
pub use lens::{apply_lens, GraphLens, UnknownLens};
pub use lod::{DetailLevel, LodConfig};
pub use logging::init_tracing;
pub use reflow::{fit_containers, reflow_after_collapse, DynamicReflowResponder};
pub use render::{
    render_canvas, render_canvas_cached, render_canvas_with, CanvasRenderer, EdgeDrawOp,
    NodeDrawOp, PresentationFrame, RecordingRenderer,
};
pub use runtime::{CanvasRuntime, RunLayoutRequest};
pub use spatial::{SpatialIndex, SpatialNode};
pub use transition::{
    ease_in_out_cubic, ease_out_cubic, LayoutSnapshot, LayoutTransition, NodeSnapshot,
    DEFAULT_TRANSITION_SECONDS,
};
pub use view::{CanvasView, RenderDirty, COLLAPSED_SIZE};
pub use workspace::CanvasWorkspace;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Raw payload failed validation; the runtime refuses to load it.
    #[error("invalid raw data: {0}")]
    InvalidRawData(String),

    #[error(transparent)]
    Model(#[from] strata_model::ModelError),

    #[error(transparent)]
    Orchestrator(#[from] strata_orchestrator::OrchestratorError),

    #[error(transparent)]
    State(#[from] strata_state::StateError),

    /// A scheduled layout did not resolve within its pump.
    #[error("layout did not resolve")]
    LayoutPending,
}
