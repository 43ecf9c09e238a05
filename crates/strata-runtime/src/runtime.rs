//! Canvas layout runtime
//!
//! The facade binding one surface to its view, view-state service, layout
//! orchestrator, worker bridge, reflow responder, active lens, and runtime
//! view config.
//!
//! ```text
//! raw input ─► normalize ─► layout graph ─► orchestrator (worker bridge)
//!                                               │
//!                       view state ◄── publish ─┘
//!                           │
//!        reflow responder ──┤ (collapse → corrective layout)
//!                           ▼
//!                      CanvasView ─► renderer contract
//! ```

use chrono::Utc;
use egui::Vec2;

use strata_engines::{
    canonical_engine_name, LayoutOptions, LayoutReason, ViewConfig, ViewConfigPatch,
};
use strata_model::{
    normalize, to_hierarchical, to_layout_graph, validate, CanvasData, RawGraphInput,
};
use strata_orchestrator::{
    CanvasEventKind, LayoutOrchestrator, LayoutPriority, WorkerBridge,
};
use strata_state::{
    save_layout, AutoLayoutSettings, CanvasHistory, MutationKind, MutationSource, SubscriberId,
    Subscription, ViewStateService,
};

use crate::interaction::{InteractionResponse, PointerEvent};
use crate::lens::GraphLens;
use crate::reflow::DynamicReflowResponder;
use crate::render::PresentationFrame;
use crate::transition::{LayoutSnapshot, LayoutTransition, DEFAULT_TRANSITION_SECONDS};
use crate::view::CanvasView;
use crate::RuntimeError;

// =============================================================================
// LAYOUT REQUESTS
// =============================================================================

/// Caller intent for one layout pass.
#[derive(Debug, Clone, Default)]
pub struct RunLayoutRequest {
    /// Engine to switch to first; aliases are normalized.
    pub engine: Option<String>,
    pub reason: LayoutReason,
    /// Marks interactive requests, which jump the queue.
    pub user_initiated: bool,
}

impl RunLayoutRequest {
    pub fn initial() -> Self {
        Self {
            reason: LayoutReason::Initial,
            ..Self::default()
        }
    }

    pub fn engine_switch(engine: impl Into<String>) -> Self {
        Self {
            engine: Some(engine.into()),
            reason: LayoutReason::EngineSwitch,
            user_initiated: true,
        }
    }
}

fn priority_for(request: &RunLayoutRequest) -> LayoutPriority {
    match request.reason {
        LayoutReason::Initial => LayoutPriority::Critical,
        LayoutReason::EngineSwitch | LayoutReason::UserCommand | LayoutReason::Reflow => {
            LayoutPriority::High
        }
        _ if request.user_initiated => LayoutPriority::High,
        _ => LayoutPriority::Normal,
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

pub struct CanvasRuntime {
    surface_id: String,
    view: CanvasView,
    service: ViewStateService,
    subscription: Subscription,
    orchestrator: LayoutOrchestrator,
    bridge: WorkerBridge,
    reflow: DynamicReflowResponder,
    settings: AutoLayoutSettings,
    view_config: ViewConfig,
    lens: GraphLens,
    raw_cache: Option<RawGraphInput>,
    frame: Option<PresentationFrame>,
    transition: Option<LayoutTransition>,
    history: CanvasHistory,
}

impl CanvasRuntime {
    /// Runtime with in-process layout execution.
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self::build(surface_id.into(), WorkerBridge::disabled())
    }

    /// Runtime that offloads layout calls to the worker thread.
    pub fn with_worker(surface_id: impl Into<String>) -> Self {
        Self::build(surface_id.into(), WorkerBridge::enabled())
    }

    fn build(surface_id: String, bridge: WorkerBridge) -> Self {
        let mut service = ViewStateService::default();
        let subscription = service.subscribe();
        let reflow = DynamicReflowResponder::attach(&mut service);
        Self {
            view: CanvasView::new(surface_id.clone()),
            surface_id,
            service,
            subscription,
            orchestrator: LayoutOrchestrator::with_builtin_engines(),
            bridge,
            reflow,
            settings: AutoLayoutSettings::default(),
            view_config: ViewConfig::default(),
            lens: GraphLens::FullGraph,
            raw_cache: None,
            frame: None,
            transition: None,
            history: CanvasHistory::default(),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn view(&self) -> &CanvasView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut CanvasView {
        &mut self.view
    }

    pub fn service(&self) -> &ViewStateService {
        &self.service
    }

    pub fn orchestrator_mut(&mut self) -> &mut LayoutOrchestrator {
        &mut self.orchestrator
    }

    pub fn settings(&self) -> AutoLayoutSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: AutoLayoutSettings) {
        self.settings = settings;
    }

    pub fn view_config(&self) -> ViewConfig {
        self.view_config
    }

    pub fn lens(&self) -> GraphLens {
        self.lens
    }

    pub fn presentation_frame(&self) -> Option<&PresentationFrame> {
        self.frame.as_ref()
    }

    fn origin(&self) -> SubscriberId {
        self.subscription.id()
    }

    // =========================================================================
    // DATA INGESTION
    // =========================================================================

    /// Swap the view graph wholesale.
    pub fn set_canvas_data(
        &mut self,
        data: CanvasData,
        run_layout: bool,
        source: MutationSource,
    ) -> Result<(), RuntimeError> {
        for issue in data.validate() {
            tracing::warn!(surface = %self.surface_id, issue = %issue, "canvas data issue");
        }
        let kind = if self.service.version() == 0 {
            MutationKind::Initialize
        } else {
            MutationKind::Replace
        };
        self.view.set_data(data);
        let snapshot = self.view.snapshot();
        self.service
            .publish(&snapshot, kind, source, None, None, Some(self.origin()));
        if run_layout {
            self.run_layout(RunLayoutRequest::initial())?;
        }
        Ok(())
    }

    /// Validate and normalize raw query-layer input, rebuilding the
    /// hierarchical snapshot in place while preserving the camera. Refuses
    /// to load invalid payloads; nothing is partially ingested.
    pub fn set_raw_data(
        &mut self,
        input: RawGraphInput,
        run_layout: bool,
    ) -> Result<(), RuntimeError> {
        let issues = validate(&input);
        if !issues.is_empty() {
            return Err(RuntimeError::InvalidRawData(issues.join("; ")));
        }
        let graph = normalize(&input)?;
        let mut data = to_hierarchical(&graph);
        data.camera = self.view.camera.clone();
        // The version counter belongs to the surface, not the dataset.
        data.metadata.layout_version = self.view.data().metadata.layout_version;
        self.raw_cache = Some(input);
        self.set_canvas_data(data, run_layout, MutationSource::External)
    }

    /// Patch the runtime view config. A containment-mode change rebuilds
    /// from the cached raw dataset, carrying per-GUID style overrides
    /// across the rebuild.
    pub fn set_view_config(&mut self, patch: ViewConfigPatch) -> Result<(), RuntimeError> {
        let containment_changed = self.view_config.apply(patch);
        if !containment_changed {
            return Ok(());
        }
        let Some(input) = self.raw_cache.clone() else {
            return Ok(());
        };

        // Style overrides survive the rebuild, keyed by GUID.
        let mut overrides: std::collections::HashMap<String, serde_json::Value> =
            std::collections::HashMap::new();
        self.view.data().for_each_node(|node, _, _| {
            if let Some(value) = &node.metadata.style_overrides {
                overrides.insert(node.guid.clone(), value.clone());
            }
        });

        let graph = normalize(&input)?;
        let mut data = to_hierarchical(&graph);
        data.camera = self.view.camera.clone();
        data.metadata.layout_version = self.view.data().metadata.layout_version;
        fn reapply(
            nodes: &mut [strata_model::CanvasNode],
            overrides: &std::collections::HashMap<String, serde_json::Value>,
        ) {
            for node in nodes {
                if let Some(value) = overrides.get(&node.guid) {
                    node.metadata.style_overrides = Some(value.clone());
                }
                reapply(&mut node.children, overrides);
            }
        }
        reapply(&mut data.nodes, &overrides);

        self.view.set_data(data);
        let snapshot = self.view.snapshot();
        self.service.publish(
            &snapshot,
            MutationKind::Replace,
            MutationSource::External,
            None,
            None,
            Some(self.origin()),
        );
        self.run_layout(RunLayoutRequest {
            engine: Some(strata_engines::CONTAINMENT_RUNTIME.to_string()),
            reason: LayoutReason::DataUpdate,
            user_initiated: true,
        })
    }

    // =========================================================================
    // LAYOUT
    // =========================================================================

    /// One full layout pass: bump the version, flatten, schedule with the
    /// reason-derived priority, dispatch through the worker bridge, rebuild
    /// the view, and publish the result.
    pub fn run_layout(&mut self, request: RunLayoutRequest) -> Result<(), RuntimeError> {
        let before = LayoutSnapshot::from_canvas(self.view.data());
        let version = self.view.data().metadata.layout_version + 1;
        self.view.data_mut().metadata.layout_version = version;

        let mut graph = to_layout_graph(&self.view.snapshot());
        graph.layout_version = version;

        if let Some(engine) = &request.engine {
            let source = if request.user_initiated { "user" } else { "runtime" };
            self.orchestrator
                .set_active_engine(&self.surface_id, canonical_engine_name(engine), source);
        }

        let options = LayoutOptions {
            reason: request.reason,
            viewport: Some(self.view.viewport()),
            previous_graph: self.frame.as_ref().map(|f| f.graph.clone()),
            engine_options: self.view_config,
            timestamp: Some(Utc::now()),
        };
        let priority = priority_for(&request);

        let ticket =
            self.orchestrator
                .schedule_layout(&self.surface_id, graph, options, Some(priority));
        self.bridge.pump(&mut self.orchestrator, &self.surface_id);
        let outcome = ticket
            .try_result()
            .ok_or(RuntimeError::LayoutPending)??;

        let mut data = to_hierarchical(&outcome.graph);
        data.canvas_id = self.view.data().canvas_id;
        data.metadata.layout_version = version;

        // Preserve the camera unless the engine framed one and this is the
        // first presentation (or the current camera is unusable).
        let prior = self.view.camera.clone();
        data.camera = match &outcome.camera {
            Some(framed)
                if request.reason == LayoutReason::Initial || !prior.is_finite() =>
            {
                framed.clone()
            }
            _ => prior,
        };

        self.view.set_data(data);
        self.frame = Some(PresentationFrame {
            layout_version: version,
            display_mode: outcome.graph.display_mode.clone(),
            graph: outcome.graph,
            camera: outcome.camera,
        });

        // Animate into the new layout; the first presentation snaps.
        self.transition = if request.reason == LayoutReason::Initial || before.is_empty() {
            None
        } else {
            Some(LayoutTransition::new(
                before,
                LayoutSnapshot::from_canvas(self.view.data()),
                DEFAULT_TRANSITION_SECONDS,
            ))
        };

        let snapshot = self.view.snapshot();
        self.service.publish(
            &snapshot,
            MutationKind::Layout,
            MutationSource::Layout,
            None,
            None,
            Some(self.origin()),
        );
        Ok(())
    }

    // =========================================================================
    // INTERACTION & EVENTS
    // =========================================================================

    /// Route a pointer event through the view and publish the resulting
    /// mutations and canvas events.
    pub fn pointer(&mut self, event: PointerEvent) -> InteractionResponse {
        // User mutations are undoable; capture state before they land.
        let undoable = matches!(
            event,
            PointerEvent::DragStart { .. }
                | PointerEvent::ResizeStart { .. }
                | PointerEvent::DoubleClick { .. }
        );
        if undoable {
            self.history.push(self.view.snapshot());
        }

        let response = self
            .view
            .pointer(event, self.settings.collapse_behavior);

        // A miss mutated nothing; drop the provisional history entry.
        if undoable
            && matches!(
                response,
                InteractionResponse::None
                    | InteractionResponse::SelectionChanged { .. }
                    | InteractionResponse::ResizeHandleHit { .. }
            )
        {
            self.history.pop();
        }

        match &response {
            InteractionResponse::NodeMoved { guid } | InteractionResponse::DragFinished { guid } => {
                let guid = guid.clone();
                let position = self
                    .view
                    .data()
                    .find_node(&guid)
                    .map(|n| n.position)
                    .unwrap_or_default();
                let snapshot = self.view.snapshot();
                self.service.publish(
                    &snapshot,
                    MutationKind::Position,
                    MutationSource::Engine,
                    Some(guid.clone()),
                    Some(serde_json::json!({ "x": position.x, "y": position.y })),
                    Some(self.origin()),
                );
                self.orchestrator.publish_event(
                    &self.surface_id,
                    "engine",
                    CanvasEventKind::NodeMoved {
                        node_guid: guid,
                        x: position.x,
                        y: position.y,
                    },
                );
            }
            InteractionResponse::NodeResized { guid }
            | InteractionResponse::ResizeFinished { guid } => {
                let guid = guid.clone();
                let size = self
                    .view
                    .data()
                    .find_node(&guid)
                    .map(|n| n.size)
                    .unwrap_or(Vec2::ZERO);
                let snapshot = self.view.snapshot();
                self.service.publish(
                    &snapshot,
                    MutationKind::Resize,
                    MutationSource::Engine,
                    Some(guid.clone()),
                    Some(serde_json::json!({ "width": size.x, "height": size.y })),
                    Some(self.origin()),
                );
                self.orchestrator.publish_event(
                    &self.surface_id,
                    "engine",
                    CanvasEventKind::ResizeNode {
                        node_guid: guid,
                        width: size.x,
                        height: size.y,
                    },
                );
            }
            InteractionResponse::CollapseToggled { guid, collapsed } => {
                let snapshot = self.view.snapshot();
                self.service.publish(
                    &snapshot,
                    MutationKind::Collapse,
                    MutationSource::Engine,
                    Some(guid.clone()),
                    Some(serde_json::json!({ "collapsed": collapsed })),
                    Some(self.origin()),
                );
                let kind = if *collapsed {
                    CanvasEventKind::CollapseNode {
                        node_guid: guid.clone(),
                    }
                } else {
                    CanvasEventKind::ExpandNode {
                        node_guid: guid.clone(),
                    }
                };
                self.orchestrator.publish_event(&self.surface_id, "engine", kind);
            }
            _ => {}
        }
        response
    }

    /// Collapse the whole canvas to a uniform depth.
    pub fn collapse_to_level(&mut self, level: usize) {
        self.history.push(self.view.snapshot());
        self.view.collapse_to_level(level);
        let snapshot = self.view.snapshot();
        self.service.publish(
            &snapshot,
            MutationKind::Collapse,
            MutationSource::Engine,
            None,
            Some(serde_json::json!({ "level": level })),
            Some(self.origin()),
        );
        self.orchestrator.publish_event(
            &self.surface_id,
            "engine",
            CanvasEventKind::CollapseToLevel { level },
        );
    }

    /// Render the current view through the active lens, mid-transition
    /// geometry included.
    pub fn render(&mut self, renderer: &mut dyn crate::render::CanvasRenderer) {
        match &self.transition {
            Some(transition) => self.view.render_animated(self.lens, transition, renderer),
            None => self.view.render(self.lens, renderer),
        }
    }

    /// Advance the layout animation. Returns true while another frame is
    /// needed.
    pub fn advance_animation(&mut self, dt: f32) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        if transition.advance(dt) {
            true
        } else {
            self.transition = None;
            false
        }
    }

    pub fn set_lens(&mut self, lens: GraphLens) {
        if self.lens == lens {
            return;
        }
        self.lens = lens;
        self.orchestrator.publish_event(
            &self.surface_id,
            "engine",
            CanvasEventKind::GraphLensChanged {
                lens: lens.id().to_string(),
            },
        );
    }

    /// Adopt a camera moved by the host and fan out the change.
    pub fn camera_changed(&mut self) {
        let camera = self.view.camera.clone();
        let snapshot = self.view.snapshot();
        self.service.publish(
            &snapshot,
            MutationKind::Camera,
            MutationSource::Engine,
            None,
            None,
            Some(self.origin()),
        );
        self.orchestrator.publish_event(
            &self.surface_id,
            "engine",
            CanvasEventKind::CameraChanged {
                x: camera.x,
                y: camera.y,
                zoom: camera.zoom,
            },
        );
    }

    // =========================================================================
    // HISTORY & PERSISTENCE
    // =========================================================================

    /// Revert to the snapshot taken before the most recent user mutation.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        let version = self.service.publish(
            &snapshot,
            MutationKind::Replace,
            MutationSource::External,
            None,
            None,
            Some(self.origin()),
        );
        self.view.adopt_snapshot(snapshot, true);
        self.view.ensure_camera_visible();
        self.orchestrator.publish_event(
            &self.surface_id,
            "external",
            CanvasEventKind::HistoryReplay { version },
        );
        true
    }

    /// Serialize the current snapshot for storage. Saving is an explicit
    /// user action; there is no autosave.
    pub fn save_layout(&self) -> Result<String, RuntimeError> {
        Ok(save_layout(&self.view.snapshot())?)
    }

    /// Restore a persisted snapshot. Invalid payloads are treated as
    /// absence of a saved layout and leave the view untouched.
    pub fn load_layout(&mut self, payload: &str) -> bool {
        let Some(data) = strata_state::load_layout(payload) else {
            return false;
        };
        self.view.set_data(data);
        let snapshot = self.view.snapshot();
        self.service.publish(
            &snapshot,
            MutationKind::Replace,
            MutationSource::External,
            None,
            None,
            Some(self.origin()),
        );
        true
    }

    /// Reload raw data and reset the camera to the origin at 100% zoom.
    pub fn reset(&mut self) -> Result<(), RuntimeError> {
        let Some(input) = self.raw_cache.clone() else {
            return Ok(());
        };
        let graph = normalize(&input)?;
        let mut data = to_hierarchical(&graph);
        data.camera = strata_model::Camera::at(0.0, 0.0, 1.0);
        data.metadata.layout_version = self.view.data().metadata.layout_version;
        self.history.clear();
        self.set_canvas_data(data, false, MutationSource::External)
    }

    /// Tear the surface down. Pending layout commands are dropped and the
    /// caches and subscriptions this runtime owns go with it.
    pub fn destroy(mut self) {
        self.orchestrator.unregister_canvas(&self.surface_id);
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Cooperative pump: run reflow corrections and fold externally
    /// published snapshots back into the view.
    pub fn tick(&mut self) {
        self.reflow.process(&mut self.service, &self.settings);

        let mutations = self.subscription.drain();
        if mutations.is_empty() {
            return;
        }
        let adopt_camera = mutations.iter().any(|m| {
            matches!(
                m.kind,
                MutationKind::Camera | MutationKind::Replace | MutationKind::Initialize
            )
        });
        self.view
            .adopt_snapshot(self.service.snapshot(), adopt_camera);
        self.view.ensure_camera_visible();
    }
}
