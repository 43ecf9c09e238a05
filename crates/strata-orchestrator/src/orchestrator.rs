//! Layout orchestrator
//!
//! Registry of engines plus per-surface scheduling state: the active
//! engine, a priority queue of pending commands, a single-flight
//! dispatcher, and an event bus.
//!
//! Scheduling is cooperative: `schedule_layout` enqueues and returns a
//! ticket; the surface owner drains the queue with `pump`, which runs one
//! command at a time in a loop so deep queues never grow the stack.

use std::collections::HashMap;
use std::time::Instant;

use crossbeam_channel::Receiver;

use strata_engines::{
    canonical_engine_name, EngineRef, LayoutMetrics, LayoutOptions, LayoutOutcome,
};
use strata_model::LayoutGraph;

use crate::bus::{CanvasEvent, CanvasEventKind, EventBus};
use crate::queue::{CommandQueue, LayoutCommand, LayoutPriority, LayoutTicket};
use crate::OrchestratorError;

// =============================================================================
// SURFACE STATE
// =============================================================================

struct SurfaceState {
    active_engine: &'static str,
    queue: CommandQueue,
    bus: EventBus,
    in_flight: bool,
    /// Highest number of concurrently running layouts ever observed; stays
    /// at 1 when the single-flight discipline holds.
    in_flight_peak: usize,
}

impl SurfaceState {
    fn new() -> Self {
        Self {
            active_engine: strata_engines::CONTAINMENT_GRID,
            queue: CommandQueue::default(),
            bus: EventBus::new(),
            in_flight: false,
            in_flight_peak: 0,
        }
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

pub struct LayoutOrchestrator {
    engines: HashMap<&'static str, EngineRef>,
    surfaces: HashMap<String, SurfaceState>,
}

impl Default for LayoutOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutOrchestrator {
    /// Empty orchestrator; engines must be registered before use.
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
            surfaces: HashMap::new(),
        }
    }

    /// Orchestrator preloaded with every built-in engine.
    pub fn with_builtin_engines() -> Self {
        let mut orchestrator = Self::new();
        for engine in strata_engines::builtin_engines() {
            orchestrator.register_engine(engine);
        }
        orchestrator
    }

    // =========================================================================
    // ENGINE REGISTRY
    // =========================================================================

    pub fn register_engine(&mut self, engine: EngineRef) {
        self.engines.insert(engine.name(), engine);
    }

    pub fn unregister_engine(&mut self, name: &str) -> bool {
        self.engines.remove(canonical_engine_name(name)).is_some()
    }

    pub fn engine(&self, name: &str) -> Option<EngineRef> {
        self.engines.get(canonical_engine_name(name)).cloned()
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.engines.keys().copied().collect();
        names.sort_unstable();
        names
    }

    // =========================================================================
    // SURFACES
    // =========================================================================

    fn surface_mut(&mut self, surface: &str) -> &mut SurfaceState {
        self.surfaces
            .entry(surface.to_string())
            .or_insert_with(SurfaceState::new)
    }

    /// Subscribe to the surface's lifecycle events.
    pub fn subscribe(&mut self, surface: &str) -> Receiver<CanvasEvent> {
        self.surface_mut(surface).bus.subscribe()
    }

    pub fn active_engine(&self, surface: &str) -> Option<&'static str> {
        self.surfaces.get(surface).map(|s| s.active_engine)
    }

    /// Switch the active engine, announcing the previous one.
    pub fn set_active_engine(&mut self, surface: &str, name: &str, source: &str) {
        let canonical = canonical_engine_name(name);
        let state = self.surface_mut(surface);
        let previous = if state.active_engine == canonical {
            None
        } else {
            Some(state.active_engine.to_string())
        };
        state.active_engine = canonical;
        let event = CanvasEvent::now(
            surface,
            source,
            CanvasEventKind::EngineSwitched {
                previous,
                engine: canonical.to_string(),
            },
        );
        state.bus.publish(event);
    }

    /// Drop a surface and everything queued on it. Pending tickets observe
    /// cancellation through their closed channels.
    pub fn unregister_canvas(&mut self, surface: &str) {
        self.surfaces.remove(surface);
    }

    /// Observed concurrent-layout peak; 1 means single-flight held.
    pub fn in_flight_peak(&self, surface: &str) -> usize {
        self.surfaces
            .get(surface)
            .map(|s| s.in_flight_peak)
            .unwrap_or(0)
    }

    pub fn queue_depth(&self, surface: &str) -> usize {
        self.surfaces.get(surface).map(|s| s.queue.len()).unwrap_or(0)
    }

    // =========================================================================
    // SCHEDULING
    // =========================================================================

    /// Enqueue a layout command. The returned ticket resolves when the
    /// owner pumps the surface.
    pub fn schedule_layout(
        &mut self,
        surface: &str,
        graph: LayoutGraph,
        options: LayoutOptions,
        priority: Option<LayoutPriority>,
    ) -> LayoutTicket {
        let (responder, ticket) = LayoutTicket::channel();
        let state = self.surface_mut(surface);
        state.queue.push(LayoutCommand {
            graph,
            options,
            priority: priority.unwrap_or_default(),
            enqueued_at: Instant::now(),
            seq: 0,
            responder,
        });
        tracing::debug!(surface, depth = state.queue.len(), "layout command queued");
        ticket
    }

    /// Pop the next runnable command, respecting single flight. Used by the
    /// local pump and by the worker bridge.
    pub(crate) fn take_next_command(&mut self, surface: &str) -> Option<LayoutCommand> {
        let state = self.surfaces.get_mut(surface)?;
        if state.in_flight {
            // A re-entrant pump during an active dispatch would break
            // single flight.
            return None;
        }
        state.queue.pop()
    }

    /// Publish an event on the surface bus.
    pub fn publish_event(&mut self, surface: &str, source: &str, kind: CanvasEventKind) {
        let event = CanvasEvent::now(surface, source, kind);
        self.surface_mut(surface).bus.publish(event);
    }

    /// Drain the surface queue in-process, one command in flight at a time.
    /// A failing command rejects its ticket and dispatch continues with the
    /// next. Returns the number of commands dispatched.
    pub fn pump(&mut self, surface: &str) -> usize {
        let mut dispatched = 0;
        while let Some(command) = self.take_next_command(surface) {
            let queue_wait_ms = command.enqueued_at.elapsed().as_secs_f64() * 1000.0;
            let result = self.dispatch(
                surface,
                command.graph,
                command.options,
                queue_wait_ms,
                command.priority.weight(),
            );
            // The caller may have dropped its ticket; that is not an error.
            let _ = command.responder.send(result);
            dispatched += 1;
        }
        dispatched
    }

    /// Run a layout synchronously, bypassing the queue.
    pub fn run_layout(
        &mut self,
        surface: &str,
        graph: LayoutGraph,
        options: LayoutOptions,
    ) -> Result<LayoutOutcome, OrchestratorError> {
        self.dispatch(surface, graph, options, 0.0, LayoutPriority::default().weight())
    }

    fn dispatch(
        &mut self,
        surface: &str,
        graph: LayoutGraph,
        options: LayoutOptions,
        queue_wait_ms: f64,
        priority_weight: u32,
    ) -> Result<LayoutOutcome, OrchestratorError> {
        self.begin_flight(surface);
        let engine_name = self.surface_mut(surface).active_engine;
        let engine = match self.engines.get(engine_name).cloned() {
            Some(engine) => engine,
            None => {
                self.finish(surface);
                return Err(OrchestratorError::UnknownEngine(engine_name.to_string()));
            }
        };

        {
            let state = self.surface_mut(surface);
            state.bus.publish(CanvasEvent::now(
                surface,
                "orchestrator",
                CanvasEventKind::LayoutRequested {
                    engine: engine_name.to_string(),
                    reason: options.reason,
                },
            ));
        }

        let queue_depth = self.queue_depth(surface);
        let started = Instant::now();
        let result = engine.layout(&graph, &options);
        let duration = started.elapsed();

        let result = result
            .map(|mut outcome| {
                outcome.diagnostics.metrics = Some(LayoutMetrics {
                    duration_ms: duration.as_secs_f64() * 1000.0,
                    queue_wait_ms,
                    queue_depth,
                    priority_weight,
                });
                outcome
            })
            .map_err(OrchestratorError::from);

        let state = self.surface_mut(surface);
        if let Ok(outcome) = &result {
            state.bus.publish(CanvasEvent::now(
                surface,
                "orchestrator",
                CanvasEventKind::LayoutApplied {
                    engine: engine_name.to_string(),
                    duration_ms: duration.as_secs_f64() * 1000.0,
                    layout_version: outcome.graph.layout_version,
                },
            ));
        } else {
            tracing::warn!(surface, engine = engine_name, "layout engine failed");
        }
        self.finish(surface);
        result
    }

    /// Mark a layout as active on the surface.
    pub(crate) fn begin_flight(&mut self, surface: &str) {
        let state = self.surface_mut(surface);
        state.in_flight = true;
        state.in_flight_peak = state.in_flight_peak.max(1);
    }

    pub(crate) fn finish(&mut self, surface: &str) {
        if let Some(state) = self.surfaces.get_mut(surface) {
            state.in_flight = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use strata_engines::{
        EngineCapabilities, EngineError, LayoutEngine, LayoutReason,
    };
    use strata_model::{LayoutNodeEntry, NodeKind};

    fn graph() -> LayoutGraph {
        let mut g = LayoutGraph::default();
        g.insert_node(LayoutNodeEntry::new("n", "n", NodeKind::Node));
        g.recompute_roots();
        g
    }

    /// Engine that records dispatch order through shared state.
    struct ProbeEngine {
        calls: Arc<AtomicUsize>,
        order: Arc<std::sync::Mutex<Vec<u64>>>,
        fail: bool,
    }

    impl ProbeEngine {
        fn new(fail: bool) -> (Self, Arc<AtomicUsize>, Arc<std::sync::Mutex<Vec<u64>>>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let order = Arc::new(std::sync::Mutex::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                    order: order.clone(),
                    fail,
                },
                calls,
                order,
            )
        }
    }

    impl LayoutEngine for ProbeEngine {
        fn name(&self) -> &'static str {
            "containment-grid"
        }

        fn capabilities(&self) -> EngineCapabilities {
            EngineCapabilities {
                supports_incremental: false,
                deterministic: true,
                can_handle_realtime: false,
            }
        }

        fn layout(
            &self,
            graph: &LayoutGraph,
            _options: &LayoutOptions,
        ) -> Result<LayoutOutcome, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(graph.layout_version);
            if self.fail {
                return Err(EngineError::Failed("probe failure".into()));
            }
            Ok(LayoutOutcome::new(graph.clone()))
        }
    }

    #[test]
    fn test_priority_dispatch_order() {
        let (probe, _, order) = ProbeEngine::new(false);
        let mut orchestrator = LayoutOrchestrator::new();
        orchestrator.register_engine(Arc::new(probe));

        for (version, priority) in [
            (1, LayoutPriority::Normal),
            (2, LayoutPriority::Low),
            (3, LayoutPriority::Critical),
            (4, LayoutPriority::High),
        ] {
            let mut g = graph();
            g.layout_version = version;
            orchestrator.schedule_layout("s", g, LayoutOptions::default(), Some(priority));
        }
        assert_eq!(orchestrator.pump("s"), 4);
        // Critical, high, normal, low.
        assert_eq!(*order.lock().unwrap(), vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_command_enqueued_mid_run_waits_for_current() {
        // A critical command scheduled after pumping begins still runs
        // after the command already dispatched, then jumps the rest.
        let (probe, _, order) = ProbeEngine::new(false);
        let mut orchestrator = LayoutOrchestrator::new();
        orchestrator.register_engine(Arc::new(probe));

        let mut a = graph();
        a.layout_version = 1;
        orchestrator.schedule_layout("s", a, LayoutOptions::default(), None);
        let mut b = graph();
        b.layout_version = 2;
        orchestrator.schedule_layout("s", b, LayoutOptions::default(), Some(LayoutPriority::Low));
        orchestrator.pump("s");

        let mut c = graph();
        c.layout_version = 3;
        orchestrator.schedule_layout(
            "s",
            c,
            LayoutOptions::default(),
            Some(LayoutPriority::Critical),
        );
        orchestrator.pump("s");
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_failed_command_rejects_and_dispatch_continues() {
        let (probe, calls, _) = ProbeEngine::new(true);
        let mut orchestrator = LayoutOrchestrator::new();
        orchestrator.register_engine(Arc::new(probe));

        let first = orchestrator.schedule_layout("s", graph(), LayoutOptions::default(), None);
        let second = orchestrator.schedule_layout("s", graph(), LayoutOptions::default(), None);
        assert_eq!(orchestrator.pump("s"), 2);
        assert!(first.try_result().unwrap().is_err());
        assert!(second.try_result().unwrap().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_single_flight_per_surface() {
        let mut orchestrator = LayoutOrchestrator::with_builtin_engines();
        for _ in 0..5 {
            orchestrator.schedule_layout("s", graph(), LayoutOptions::default(), None);
        }
        orchestrator.pump("s");
        assert_eq!(orchestrator.in_flight_peak("s"), 1);
    }

    #[test]
    fn test_engine_switch_emits_previous_name() {
        let mut orchestrator = LayoutOrchestrator::with_builtin_engines();
        let events = orchestrator.subscribe("s");
        orchestrator.set_active_engine("s", "force", "user");
        let event = events.try_recv().unwrap();
        match event.kind {
            CanvasEventKind::EngineSwitched { previous, engine } => {
                assert_eq!(previous.as_deref(), Some("containment-grid"));
                assert_eq!(engine, "force-directed");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_run_layout_emits_requested_and_applied() {
        let mut orchestrator = LayoutOrchestrator::with_builtin_engines();
        let events = orchestrator.subscribe("s");
        orchestrator
            .run_layout(
                "s",
                graph(),
                LayoutOptions::with_reason(LayoutReason::Initial),
            )
            .unwrap();
        let kinds: Vec<CanvasEvent> = events.try_iter().collect();
        assert!(matches!(kinds[0].kind, CanvasEventKind::LayoutRequested { .. }));
        assert!(matches!(kinds[1].kind, CanvasEventKind::LayoutApplied { .. }));
    }

    #[test]
    fn test_unregister_canvas_cancels_pending() {
        let mut orchestrator = LayoutOrchestrator::with_builtin_engines();
        let ticket = orchestrator.schedule_layout("s", graph(), LayoutOptions::default(), None);
        orchestrator.unregister_canvas("s");
        assert!(ticket.wait().is_err());
    }

    #[test]
    fn test_metrics_attached() {
        let mut orchestrator = LayoutOrchestrator::with_builtin_engines();
        let ticket = orchestrator.schedule_layout(
            "s",
            graph(),
            LayoutOptions::default(),
            Some(LayoutPriority::High),
        );
        orchestrator.pump("s");
        let outcome = ticket.try_result().unwrap().unwrap();
        let metrics = outcome.diagnostics.metrics.unwrap();
        assert_eq!(metrics.priority_weight, 75);
        assert!(metrics.duration_ms >= 0.0);
    }
}
