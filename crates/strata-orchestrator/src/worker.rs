//! Worker bridge
//!
//! Optional off-main-thread layout execution. A long-lived worker thread
//! hosts its own orchestrator with an identical engine registry; requests
//! and responses cross the channel as serialized snapshots, so neither side
//! ever shares mutable graph state.
//!
//! A dead, hung, or unspawnable worker degrades transparently to
//! in-process execution.

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use strata_engines::{EngineRef, LayoutOptions, LayoutOutcome};
use strata_model::LayoutGraph;

use crate::bus::CanvasEventKind;
use crate::orchestrator::LayoutOrchestrator;
use crate::OrchestratorError;

/// Bound on a single worker round-trip before falling back in-process.
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// WIRE MESSAGES
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct WorkerRequest {
    id: u64,
    surface: String,
    /// Active engine on the requesting side, mirrored into the worker.
    engine: Option<String>,
    graph: LayoutGraph,
    options: LayoutOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkerResponse {
    id: u64,
    result: Result<LayoutOutcome, String>,
}

// =============================================================================
// WORKER HANDLE
// =============================================================================

struct WorkerHandle {
    requests: Sender<String>,
    responses: Receiver<String>,
    next_id: u64,
}

impl WorkerHandle {
    fn spawn(engine_factory: fn() -> Vec<EngineRef>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = unbounded::<String>();
        let (response_tx, response_rx) = unbounded::<String>();
        std::thread::Builder::new()
            .name("strata-layout-worker".to_string())
            .spawn(move || worker_loop(request_rx, response_tx, engine_factory))?;
        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            next_id: 1,
        })
    }

    /// One round-trip with a deadline. Transport failures are `Err`;
    /// worker-side engine failures are `Ok(Err(..))`.
    fn request(
        &mut self,
        surface: &str,
        engine: Option<&str>,
        graph: &LayoutGraph,
        options: &LayoutOptions,
        timeout: Duration,
    ) -> Result<Result<LayoutOutcome, String>, String> {
        let id = self.next_id;
        self.next_id += 1;

        let request = WorkerRequest {
            id,
            surface: surface.to_string(),
            engine: engine.map(str::to_string),
            // Serialization below is the deep copy the worker receives.
            graph: graph.clone(),
            options: options.clone(),
        };
        let payload =
            serde_json::to_string(&request).map_err(|e| format!("request encode: {e}"))?;
        self.requests
            .send(payload)
            .map_err(|_| "worker channel closed".to_string())?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(payload) => {
                    let response: WorkerResponse = serde_json::from_str(&payload)
                        .map_err(|e| format!("response decode: {e}"))?;
                    if response.id == id {
                        return Ok(response.result);
                    }
                    // Stale response from an earlier timed-out request.
                    tracing::debug!(stale = response.id, "discarding stale worker response");
                }
                Err(RecvTimeoutError::Timeout) => return Err("worker timed out".to_string()),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err("worker disconnected".to_string())
                }
            }
        }
    }
}

/// Worker-side loop: an orchestrator of its own, fed serialized requests.
fn worker_loop(
    requests: Receiver<String>,
    responses: Sender<String>,
    engine_factory: fn() -> Vec<EngineRef>,
) {
    let mut orchestrator = LayoutOrchestrator::new();
    for engine in engine_factory() {
        orchestrator.register_engine(engine);
    }

    while let Ok(payload) = requests.recv() {
        let response = match serde_json::from_str::<WorkerRequest>(&payload) {
            Ok(request) => {
                if let Some(engine) = &request.engine {
                    orchestrator.set_active_engine(&request.surface, engine, "worker");
                }
                let result = orchestrator
                    .run_layout(&request.surface, request.graph, request.options)
                    .map_err(|e| e.to_string());
                WorkerResponse {
                    id: request.id,
                    result,
                }
            }
            Err(e) => WorkerResponse {
                id: 0,
                result: Err(format!("malformed request: {e}")),
            },
        };
        let Ok(payload) = serde_json::to_string(&response) else {
            continue;
        };
        if responses.send(payload).is_err() {
            break;
        }
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

/// Wraps the orchestrator with an optional off-thread executor.
pub struct WorkerBridge {
    worker: Option<WorkerHandle>,
    timeout: Duration,
}

impl WorkerBridge {
    /// In-process execution only.
    pub fn disabled() -> Self {
        Self {
            worker: None,
            timeout: DEFAULT_WORKER_TIMEOUT,
        }
    }

    /// Spawn a worker hosting the built-in engines; falls back to
    /// in-process if the thread cannot start.
    pub fn enabled() -> Self {
        Self::with_engines(strata_engines::builtin_engines)
    }

    /// Spawn a worker with a caller-supplied engine registry. The factory
    /// runs inside the worker so engines never cross the thread boundary.
    pub fn with_engines(engine_factory: fn() -> Vec<EngineRef>) -> Self {
        let worker = match WorkerHandle::spawn(engine_factory) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "layout worker unavailable; running in-process");
                None
            }
        };
        Self {
            worker,
            timeout: DEFAULT_WORKER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether layout calls currently leave the main thread.
    pub fn is_offloaded(&self) -> bool {
        self.worker.is_some()
    }

    /// Execute one layout call: off-thread when possible, in-process
    /// otherwise. The local orchestrator carries the event bus and
    /// instrumentation either way.
    pub fn run_layout(
        &mut self,
        local: &mut LayoutOrchestrator,
        surface: &str,
        graph: LayoutGraph,
        options: LayoutOptions,
    ) -> Result<LayoutOutcome, OrchestratorError> {
        if self.worker.is_some() {
            return self.run_remote(local, surface, graph, options);
        }
        local.run_layout(surface, graph, options)
    }

    /// Drain the surface's scheduled commands through this bridge.
    pub fn pump(&mut self, local: &mut LayoutOrchestrator, surface: &str) -> usize {
        let mut dispatched = 0;
        while let Some(command) = local.take_next_command(surface) {
            let result = self.run_layout(local, surface, command.graph, command.options);
            // Queue metrics for the worker path: rewrite what the executor
            // attached with this command's wait and weight.
            let result = result.map(|mut outcome| {
                if let Some(metrics) = outcome.diagnostics.metrics.as_mut() {
                    metrics.queue_wait_ms = command.enqueued_at.elapsed().as_secs_f64() * 1000.0;
                    metrics.priority_weight = command.priority.weight();
                }
                outcome
            });
            let _ = command.responder.send(result);
            dispatched += 1;
        }
        dispatched
    }

    fn run_remote(
        &mut self,
        local: &mut LayoutOrchestrator,
        surface: &str,
        graph: LayoutGraph,
        options: LayoutOptions,
    ) -> Result<LayoutOutcome, OrchestratorError> {
        let engine = local.active_engine(surface);
        local.begin_flight(surface);
        local.publish_event(
            surface,
            "worker-bridge",
            CanvasEventKind::LayoutRequested {
                engine: engine.unwrap_or("containment-grid").to_string(),
                reason: options.reason,
            },
        );

        let started = Instant::now();
        let Some(worker) = self.worker.as_mut() else {
            local.finish(surface);
            return local.run_layout(surface, graph, options);
        };
        match worker.request(surface, engine, &graph, &options, self.timeout) {
            Ok(Ok(mut outcome)) => {
                if let Some(metrics) = outcome.diagnostics.metrics.as_mut() {
                    // Round-trip time seen from the main thread.
                    metrics.duration_ms = started.elapsed().as_secs_f64() * 1000.0;
                }
                local.publish_event(
                    surface,
                    "worker-bridge",
                    CanvasEventKind::LayoutApplied {
                        engine: engine.unwrap_or("containment-grid").to_string(),
                        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                        layout_version: outcome.graph.layout_version,
                    },
                );
                local.finish(surface);
                Ok(outcome)
            }
            Ok(Err(engine_error)) => {
                local.finish(surface);
                Err(OrchestratorError::Worker(engine_error))
            }
            Err(transport) => {
                tracing::warn!(
                    surface,
                    error = %transport,
                    "worker bridge failed; falling back to in-process layout"
                );
                self.worker = None;
                local.finish(surface);
                local.run_layout(surface, graph, options)
            }
        }
    }
}
