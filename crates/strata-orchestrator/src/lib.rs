//! Layout orchestration
//!
//! # Architecture
//!
//! ```text
//! schedule_layout ──► CommandQueue (priority, FIFO ties)
//!                          │ pump (single flight)
//!                          ▼
//!                 LayoutOrchestrator ──► EngineRegistry ──► LayoutEngine
//!                          │ ▲
//!            WorkerBridge ─┘ └─ EventBus (LayoutRequested/Applied/…)
//!                  │
//!                  ▼ serialized snapshots
//!          worker thread (own orchestrator, own registry)
//! ```
//!
//! One layout is in flight per surface at any moment; pending commands for
//! a surface are dropped only when the surface is unregistered.

use thiserror::Error;

pub mod bus;
pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use bus::{CanvasEvent, CanvasEventKind, EventBus};
pub use orchestrator::LayoutOrchestrator;
pub use queue::{CommandQueue, LayoutCommand, LayoutPriority, LayoutTicket};
pub use worker::{WorkerBridge, DEFAULT_WORKER_TIMEOUT};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The surface's active engine is not in the registry.
    #[error("unknown engine: {0}")]
    UnknownEngine(String),

    /// The engine itself failed; surfaces through the scheduled-layout
    /// ticket.
    #[error(transparent)]
    Engine(#[from] strata_engines::EngineError),

    /// The engine failed inside the worker.
    #[error("layout failed in worker: {0}")]
    Worker(String),

    /// The surface was unregistered before the command ran.
    #[error("layout command cancelled")]
    Cancelled,
}
