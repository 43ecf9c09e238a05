//! Layout command queue
//!
//! Commands are ordered by priority, then FIFO among equals. The queue is
//! resorted on insert; dispatch pops from the front.

use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use strata_engines::{LayoutOptions, LayoutOutcome};
use strata_model::LayoutGraph;

use crate::OrchestratorError;

// =============================================================================
// PRIORITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl LayoutPriority {
    /// Weight recorded in layout metrics.
    pub fn weight(&self) -> u32 {
        match self {
            Self::Critical => 100,
            Self::High => 75,
            Self::Normal => 50,
            Self::Low => 25,
        }
    }
}

// =============================================================================
// COMMANDS & TICKETS
// =============================================================================

/// One pending layout request.
#[derive(Debug)]
pub struct LayoutCommand {
    pub graph: LayoutGraph,
    pub options: LayoutOptions,
    pub priority: LayoutPriority,
    pub enqueued_at: Instant,
    /// Insert order; the FIFO tie-break within a priority class.
    pub seq: u64,
    pub responder: Sender<Result<LayoutOutcome, OrchestratorError>>,
}

/// Caller-side handle resolved when the command is dispatched.
///
/// The scheduling model is cooperative: the owner of the surface pumps the
/// orchestrator, and the ticket resolves during that pump.
#[derive(Debug)]
pub struct LayoutTicket {
    rx: Receiver<Result<LayoutOutcome, OrchestratorError>>,
}

impl LayoutTicket {
    pub fn channel() -> (Sender<Result<LayoutOutcome, OrchestratorError>>, LayoutTicket) {
        let (tx, rx) = bounded(1);
        (tx, LayoutTicket { rx })
    }

    /// Non-blocking poll; `None` while the command is still queued or the
    /// surface was dropped without running it.
    pub fn try_result(&self) -> Option<Result<LayoutOutcome, OrchestratorError>> {
        self.rx.try_recv().ok()
    }

    /// Block until the command resolves. Errors if the surface was
    /// unregistered before dispatch.
    pub fn wait(&self) -> Result<LayoutOutcome, OrchestratorError> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Cancelled),
        }
    }
}

// =============================================================================
// QUEUE
// =============================================================================

/// Priority queue with FIFO tie-break.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<LayoutCommand>,
    next_seq: u64,
}

impl CommandQueue {
    pub fn push(&mut self, mut command: LayoutCommand) {
        command.seq = self.next_seq;
        self.next_seq += 1;
        self.commands.push(command);
        // Resort on insert: priority first, then enqueue order.
        self.commands
            .sort_by(|a, b| a.priority.cmp(&b.priority).then(a.seq.cmp(&b.seq)));
    }

    pub fn pop(&mut self) -> Option<LayoutCommand> {
        if self.commands.is_empty() {
            None
        } else {
            Some(self.commands.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(priority: LayoutPriority) -> (LayoutCommand, LayoutTicket) {
        let (tx, ticket) = LayoutTicket::channel();
        (
            LayoutCommand {
                graph: LayoutGraph::default(),
                options: LayoutOptions::default(),
                priority,
                enqueued_at: Instant::now(),
                seq: 0,
                responder: tx,
            },
            ticket,
        )
    }

    #[test]
    fn test_priority_then_fifo_order() {
        let mut queue = CommandQueue::default();
        let labels = [
            LayoutPriority::Normal,
            LayoutPriority::Low,
            LayoutPriority::Critical,
            LayoutPriority::High,
        ];
        let mut tickets = Vec::new();
        for priority in labels {
            let (cmd, ticket) = command(priority);
            queue.push(cmd);
            tickets.push(ticket);
        }
        let order: Vec<LayoutPriority> =
            std::iter::from_fn(|| queue.pop().map(|c| c.priority)).collect();
        assert_eq!(
            order,
            vec![
                LayoutPriority::Critical,
                LayoutPriority::High,
                LayoutPriority::Normal,
                LayoutPriority::Low
            ]
        );
    }

    #[test]
    fn test_equal_priorities_keep_insert_order() {
        let mut queue = CommandQueue::default();
        let (mut first, _t1) = command(LayoutPriority::Normal);
        first.graph.layout_version = 1;
        let (mut second, _t2) = command(LayoutPriority::Normal);
        second.graph.layout_version = 2;
        queue.push(first);
        queue.push(second);
        assert_eq!(queue.pop().unwrap().graph.layout_version, 1);
        assert_eq!(queue.pop().unwrap().graph.layout_version, 2);
    }

    #[test]
    fn test_weights() {
        assert_eq!(LayoutPriority::Critical.weight(), 100);
        assert_eq!(LayoutPriority::Low.weight(), 25);
    }
}
