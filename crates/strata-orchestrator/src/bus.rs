//! Canvas event bus
//!
//! Surface-scoped lifecycle events visible to engines and the engine
//! facade. Delivery is fan-out over lock-free channels; disconnected
//! subscribers are pruned on publish.

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use strata_engines::LayoutReason;

// =============================================================================
// EVENTS
// =============================================================================

/// Closed set of canvas lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CanvasEventKind {
    LayoutRequested {
        engine: String,
        reason: LayoutReason,
    },
    LayoutApplied {
        engine: String,
        duration_ms: f64,
        layout_version: u64,
    },
    EngineSwitched {
        previous: Option<String>,
        engine: String,
    },
    CollapseNode {
        node_guid: String,
    },
    ExpandNode {
        node_guid: String,
    },
    NodeMoved {
        node_guid: String,
        x: f32,
        y: f32,
    },
    ResizeNode {
        node_guid: String,
        width: f32,
        height: f32,
    },
    CameraChanged {
        x: f32,
        y: f32,
        zoom: f32,
    },
    HistoryReplay {
        version: u64,
    },
    GraphLensChanged {
        lens: String,
    },
    CollapseToLevel {
        level: usize,
    },
}

/// Envelope shared by every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_id: Option<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: CanvasEventKind,
}

impl CanvasEvent {
    pub fn now(canvas_id: impl Into<String>, source: impl Into<String>, kind: CanvasEventKind) -> Self {
        Self {
            canvas_id: Some(canvas_id.into()),
            source: source.into(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

// =============================================================================
// BUS
// =============================================================================

/// Fan-out publish/subscribe channel for one surface.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<CanvasEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<CanvasEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber, dropping dead ones.
    pub fn publish(&mut self, event: CanvasEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(CanvasEvent::now(
            "c1",
            "engine",
            CanvasEventKind::CollapseNode {
                node_guid: "n".into(),
            },
        ));
        assert_eq!(a.try_iter().count(), 1);
        assert_eq!(b.try_iter().count(), 1);
    }

    #[test]
    fn test_dead_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(CanvasEvent::now(
            "c1",
            "engine",
            CanvasEventKind::GraphLensChanged {
                lens: "full-graph".into(),
            },
        ));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_every_kind_has_a_stable_tag() {
        let kinds = vec![
            (CanvasEventKind::LayoutRequested { engine: "g".into(), reason: LayoutReason::Initial }, "layoutRequested"),
            (CanvasEventKind::LayoutApplied { engine: "g".into(), duration_ms: 1.0, layout_version: 1 }, "layoutApplied"),
            (CanvasEventKind::EngineSwitched { previous: None, engine: "g".into() }, "engineSwitched"),
            (CanvasEventKind::CollapseNode { node_guid: "n".into() }, "collapseNode"),
            (CanvasEventKind::ExpandNode { node_guid: "n".into() }, "expandNode"),
            (CanvasEventKind::NodeMoved { node_guid: "n".into(), x: 0.0, y: 0.0 }, "nodeMoved"),
            (CanvasEventKind::ResizeNode { node_guid: "n".into(), width: 1.0, height: 1.0 }, "resizeNode"),
            (CanvasEventKind::CameraChanged { x: 0.0, y: 0.0, zoom: 1.0 }, "cameraChanged"),
            (CanvasEventKind::HistoryReplay { version: 1 }, "historyReplay"),
            (CanvasEventKind::GraphLensChanged { lens: "full-graph".into() }, "graphLensChanged"),
            (CanvasEventKind::CollapseToLevel { level: 1 }, "collapseToLevel"),
        ];
        for (kind, tag) in kinds {
            let event = CanvasEvent::now("c", "engine", kind);
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["kind"], tag);
            assert!(json.get("timestamp").is_some());
            assert_eq!(json["canvasId"], "c");
        }
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = CanvasEvent::now(
            "c1",
            "layout",
            CanvasEventKind::CollapseToLevel { level: 1 },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "collapseToLevel");
        assert_eq!(json["level"], 1);
        assert_eq!(json["source"], "layout");
    }
}
