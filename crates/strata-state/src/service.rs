//! Canvas view state service
//!
//! A versioned publish/subscribe broker per surface. Every publish stores a
//! deep-cloned snapshot, bumps the monotonic version counter, and fans a
//! typed mutation out to subscribers. A subscriber that originates a
//! mutation never re-observes its own publication (loopback suppression).

use crossbeam_channel::{unbounded, Receiver, Sender};
use egui::Pos2;
use serde::{Deserialize, Serialize};

use strata_model::CanvasData;

use crate::journal::MutationJournal;

// =============================================================================
// MUTATIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Initialize,
    Replace,
    Position,
    Resize,
    Collapse,
    Layout,
    Camera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationSource {
    Engine,
    Layout,
    External,
}

/// One entry of the mutation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasMutation {
    #[serde(rename = "type")]
    pub kind: MutationKind,
    pub source: MutationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub version: u64,
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

pub type SubscriberId = u64;

/// Receiving side of the mutation stream for one subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: Receiver<(Option<SubscriberId>, CanvasMutation)>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next mutation published by someone else; own publications are
    /// skipped.
    pub fn poll(&self) -> Option<CanvasMutation> {
        loop {
            match self.rx.try_recv() {
                Ok((origin, mutation)) => {
                    if origin == Some(self.id) {
                        continue;
                    }
                    return Some(mutation);
                }
                Err(_) => return None,
            }
        }
    }

    /// Everything pending, own publications excluded.
    pub fn drain(&self) -> Vec<CanvasMutation> {
        std::iter::from_fn(|| self.poll()).collect()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Holds the latest snapshot and the mutation stream for one surface.
pub struct ViewStateService {
    snapshot: CanvasData,
    version: u64,
    subscribers: Vec<(SubscriberId, Sender<(Option<SubscriberId>, CanvasMutation)>)>,
    next_subscriber: SubscriberId,
    journal: MutationJournal,
}

impl Default for ViewStateService {
    fn default() -> Self {
        Self::new(CanvasData::default())
    }
}

impl ViewStateService {
    pub fn new(initial: CanvasData) -> Self {
        Self {
            snapshot: initial,
            version: 0,
            subscribers: Vec::new(),
            next_subscriber: 1,
            journal: MutationJournal::default(),
        }
    }

    /// Recent mutation history for diagnostics and replay.
    pub fn journal(&self) -> &MutationJournal {
        &self.journal
    }

    /// Monotonic version of the stored snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Borrow the latest snapshot without cloning.
    pub fn peek(&self) -> &CanvasData {
        &self.snapshot
    }

    /// Deep clone of the latest snapshot, safe for a subscriber to mutate.
    pub fn snapshot(&self) -> CanvasData {
        self.snapshot.clone()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        let (tx, rx) = unbounded();
        self.subscribers.push((id, tx));
        Subscription { id, rx }
    }

    /// Store a deep clone of `snapshot`, bump the version, and fan the
    /// mutation out. `origin` marks the publishing subscriber so its own
    /// echo is suppressed. Returns the new version.
    pub fn publish(
        &mut self,
        snapshot: &CanvasData,
        kind: MutationKind,
        source: MutationSource,
        node_guid: Option<String>,
        payload: Option<serde_json::Value>,
        origin: Option<SubscriberId>,
    ) -> u64 {
        self.snapshot = snapshot.clone();
        self.version += 1;
        let mutation = CanvasMutation {
            kind,
            source,
            node_guid,
            payload,
            version: self.version,
        };
        self.journal.record(mutation.clone());
        self.subscribers
            .retain(|(_, tx)| tx.send((origin, mutation.clone())).is_ok());
        self.version
    }

    /// Convenience mutator: write a node's geometry into a cloned snapshot
    /// and publish a `position` mutation. Optionally records the user lock.
    pub fn update_node_position(
        &mut self,
        guid: &str,
        position: Pos2,
        user_locked: Option<bool>,
        source: MutationSource,
        origin: Option<SubscriberId>,
    ) -> Option<u64> {
        let mut draft = self.snapshot.clone();
        {
            let node = draft.find_node_mut(guid)?;
            node.position = position;
            if let Some(locked) = user_locked {
                node.metadata.locked_position = Some(position);
                node.metadata.user_locked = locked;
            }
        }
        draft.refresh_world_positions_from(guid);
        draft.invalidate_edge_waypoints(guid);
        let payload = serde_json::json!({ "x": position.x, "y": position.y });
        Some(self.publish(
            &draft,
            MutationKind::Position,
            source,
            Some(guid.to_string()),
            Some(payload),
            origin,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_model::{CanvasNode, NodeKind};

    fn data() -> CanvasData {
        let mut data = CanvasData::default();
        let mut root = CanvasNode::new("r", "root", NodeKind::Root);
        root.children.push(CanvasNode::new("a", "a", NodeKind::Node));
        data.nodes.push(root);
        data
    }

    #[test]
    fn test_versions_are_monotonic() {
        let mut service = ViewStateService::new(data());
        let snapshot = service.snapshot();
        let v1 = service.publish(
            &snapshot,
            MutationKind::Initialize,
            MutationSource::External,
            None,
            None,
            None,
        );
        let v2 = service.publish(
            &snapshot,
            MutationKind::Layout,
            MutationSource::Layout,
            None,
            None,
            None,
        );
        assert!(v2 > v1);
        assert_eq!(service.version(), v2);
    }

    #[test]
    fn test_subscribers_observe_ordered_mutations() {
        let mut service = ViewStateService::new(data());
        let sub = service.subscribe();
        let snapshot = service.snapshot();
        for kind in [MutationKind::Initialize, MutationKind::Collapse, MutationKind::Layout] {
            service.publish(&snapshot, kind, MutationSource::External, None, None, None);
        }
        let versions: Vec<u64> = sub.drain().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_loopback_suppression() {
        let mut service = ViewStateService::new(data());
        let own = service.subscribe();
        let other = service.subscribe();
        let snapshot = service.snapshot();
        service.publish(
            &snapshot,
            MutationKind::Collapse,
            MutationSource::Engine,
            Some("a".into()),
            None,
            Some(own.id()),
        );
        assert!(own.poll().is_none());
        assert!(other.poll().is_some());
    }

    #[test]
    fn test_update_node_position_sets_lock() {
        let mut service = ViewStateService::new(data());
        service
            .update_node_position(
                "a",
                Pos2::new(40.0, 50.0),
                Some(true),
                MutationSource::Engine,
                None,
            )
            .unwrap();
        let node = service.peek().find_node("a").unwrap();
        assert_eq!(node.position, Pos2::new(40.0, 50.0));
        assert!(node.metadata.user_locked);
        assert_eq!(node.metadata.locked_position, Some(Pos2::new(40.0, 50.0)));
        assert_eq!(node.metadata.world_position, Some(Pos2::new(40.0, 50.0)));
    }

    #[test]
    fn test_unknown_node_position_is_none() {
        let mut service = ViewStateService::new(data());
        assert!(service
            .update_node_position("ghost", Pos2::ZERO, None, MutationSource::Engine, None)
            .is_none());
    }

    #[test]
    fn test_publish_stores_deep_clone() {
        let mut service = ViewStateService::new(data());
        let mut snapshot = service.snapshot();
        service.publish(
            &snapshot,
            MutationKind::Replace,
            MutationSource::External,
            None,
            None,
            None,
        );
        // Mutating the caller's copy must not reach the stored snapshot.
        snapshot.find_node_mut("a").unwrap().label = "changed".into();
        assert_eq!(service.peek().find_node("a").unwrap().label, "a");
    }

    #[test]
    fn test_journal_records_published_mutations() {
        let mut service = ViewStateService::new(data());
        let snapshot = service.snapshot();
        service.publish(&snapshot, MutationKind::Initialize, MutationSource::External, None, None, None);
        service.publish(&snapshot, MutationKind::Camera, MutationSource::Engine, None, None, None);
        assert_eq!(service.journal().len(), 2);
        let since: Vec<u64> = service.journal().since(1).map(|e| e.mutation.version).collect();
        assert_eq!(since, vec![2]);
    }

    #[test]
    fn test_mutation_serde_shape() {
        let mutation = CanvasMutation {
            kind: MutationKind::Position,
            source: MutationSource::Engine,
            node_guid: Some("a".into()),
            payload: None,
            version: 7,
        };
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["type"], "position");
        assert_eq!(json["source"], "engine");
        assert_eq!(json["version"], 7);
    }
}
