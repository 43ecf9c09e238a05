//! Raw-data normalizer
//!
//! Turns entity/relationship payloads from the query layer into a layout
//! graph. Containment relationships define the hierarchy and are consumed;
//! everything else becomes a drawable edge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::edge::CanvasEdge;
use crate::graph::{LayoutEdgeEntry, LayoutGraph, LayoutNodeEntry};
use crate::node::NodeKind;
use crate::ModelError;

/// Relationship types that define parent→child hierarchy. Matching is
/// case-sensitive, as delivered by the query layer.
pub const CONTAINMENT_TYPES: [&str; 4] = ["CONTAINS", "HAS_CHILD", "HAS_COMPONENT", "PARENT_OF"];

pub fn is_containment_type(relation: &str) -> bool {
    CONTAINMENT_TYPES.contains(&relation)
}

// =============================================================================
// RAW INPUT
// =============================================================================

/// Graph payload received from the query layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGraphInput {
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl RawEntity {
    /// Stable GUID: the reserved `GUID` property wins over the record id.
    pub fn guid(&self) -> Option<String> {
        self.properties
            .get("GUID")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| self.id.clone())
    }

    /// Semantic kind from the `type` property, falling back to labels.
    pub fn kind(&self) -> NodeKind {
        let tag = self
            .properties
            .get("type")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| self.labels.first().cloned());
        match tag {
            Some(tag) => tag.parse().unwrap_or_default(),
            None => NodeKind::default(),
        }
    }

    fn numeric_property(&self, key: &str) -> Option<f32> {
        self.properties.get(key).and_then(|v| v.as_f64()).map(|v| v as f32)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRelationship {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(rename = "fromGUID", alias = "source", default)]
    pub from_guid: Option<String>,
    #[serde(rename = "toGUID", alias = "target", default)]
    pub to_guid: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Descriptive problems that make a payload unloadable.
pub fn validate(input: &RawGraphInput) -> Vec<String> {
    let mut issues = Vec::new();
    if input.entities.is_empty() {
        issues.push("entity list is empty".to_string());
    }
    if input.entities.iter().all(|e| e.guid().is_none()) && !input.entities.is_empty() {
        issues.push("no entity carries a GUID".to_string());
    }
    let mut seen = std::collections::HashSet::new();
    for entity in &input.entities {
        if let Some(guid) = entity.guid() {
            if !seen.insert(guid.clone()) {
                issues.push(format!("duplicate entity GUID: {guid}"));
            }
        }
    }
    issues
}

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Build a layout graph from raw entities and relationships.
///
/// Entities without a GUID are skipped with a warning. Relationships with a
/// missing or unresolvable endpoint are dropped, never an error.
pub fn normalize(input: &RawGraphInput) -> Result<LayoutGraph, ModelError> {
    if input.entities.is_empty() {
        return Err(ModelError::EmptyEntityList);
    }
    let issues = validate(input);
    if !issues.is_empty() {
        return Err(ModelError::Validation(issues.join("; ")));
    }

    let mut graph = LayoutGraph::default();

    for entity in &input.entities {
        let Some(guid) = entity.guid() else {
            tracing::warn!(name = ?entity.name, "skipping entity without GUID");
            continue;
        };
        let kind = entity.kind();
        let label = entity
            .name
            .clone()
            .or_else(|| entity.id.clone())
            .unwrap_or_else(|| guid.clone());
        let mut entry = LayoutNodeEntry::new(guid.clone(), label, kind);
        entry.display_id = entity.id.clone().unwrap_or_else(|| guid.clone());
        entry.style = crate::style::default_node_style(kind);
        entry.style.badges = entity.labels.clone();
        if let Some(width) = entity.numeric_property("width") {
            entry.geometry.width = width;
        }
        if let Some(height) = entity.numeric_property("height") {
            entry.geometry.height = height;
        }
        entry
            .metadata
            .set_default_size(egui::Vec2::new(entry.geometry.width, entry.geometry.height));
        graph.insert_node(entry);
    }

    if graph.nodes.is_empty() {
        return Err(ModelError::Validation(
            "no entity carries a GUID".to_string(),
        ));
    }

    for relationship in &input.relationships {
        let (Some(from), Some(to)) = (&relationship.from_guid, &relationship.to_guid) else {
            tracing::warn!(
                relation = %relationship.relation_type,
                "dropping relationship with missing endpoint"
            );
            continue;
        };
        if !graph.nodes.contains_key(from) || !graph.nodes.contains_key(to) {
            tracing::warn!(
                relation = %relationship.relation_type,
                from = %from,
                to = %to,
                "dropping relationship with unresolved endpoint"
            );
            continue;
        }

        if is_containment_type(&relationship.relation_type) {
            if let Some(parent) = graph.nodes.get_mut(from) {
                if !parent.children.iter().any(|child| child == to) {
                    parent.children.push(to.clone());
                }
            }
        } else {
            let id = relationship
                .id
                .clone()
                .unwrap_or_else(|| CanvasEdge::synthesized_id(from, to));
            let mut edge = LayoutEdgeEntry::new(id.clone(), from.clone(), to.clone());
            edge.style = crate::style::default_edge_style(Some(&relationship.relation_type));
            edge.relation_type = Some(relationship.relation_type.clone());
            edge.label = relationship
                .properties
                .get("label")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            graph.edges.insert(id, edge);
        }
    }

    graph.recompute_roots();
    graph.reindex_edges();
    Ok(graph)
}
