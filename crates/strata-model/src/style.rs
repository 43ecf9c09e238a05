//! Style resolution
//!
//! Default presentation per node kind and relationship type, applied at
//! normalization time and cached into `metadata.presentation`. User
//! `styleOverrides` win over everything and survive layout rebuilds.

use egui::Color32;

use crate::edge::EdgeStyle;
use crate::node::{CanvasNode, NodeKind, NodeStyle};

// =============================================================================
// NODE PALETTE
// =============================================================================

pub fn node_fill(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::Root => Color32::from_rgb(31, 41, 55),
        NodeKind::Container => Color32::from_rgb(55, 65, 81),
        NodeKind::Node => Color32::from_rgb(63, 74, 94),
        NodeKind::Component => Color32::from_rgb(71, 85, 105),
    }
}

pub fn node_stroke(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::Root => Color32::from_rgb(156, 163, 175),
        NodeKind::Container => Color32::from_rgb(107, 114, 128),
        NodeKind::Node => Color32::from_rgb(96, 108, 129),
        NodeKind::Component => Color32::from_rgb(100, 116, 139),
    }
}

/// Icon token resolved by the renderer's icon set.
pub fn node_icon(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Root => "icon-root",
        NodeKind::Container => "icon-folder",
        NodeKind::Node => "icon-node",
        NodeKind::Component => "icon-component",
    }
}

/// Default style for a node of the given kind.
pub fn default_node_style(kind: NodeKind) -> NodeStyle {
    NodeStyle {
        fill: node_fill(kind),
        stroke: node_stroke(kind),
        stroke_width: if kind.is_container() { 2.0 } else { 1.5 },
        icon: Some(node_icon(kind).to_string()),
        badges: Vec::new(),
        show_label: true,
    }
}

// =============================================================================
// EDGE PALETTE
// =============================================================================

pub fn edge_color(relation_type: Option<&str>) -> Color32 {
    match relation_type.map(|r| r.to_ascii_uppercase()) {
        Some(ref r) if r == "CALLS" || r == "INVOKES" => Color32::from_rgb(96, 165, 250),
        Some(ref r) if r == "DEPENDS_ON" || r == "IMPORTS" => Color32::from_rgb(251, 191, 36),
        Some(ref r) if r == "CONTAINS" => Color32::from_rgb(74, 222, 128),
        Some(ref r) if r.starts_with("REFERENCES") => Color32::from_rgb(192, 132, 252),
        _ => Color32::from_rgb(107, 114, 128),
    }
}

/// Default style for an edge of the given relationship type.
pub fn default_edge_style(relation_type: Option<&str>) -> EdgeStyle {
    EdgeStyle {
        color: edge_color(relation_type),
        width: 1.5,
        dash: None,
    }
}

// =============================================================================
// PRESENTATION CACHE
// =============================================================================

/// Resolve a node's effective style: defaults for its kind, overlaid with
/// any user `styleOverrides`, and cache the result in
/// `metadata.presentation`.
pub fn resolve_presentation(node: &mut CanvasNode) {
    let mut style = default_node_style(node.kind);
    // Badges carried on the node survive restyling.
    style.badges = node.style.badges.clone();

    if let Some(overrides) = node.metadata.style_overrides.clone() {
        apply_overrides(&mut style, &overrides);
    }

    node.metadata.presentation = serde_json::to_value(&style).ok();
    node.style = style;
}

/// Overlay the recognized override keys onto a style. Unknown keys are
/// ignored so stale overrides never fail a load.
fn apply_overrides(style: &mut NodeStyle, overrides: &serde_json::Value) {
    if let Some(fill) = overrides.get("fill").and_then(parse_color) {
        style.fill = fill;
    }
    if let Some(stroke) = overrides.get("stroke").and_then(parse_color) {
        style.stroke = stroke;
    }
    if let Some(width) = overrides.get("strokeWidth").and_then(|v| v.as_f64()) {
        style.stroke_width = width as f32;
    }
    if let Some(icon) = overrides.get("icon").and_then(|v| v.as_str()) {
        style.icon = Some(icon.to_string());
    }
    if let Some(show) = overrides.get("showLabel").and_then(|v| v.as_bool()) {
        style.show_label = show;
    }
}

/// Parse `#rrggbb` / `#rrggbbaa` strings.
fn parse_color(value: &serde_json::Value) -> Option<Color32> {
    let text = value.as_str()?.strip_prefix('#')?;
    let parse = |range: std::ops::Range<usize>| u8::from_str_radix(text.get(range)?, 16).ok();
    match text.len() {
        6 => Some(Color32::from_rgb(parse(0..2)?, parse(2..4)?, parse(4..6)?)),
        8 => Some(Color32::from_rgba_unmultiplied(
            parse(0..2)?,
            parse(2..4)?,
            parse(4..6)?,
            parse(6..8)?,
        )),
        _ => None,
    }
}

/// Resolve presentation for a whole tree.
pub fn resolve_tree_presentation(nodes: &mut [CanvasNode]) {
    for node in nodes {
        resolve_presentation(node);
        resolve_tree_presentation(&mut node.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_palette_is_distinct() {
        let fills: std::collections::HashSet<_> = [
            NodeKind::Root,
            NodeKind::Container,
            NodeKind::Node,
            NodeKind::Component,
        ]
        .iter()
        .map(|k| node_fill(*k).to_array())
        .collect();
        assert_eq!(fills.len(), 4);
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let mut node = CanvasNode::new("n", "n", NodeKind::Node);
        node.metadata.style_overrides = Some(json!({
            "fill": "#ff0000",
            "strokeWidth": 4.0,
            "showLabel": false
        }));
        resolve_presentation(&mut node);
        assert_eq!(node.style.fill, Color32::from_rgb(255, 0, 0));
        assert_eq!(node.style.stroke_width, 4.0);
        assert!(!node.style.show_label);
        // Non-overridden parts keep the kind default.
        assert_eq!(node.style.stroke, node_stroke(NodeKind::Node));
    }

    #[test]
    fn test_presentation_is_cached() {
        let mut node = CanvasNode::new("n", "n", NodeKind::Container);
        resolve_presentation(&mut node);
        let cached = node.metadata.presentation.as_ref().unwrap();
        assert!(cached.get("fill").is_some());
        assert_eq!(cached["icon"], "icon-folder");
    }

    #[test]
    fn test_bad_override_values_are_ignored() {
        let mut node = CanvasNode::new("n", "n", NodeKind::Node);
        node.metadata.style_overrides = Some(json!({
            "fill": "not-a-color",
            "strokeWidth": "huh"
        }));
        resolve_presentation(&mut node);
        assert_eq!(node.style.fill, node_fill(NodeKind::Node));
    }

    #[test]
    fn test_parse_color_with_alpha() {
        let color = parse_color(&json!("#11223344")).unwrap();
        assert_eq!(color, Color32::from_rgba_unmultiplied(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_edge_palette_by_relation() {
        assert_ne!(
            edge_color(Some("CALLS")).to_array(),
            edge_color(Some("DEPENDS_ON")).to_array()
        );
        assert_eq!(
            edge_color(Some("unknown")).to_array(),
            edge_color(None).to_array()
        );
    }
}
