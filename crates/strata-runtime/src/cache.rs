//! Renderer cache
//!
//! Style and label resolution is the repeatable cost of a frame; geometry
//! and camera transforms are not. The cache keeps per-node resolved
//! presentation keyed by the layout version, and is invalidated per node
//! on drag/resize and wholesale on any structural mutation.

use std::collections::HashMap;

use strata_model::{CanvasNode, NodeStyle};

/// Resolved presentation for one node, valid for one layout version.
#[derive(Debug, Clone)]
pub struct CachedPresentation {
    pub style: NodeStyle,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct RenderCache {
    layout_version: Option<u64>,
    nodes: HashMap<String, CachedPresentation>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a frame. A layout-version change drops everything.
    pub fn begin_frame(&mut self, layout_version: u64) {
        if self.layout_version != Some(layout_version) {
            self.nodes.clear();
            self.layout_version = Some(layout_version);
        }
    }

    /// Resolved presentation for a node, computed on miss.
    pub fn presentation(&mut self, node: &CanvasNode) -> CachedPresentation {
        if let Some(cached) = self.nodes.get(&node.guid) {
            self.hits += 1;
            return cached.clone();
        }
        self.misses += 1;
        let resolved = CachedPresentation {
            style: node.style.clone(),
            label: node.display_label().to_string(),
        };
        self.nodes.insert(node.guid.clone(), resolved.clone());
        resolved
    }

    /// Drop one node's entry (drag or resize stopped on it).
    pub fn invalidate_node(&mut self, guid: &str) {
        self.nodes.remove(guid);
    }

    /// Drop everything (replace/initialize/layout mutations, collapse).
    pub fn invalidate_all(&mut self) {
        self.nodes.clear();
        self.layout_version = None;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(hits, misses)` counters for instrumentation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
