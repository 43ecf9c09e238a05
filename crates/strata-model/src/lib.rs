//! Canvas graph data model
//!
//! Canonical types shared by every subsystem of the canvas layout runtime.
//!
//! # Architecture
//!
//! ```text
//! RawGraphInput (query layer)
//!        │  normalize()
//!        ▼
//! LayoutGraph (flat wire form) ◄──── to_layout_graph() ────┐
//!        │                                                 │
//!        │  to_hierarchical()                              │
//!        ▼                                                 │
//! CanvasData (nested render tree + edges + camera) ────────┘
//! ```
//!
//! `CanvasData` is the authoritative mutable view model; `LayoutGraph` is
//! what layout engines consume and produce. The two conversions are pure
//! and round-trip exactly.

pub mod camera;
pub mod canvas;
pub mod convert;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;
pub mod raw;
pub mod style;

pub use camera::{Camera, MAX_ZOOM, MIN_ZOOM};
pub use canvas::{CanvasData, CanvasMetadata};
pub use convert::{to_hierarchical, to_layout_graph};
pub use edge::{CanvasEdge, EdgeStyle, INHERITED_EDGE_PREFIX};
pub use error::ModelError;
pub use graph::{LayoutEdgeEntry, LayoutGraph, LayoutNodeEntry, NodeGeometry, NodeState};
pub use node::{CanvasNode, NodeKind, NodeMetadata, NodeStyle};
pub use raw::{is_containment_type, normalize, validate, RawEntity, RawGraphInput, RawRelationship, CONTAINMENT_TYPES};
pub use style::{default_edge_style, default_node_style, resolve_presentation, resolve_tree_presentation};
