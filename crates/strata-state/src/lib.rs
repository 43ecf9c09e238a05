//! Canvas view state
//!
//! The versioned mutation log shared across subsystems: engine facade,
//! dynamic reflow, and persistence all observe the same ordered stream and
//! read the same authoritative snapshot.

use thiserror::Error;

pub mod history;
pub mod journal;
pub mod persist;
pub mod service;
pub mod store;

pub use history::{CanvasHistory, DEFAULT_HISTORY_CAPACITY};
pub use journal::{JournalEntry, MutationJournal, DEFAULT_JOURNAL_CAPACITY};
pub use persist::{
    load_layout, load_settings, save_layout, save_settings, AutoLayoutSettings, CollapseBehavior,
    ReflowBehavior,
};
pub use service::{
    CanvasMutation, MutationKind, MutationSource, SubscriberId, Subscription, ViewStateService,
};
pub use store::{
    fetch_canvas, fetch_settings, store_canvas, store_settings, LayoutStore, MemoryStore,
};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
