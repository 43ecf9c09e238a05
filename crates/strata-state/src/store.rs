//! Persistence seam
//!
//! Transport is a collaborator, not part of the runtime; only the payload
//! shapes are. `LayoutStore` is the seam a host implements over whatever
//! storage it has; the in-memory store backs tests and demos.

use std::collections::HashMap;

use strata_model::CanvasData;

use crate::persist::{load_layout, load_settings, save_layout, save_settings};
use crate::{AutoLayoutSettings, StateError};

/// Keyed string storage the host provides.
pub trait LayoutStore {
    fn put(&mut self, key: &str, payload: &str) -> Result<(), StateError>;
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&mut self, key: &str);
}

/// In-memory store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LayoutStore for MemoryStore {
    fn put(&mut self, key: &str, payload: &str) -> Result<(), StateError> {
        self.entries.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

// =============================================================================
// KEYED HELPERS
// =============================================================================

fn layout_key(view: &str) -> String {
    format!("layout:{view}")
}

fn settings_key(view: &str) -> String {
    format!("autolayout:{view}")
}

/// Persist a canvas snapshot under a view id.
pub fn store_canvas(
    store: &mut dyn LayoutStore,
    view: &str,
    data: &CanvasData,
) -> Result<(), StateError> {
    let payload = save_layout(data)?;
    store.put(&layout_key(view), &payload)
}

/// Load a canvas snapshot; absent or invalid payloads are `None`.
pub fn fetch_canvas(store: &dyn LayoutStore, view: &str) -> Option<CanvasData> {
    load_layout(&store.get(&layout_key(view))?)
}

pub fn store_settings(
    store: &mut dyn LayoutStore,
    view: &str,
    settings: &AutoLayoutSettings,
) -> Result<(), StateError> {
    let payload = save_settings(settings)?;
    store.put(&settings_key(view), &payload)
}

pub fn fetch_settings(store: &dyn LayoutStore, view: &str) -> Option<AutoLayoutSettings> {
    load_settings(&store.get(&settings_key(view))?)
}
