//! Canvas workspace
//!
//! Owner of multiple independent surfaces. Each surface carries its own
//! camera, active engine, queue, and state; the workspace only routes by
//! surface id and tears surfaces down on destroy.

use std::collections::HashMap;

use crate::runtime::CanvasRuntime;

pub struct CanvasWorkspace {
    surfaces: HashMap<String, CanvasRuntime>,
    use_worker: bool,
}

impl CanvasWorkspace {
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
            use_worker: false,
        }
    }

    /// Workspace whose surfaces offload layout to worker threads.
    pub fn with_worker() -> Self {
        Self {
            surfaces: HashMap::new(),
            use_worker: true,
        }
    }

    /// Surface for the id, created on first use.
    pub fn surface(&mut self, id: &str) -> &mut CanvasRuntime {
        let use_worker = self.use_worker;
        self.surfaces.entry(id.to_string()).or_insert_with(|| {
            if use_worker {
                CanvasRuntime::with_worker(id)
            } else {
                CanvasRuntime::new(id)
            }
        })
    }

    pub fn get(&self, id: &str) -> Option<&CanvasRuntime> {
        self.surfaces.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CanvasRuntime> {
        self.surfaces.get_mut(id)
    }

    /// Tear down one surface; pending layout commands are dropped.
    pub fn destroy(&mut self, id: &str) -> bool {
        match self.surfaces.remove(id) {
            Some(runtime) => {
                runtime.destroy();
                true
            }
            None => false,
        }
    }

    pub fn surface_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.surfaces.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Pump every surface's reflow and subscription queues.
    pub fn tick_all(&mut self) {
        for runtime in self.surfaces.values_mut() {
            runtime.tick();
        }
    }
}

impl Default for CanvasWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
