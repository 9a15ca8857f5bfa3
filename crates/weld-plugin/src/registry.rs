use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use weld_model::StepKind;

use crate::error::PluginError;
use crate::plugin::Plugin;

/// Lookup table from step kind to the plugin that implements it.
///
/// A plain `RwLock<BTreeMap<_>>` rather than a concurrent map: the
/// registry is populated once at startup and then read many times
/// concurrently during a run, which a reader-writer lock handles without
/// pulling in an extra dependency for a write pattern that never happens
/// mid-run.
#[derive(Default)]
pub struct Registry {
    plugins: RwLock<BTreeMap<StepKind, Arc<dyn Plugin>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let kind = plugin.kind();
        self.plugins
            .write()
            .expect("plugin registry lock poisoned")
            .insert(kind, plugin);
    }

    pub fn get(&self, kind: StepKind) -> Result<Arc<dyn Plugin>, PluginError> {
        self.plugins
            .read()
            .expect("plugin registry lock poisoned")
            .get(&kind)
            .cloned()
            .ok_or(PluginError::NotFound(kind))
    }

    pub fn contains(&self, kind: StepKind) -> bool {
        self.plugins
            .read()
            .expect("plugin registry lock poisoned")
            .contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.plugins
            .read()
            .expect("plugin registry lock poisoned")
            .keys()
            .copied()
            .collect()
    }
}
