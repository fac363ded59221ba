//! The Plugin Registry: owns every loaded plugin's state and
//! entry table, keyed by normalized path.

use monitor_core::{PluginEntryKind, PluginId, PluginState};
use monitor_script::LoadedScript;
use std::collections::HashMap;

/// Everything the Registry knows about one loaded plugin.
pub struct PluginRecord {
    pub id: PluginId,
    pub state: PluginState,
    pub script: LoadedScript,
    pub entries: HashMap<String, PluginEntryKind>,
}

impl PluginRecord {
    pub fn display_name(&self) -> String {
        self.id.display_name()
    }

    pub fn command(&self, name: &str) -> Option<&PluginEntryKind> {
        match self.entries.get(name) {
            Some(kind @ PluginEntryKind::UserCommand) => Some(kind),
            _ => None,
        }
    }
}

/// Owns all loaded plugins. A process-wide singleton in practice, but never
/// accessed from plugin code directly — only the Loader and Dispatcher hold
/// a reference.
#[derive(Default)]
pub struct Registry {
    plugins: HashMap<PluginId, PluginRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PluginRecord) {
        self.plugins.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &PluginId) -> Option<PluginRecord> {
        self.plugins.remove(id)
    }

    pub fn get(&self, id: &PluginId) -> Option<&PluginRecord> {
        self.plugins.get(id)
    }

    pub fn get_mut(&mut self, id: &PluginId) -> Option<&mut PluginRecord> {
        self.plugins.get_mut(id)
    }

    pub fn contains(&self, id: &PluginId) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
        self.plugins.values()
    }

    /// Finds the loaded plugin whose display name (basename without
    /// extension) matches, for `!<plugin> <command>` dispatch.
    pub fn find_by_display_name(&self, name: &str) -> Option<&PluginRecord> {
        self.plugins.values().find(|p| p.display_name() == name)
    }

    /// Every plugin currently accepting events (`Ready`), matching the
    /// invariant that a `Failed` plugin accepts no further events.
    pub fn ready_plugins(&self) -> impl Iterator<Item = &PluginRecord> {
        self.plugins.values().filter(|p| p.state.accepts_events())
    }
}
