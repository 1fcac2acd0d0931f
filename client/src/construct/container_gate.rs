use std::collections::{HashMap, HashSet};

use log::info;

use fabric_shared::{ContainerId, EntityId};

/// Tracks which streaming containers are loaded, and which entities are
/// waiting on each one that is not.
#[derive(Default)]
pub struct ContainerGate {
    loaded: HashSet<ContainerId>,
    waiting: HashMap<ContainerId, Vec<EntityId>>,
}

impl ContainerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, container: &ContainerId) -> bool {
        self.loaded.contains(container)
    }

    /// Parks `entity_id` until `container` loads.
    pub fn defer(&mut self, container: ContainerId, entity_id: EntityId) {
        let waiting = self.waiting.entry(container).or_default();
        if !waiting.contains(&entity_id) {
            waiting.push(entity_id);
        }
    }

    /// Marks `container` loaded and returns the entities that were waiting on
    /// it, in the order they were deferred.
    pub fn on_container_loaded(&mut self, container: &ContainerId) -> Vec<EntityId> {
        if !self.loaded.insert(container.clone()) {
            info!("Container {} reported loaded twice", container);
        }
        self.waiting.remove(container).unwrap_or_default()
    }

    /// Forgets that `container` is loaded, so later spawns inside it wait
    /// again.
    pub fn on_container_unloaded(&mut self, container: &ContainerId) {
        self.loaded.remove(container);
    }

    /// Stops `entity_id` from waiting on `container`.
    pub fn forget(&mut self, container: &ContainerId, entity_id: EntityId) {
        let mut now_empty = false;
        if let Some(waiting) = self.waiting.get_mut(container) {
            waiting.retain(|waiting_id| *waiting_id != entity_id);
            now_empty = waiting.is_empty();
        }
        if now_empty {
            self.waiting.remove(container);
        }
    }

    pub fn waiting_on(&self, container: &ContainerId) -> &[EntityId] {
        self.waiting
            .get(container)
            .map(|waiting| waiting.as_slice())
            .unwrap_or(&[])
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.values().map(|waiting| waiting.len()).sum()
    }
}
