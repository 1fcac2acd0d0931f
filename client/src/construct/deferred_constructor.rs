use std::collections::HashMap;

use log::info;

use fabric_shared::{Authority, ComponentData, ComponentId, ContainerId, EntityId, SpawnData};

use crate::construct::container_gate::ContainerGate;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstructionState {
    /// Components are still arriving, or spawn data has not been read yet.
    Collecting,
    /// Spawn data places the entity inside a container that is not loaded.
    WaitingOnContainer(ContainerId),
    /// Every precondition holds; the entity can be built.
    Ready,
}

/// What the receiver knows about an entity it has not built yet.
#[derive(Clone, Debug)]
pub struct DeferredConstructionRecord {
    pub entity_id: EntityId,
    pub components: Vec<ComponentData>,
    pub pending_authority: Vec<(ComponentId, Authority)>,
    pub spawn_data: Option<SpawnData>,
    pub state: ConstructionState,
}

impl DeferredConstructionRecord {
    fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            components: Vec::new(),
            pending_authority: Vec::new(),
            spawn_data: None,
            state: ConstructionState::Collecting,
        }
    }
}

/// Holds entities from the first add until they are built, gating the ones
/// that spawn inside unloaded containers.
#[derive(Default)]
pub struct DeferredConstructor {
    records: HashMap<EntityId, DeferredConstructionRecord>,
    gate: ContainerGate,
}

impl DeferredConstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts collecting for `entity_id`. Returns false if a record exists.
    pub fn begin(&mut self, entity_id: EntityId) -> bool {
        if self.records.contains_key(&entity_id) {
            return false;
        }
        self.records
            .insert(entity_id, DeferredConstructionRecord::new(entity_id));
        true
    }

    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.records.contains_key(entity_id)
    }

    pub fn record(&self, entity_id: &EntityId) -> Option<&DeferredConstructionRecord> {
        self.records.get(entity_id)
    }

    pub fn state(&self, entity_id: &EntityId) -> Option<&ConstructionState> {
        self.records.get(entity_id).map(|record| &record.state)
    }

    pub fn add_component(&mut self, entity_id: EntityId, data: ComponentData) -> bool {
        let Some(record) = self.records.get_mut(&entity_id) else {
            return false;
        };
        record.components.push(data);
        true
    }

    pub fn add_authority(
        &mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    ) -> bool {
        let Some(record) = self.records.get_mut(&entity_id) else {
            return false;
        };
        record.pending_authority.push((component_id, authority));
        true
    }

    /// Stores the spawn data read for `entity_id` and moves the record on:
    /// to `WaitingOnContainer` if it spawns inside an unloaded container,
    /// otherwise to `Ready`.
    pub fn set_spawn_data(
        &mut self,
        entity_id: EntityId,
        spawn_data: SpawnData,
    ) -> Option<ConstructionState> {
        let record = self.records.get_mut(&entity_id)?;

        record.state = match &spawn_data.container {
            Some(container) if !self.gate.is_loaded(container) => {
                info!(
                    "Entity {} spawns in unloaded container {}, deferring",
                    entity_id, container
                );
                self.gate.defer(container.clone(), entity_id);
                ConstructionState::WaitingOnContainer(container.clone())
            }
            _ => ConstructionState::Ready,
        };
        record.spawn_data = Some(spawn_data);
        Some(record.state.clone())
    }

    /// Removes and returns the record if it is ready to build.
    pub fn take_ready(&mut self, entity_id: &EntityId) -> Option<DeferredConstructionRecord> {
        if self.state(entity_id) != Some(&ConstructionState::Ready) {
            return None;
        }
        self.records.remove(entity_id)
    }

    /// Marks `container` loaded and returns the entities that became ready,
    /// in the order they were deferred.
    pub fn on_container_loaded(&mut self, container: &ContainerId) -> Vec<EntityId> {
        let mut ready = Vec::new();
        for entity_id in self.gate.on_container_loaded(container) {
            let Some(record) = self.records.get_mut(&entity_id) else {
                continue;
            };
            if record.state == ConstructionState::WaitingOnContainer(container.clone()) {
                record.state = ConstructionState::Ready;
                ready.push(entity_id);
            }
        }
        ready
    }

    pub fn on_container_unloaded(&mut self, container: &ContainerId) {
        self.gate.on_container_unloaded(container);
    }

    pub fn remove(&mut self, entity_id: &EntityId) -> Option<DeferredConstructionRecord> {
        let record = self.records.remove(entity_id)?;
        if let ConstructionState::WaitingOnContainer(container) = &record.state {
            self.gate.forget(container, *entity_id);
        }
        Some(record)
    }

    pub fn gate(&self) -> &ContainerGate {
        &self.gate
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
