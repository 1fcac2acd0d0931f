use std::collections::HashMap;

use crate::{
    types::{ComponentId, EntityId, ObjectOffset},
    ObjectRef,
};

/// What the receiver does with a component's payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentRole {
    /// Carries spawn data (class, transform, stable path). Read at
    /// construction, applied to the root object on update.
    Spawn,
    /// Replicated properties of one object.
    Data,
    /// Properties handed over between authoritative workers.
    Handover,
    /// Updates carry a batch of multicast invocations.
    MulticastRpc,
    /// Receives command requests (directed invocations).
    CommandRpc,
}

impl ComponentRole {
    pub fn carries_properties(self) -> bool {
        match self {
            ComponentRole::Spawn | ComponentRole::Data | ComponentRole::Handover => true,
            ComponentRole::MulticastRpc | ComponentRole::CommandRpc => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentBinding {
    pub role: ComponentRole,
    pub offset: ObjectOffset,
}

impl ComponentBinding {
    pub fn new(role: ComponentRole, offset: ObjectOffset) -> Self {
        Self { role, offset }
    }

    pub fn object_ref(&self, entity_id: EntityId) -> ObjectRef {
        ObjectRef::new(entity_id, self.offset)
    }
}

/// Maps every known component id to the object it targets and its role.
#[derive(Clone, Default)]
pub struct ComponentBindings {
    bindings: HashMap<ComponentId, ComponentBinding>,
}

impl ComponentBindings {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, component_id: ComponentId, binding: ComponentBinding) -> bool {
        if self.bindings.contains_key(&component_id) {
            return false;
        }
        self.bindings.insert(component_id, binding);
        true
    }

    pub fn get(&self, component_id: &ComponentId) -> Option<&ComponentBinding> {
        self.bindings.get(component_id)
    }

    pub fn contains(&self, component_id: &ComponentId) -> bool {
        self.bindings.contains_key(component_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
