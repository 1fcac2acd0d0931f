use crate::types::{CommandIndex, ComponentId};

/// Opaque, schema-encoded payload of one component. The receiver never looks
/// inside; decoding belongs to the [`ObjectWorld`](crate::ObjectWorld).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentData {
    pub component_id: ComponentId,
    pub payload: Vec<u8>,
}

impl ComponentData {
    pub fn new(component_id: ComponentId, payload: Vec<u8>) -> Self {
        Self {
            component_id,
            payload,
        }
    }
}

/// Opaque delta for a component that already exists on an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentUpdate {
    pub component_id: ComponentId,
    pub payload: Vec<u8>,
}

impl ComponentUpdate {
    pub fn new(component_id: ComponentId, payload: Vec<u8>) -> Self {
        Self {
            component_id,
            payload,
        }
    }
}

/// Opaque command invocation addressed to one component of an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    pub component_id: ComponentId,
    pub command_index: CommandIndex,
    pub payload: Vec<u8>,
}

impl CommandRequest {
    pub fn new(component_id: ComponentId, command_index: CommandIndex, payload: Vec<u8>) -> Self {
        Self {
            component_id,
            command_index,
            payload,
        }
    }
}
