use thiserror::Error;

use crate::types::{CommandIndex, ComponentId, EntityId, ObjectOffset};

/// Errors an [`ObjectWorld`](crate::ObjectWorld) reports while decoding a
/// payload against the shape it expects.
///
/// These never abort the receiver: the single update or invocation that
/// produced the error is discarded and everything else carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Payload bytes could not be decoded
    #[error("Malformed payload for component {component_id}: {reason}")]
    MalformedPayload {
        component_id: ComponentId,
        reason: String,
    },

    /// Stored struct buffer could not be decoded again during resolution
    #[error("Malformed stored buffer at field path {path:?}: {reason}")]
    MalformedBuffer {
        path: Vec<ObjectOffset>,
        reason: String,
    },

    /// Command index is not declared on the component
    #[error("Component {component_id} has no command {command_index}")]
    UnknownCommand {
        component_id: ComponentId,
        command_index: CommandIndex,
    },

    /// Field path does not exist on the target object
    #[error("Field path {path:?} does not exist on target object")]
    UnknownField { path: Vec<ObjectOffset> },

    /// Target object is not known to the world
    #[error("Target object is not known to the world")]
    UnknownObject,
}

/// Errors that prevent a local object from being built for a remote entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// No class is registered under the name carried in the spawn data
    #[error("Class `{class}` could not be resolved for entity {entity_id}")]
    ClassNotFound { entity_id: EntityId, class: String },

    /// Startup object referenced by stable path does not exist
    #[error("No template found at `{path}` for entity {entity_id}")]
    TemplateNotFound { entity_id: EntityId, path: String },

    /// The entity's components do not carry spawn data
    #[error("Entity {entity_id} has no spawn data among its components")]
    SpawnDataMissing { entity_id: EntityId },

    /// Spawn data was present but undecodable
    #[error("Spawn data for entity {entity_id} is malformed: {source}")]
    MalformedSpawnData {
        entity_id: EntityId,
        #[source]
        source: SchemaError,
    },
}
