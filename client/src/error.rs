use thiserror::Error;

use fabric_shared::{ComponentId, EntityId, ObjectOffset, RequestId, SchemaError};

/// Errors raised while routing an inbound operation to its target object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// Entity has no open channel and is not awaiting construction
    #[error("Entity {entity_id} is not known to the receiver")]
    UnknownEntity { entity_id: EntityId },

    /// Component id is not bound in the protocol
    #[error("Component {component_id} has no binding in the protocol")]
    NoBinding { component_id: ComponentId },

    /// Binding points at a sub-object the entity does not have
    #[error("Entity {entity_id} has no object at offset {offset}")]
    NoTargetObject {
        entity_id: EntityId,
        offset: ObjectOffset,
    },

    /// Bound object was destroyed
    #[error("Target object of entity {entity_id} is no longer alive")]
    TargetDestroyed { entity_id: EntityId },

    /// Payload could not be decoded by the world
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised while registering a continuation for an outstanding request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// A continuation is already registered for this request id
    #[error("Request {request_id} already has a pending {domain} continuation")]
    DuplicateRequest {
        domain: &'static str,
        request_id: RequestId,
    },
}
