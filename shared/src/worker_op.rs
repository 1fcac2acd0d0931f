use thiserror::Error;

use crate::{
    component::{CommandRequest, ComponentData, ComponentUpdate},
    types::{Authority, ComponentId, EntityId, EntityIdRange, RequestId},
};

/// Outcome class attached to every response the worker fabric sends back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    Timeout,
    NotFound,
    AuthorityLost,
    PermissionDenied,
    ApplicationError,
    InternalError,
}

/// A failed response from the worker fabric
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("worker request failed with {status:?}: {message}")]
pub struct WorkerError {
    pub status: StatusCode,
    pub message: String,
}

impl WorkerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// One entity returned from an ad-hoc query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueriedEntity {
    pub entity_id: EntityId,
    pub components: Vec<ComponentData>,
}

pub type CreateEntityResult = Result<EntityId, WorkerError>;
pub type ReserveEntityIdsResult = Result<EntityIdRange, WorkerError>;
pub type EntityQueryResult = Result<Vec<QueriedEntity>, WorkerError>;
pub type CommandResponseResult = Result<Vec<u8>, WorkerError>;

/// Every operation the transport can deliver to the receiver.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerOp {
    /// `true` opens a critical section, `false` closes it.
    CriticalSection(bool),
    AddEntity(EntityId),
    RemoveEntity(EntityId),
    AddComponent(EntityId, ComponentData),
    AuthorityChange(EntityId, ComponentId, Authority),
    ComponentUpdate(EntityId, ComponentUpdate),
    CommandRequest {
        request_id: RequestId,
        entity_id: EntityId,
        request: CommandRequest,
    },
    CommandResponse {
        request_id: RequestId,
        result: CommandResponseResult,
    },
    ReserveEntityIdsResponse {
        request_id: RequestId,
        result: ReserveEntityIdsResult,
    },
    CreateEntityResponse {
        request_id: RequestId,
        result: CreateEntityResult,
    },
    EntityQueryResponse {
        request_id: RequestId,
        result: EntityQueryResult,
    },
}

impl WorkerOp {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerOp::CriticalSection(_) => "CriticalSection",
            WorkerOp::AddEntity(_) => "AddEntity",
            WorkerOp::RemoveEntity(_) => "RemoveEntity",
            WorkerOp::AddComponent(_, _) => "AddComponent",
            WorkerOp::AuthorityChange(_, _, _) => "AuthorityChange",
            WorkerOp::ComponentUpdate(_, _) => "ComponentUpdate",
            WorkerOp::CommandRequest { .. } => "CommandRequest",
            WorkerOp::CommandResponse { .. } => "CommandResponse",
            WorkerOp::ReserveEntityIdsResponse { .. } => "ReserveEntityIdsResponse",
            WorkerOp::CreateEntityResponse { .. } => "CreateEntityResponse",
            WorkerOp::EntityQueryResponse { .. } => "EntityQueryResponse",
        }
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            WorkerOp::AddEntity(entity_id)
            | WorkerOp::RemoveEntity(entity_id)
            | WorkerOp::AddComponent(entity_id, _)
            | WorkerOp::AuthorityChange(entity_id, _, _)
            | WorkerOp::ComponentUpdate(entity_id, _) => Some(*entity_id),
            WorkerOp::CommandRequest { entity_id, .. } => Some(*entity_id),
            WorkerOp::CriticalSection(_)
            | WorkerOp::CommandResponse { .. }
            | WorkerOp::ReserveEntityIdsResponse { .. }
            | WorkerOp::CreateEntityResponse { .. }
            | WorkerOp::EntityQueryResponse { .. } => None,
        }
    }
}
