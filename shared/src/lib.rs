//! # Fabric Shared
//! Identity types, the inbound operation model, and the world seam shared by
//! the fabric receiver and the engines that embed it.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod component;
mod component_bindings;
mod error;
mod handle;
mod object_ref;
mod protocol;
mod types;
mod worker_op;
mod world;

pub use component::{CommandRequest, ComponentData, ComponentUpdate};
pub use component_bindings::{ComponentBinding, ComponentBindings, ComponentRole};
pub use error::{ConstructionError, SchemaError};
pub use handle::{HandleAllocator, ObjectHandle};
pub use object_ref::ObjectRef;
pub use protocol::{Protocol, ProtocolError, ProtocolPlugin};
pub use types::{
    Authority, CommandIndex, ComponentId, ContainerId, EntityId, EntityIdRange, ObjectOffset,
    RepIndex, RequestId,
};
pub use worker_op::{
    CommandResponseResult, CreateEntityResult, EntityQueryResult, QueriedEntity,
    ReserveEntityIdsResult, StatusCode, WorkerError, WorkerOp,
};
pub use world::{
    object_references::{collect_map_refs, ObjectReferenceSet, ObjectReferencesMap},
    rpc::{FunctionIndex, ReadRpc, RpcInvocation},
    spawn_data::{InstantiatedObject, Location, Rotation, SpawnData},
    world_type::{AppliedFields, ObjectRefResolver, ObjectWorld},
};
