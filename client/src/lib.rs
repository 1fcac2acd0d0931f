//! # Fabric Client
//! The receiving half of the fabric state-sync layer. A [`Receiver`] consumes
//! the operations a worker fabric delivers, builds local objects for remote
//! entities, parks whatever references objects that are not local yet, and
//! answers the requests it has outstanding.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use fabric_shared::{
    Authority, ComponentData, ComponentId, ComponentRole, ContainerId, EntityId, ObjectHandle,
    ObjectRef, ObjectWorld, Protocol, RequestId, WorkerOp,
};

mod construct;
mod correlation;
mod critical_section;
mod error;
mod events;
mod receiver;
mod receiver_config;
mod resolve;
mod world;

pub use construct::{
    container_gate::ContainerGate,
    deferred_constructor::{ConstructionState, DeferredConstructionRecord, DeferredConstructor},
};
pub use correlation::{
    correlation_table::{Continuation, CorrelationTable},
    pending_requests::{
        PendingConstruction, PendingQuery, PendingRequests, PendingReservation, PendingResponse,
        ReliableRpcParams,
    },
};
pub use critical_section::{
    CriticalSectionBatch, CriticalSectionBatcher, PendingAddComponent, PendingAuthorityChange,
    QueuedResolution,
};
pub use error::{CorrelationError, ReceiverError};
pub use events::ReceiverEvent;
pub use receiver::Receiver;
pub use receiver_config::ReceiverConfig;
pub use resolve::{
    reference_registry::ReferenceRegistry,
    rpc_queue::{PendingIncomingRpc, RpcHandle, RpcQueue},
    update_resolver::UpdateResolver,
};
pub use world::{
    actor_channel::{ActorChannel, ChannelHandle, ChannelMap, ChannelObjectPair},
    object_ref_map::ObjectRefMap,
};
